use serde::{Deserialize, Deserializer, Serialize};
use time::{macros::format_description, Date, Duration, OffsetDateTime};

use crate::error::{AppError, AppResult};

pub const MAX_LIMIT: i64 = 100;

const DEFAULT_LIMIT: i64 = 20;

/// Resolved `?limit=&offset=` query parameters.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Builds a clamped page from optional query fields.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT),
            offset: offset.unwrap_or(0),
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

/// Raw `?limit=&offset=` for endpoints with no other filters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<PageQuery> for Pagination {
    fn from(q: PageQuery) -> Self {
        Pagination::from_query(q.limit, q.offset)
    }
}

#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// `?page=&per_page=` style used by the support desk.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(10).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.per_page - 1) / self.per_page
    }
}

/// For `Option<Option<T>>` patch fields: a missing key stays `None` (with
/// `#[serde(default)]`), an explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Builds a `%term%` ILIKE pattern, escaping the LIKE wildcards in `term`.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Parses a `YYYY-MM-DD` query value into midnight UTC.
pub fn parse_day(field: &str, value: &str) -> AppResult<OffsetDateTime> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), &fmt)
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::bad_request(format!("{field} must be formatted as YYYY-MM-DD")))
}

/// Resolves an optional `[start, end]` day range. The end day is inclusive,
/// so the returned upper bound is the following midnight.
pub fn day_range(
    start: Option<&str>,
    end: Option<&str>,
    default_days: i64,
) -> AppResult<(OffsetDateTime, OffsetDateTime)> {
    let end = match end {
        Some(v) => parse_day("end_date", v)?
            .checked_add(Duration::days(1))
            .ok_or_else(|| AppError::bad_request("end_date out of range"))?,
        None => OffsetDateTime::now_utc(),
    };
    let start = match start {
        Some(v) => parse_day("start_date", v)?,
        None => end
            .checked_sub(Duration::days(default_days))
            .ok_or_else(|| AppError::bad_request("start_date out of range"))?,
    };
    if start > end {
        return Err(AppError::bad_request("start_date must not be after end_date"));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            limit: 10_000,
            offset: -3,
        }
        .clamped();
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn page_request_math() {
        let p = PageRequest::new(Some(3), Some(10));
        assert_eq!(p.offset(), 20);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(21), 3);

        let defaults = PageRequest::new(Some(0), None);
        assert_eq!(defaults.page, 1);
        assert_eq!(defaults.per_page, 10);
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        owner: Option<Option<i32>>,
    }

    #[test]
    fn nullable_tells_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.owner, None);
        let cleared: Patch = serde_json::from_str(r#"{"owner":null}"#).unwrap();
        assert_eq!(cleared.owner, Some(None));
        let set: Patch = serde_json::from_str(r#"{"owner":7}"#).unwrap();
        assert_eq!(set.owner, Some(Some(7)));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" mug "), "%mug%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn day_range_includes_end_day() {
        let (start, end) = day_range(Some("2024-03-01"), Some("2024-03-31"), 30).unwrap();
        assert_eq!(start, datetime!(2024-03-01 0:00 UTC));
        assert_eq!(end, datetime!(2024-04-01 0:00 UTC));
    }

    #[test]
    fn day_range_rejects_bad_input() {
        assert!(matches!(
            day_range(Some("03/01/2024"), None, 30),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            day_range(Some("2024-05-01"), Some("2024-04-01"), 30),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn last_representable_day_is_out_of_range() {
        assert!(matches!(
            day_range(Some("9999-12-01"), Some("9999-12-31"), 30),
            Err(AppError::BadRequest(msg)) if msg == "end_date out of range"
        ));
    }
}
