use serde::Serialize;
use time::OffsetDateTime;

use super::repo::TicketStatus;

/// When a ticket counts as resolved. The first move into resolved or closed
/// stamps it; reopening clears it.
pub fn resolved_at(
    next: TicketStatus,
    previous: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    if next.is_finished() {
        Some(previous.unwrap_or(now))
    } else {
        None
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    pub total: i64,
    pub open: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
}

impl TicketStats {
    pub fn from_counts(counts: &[(TicketStatus, i64)]) -> Self {
        let mut stats = Self::default();
        for &(status, n) in counts {
            stats.total += n;
            match status {
                TicketStatus::Open => stats.open += n,
                TicketStatus::InProgress => stats.in_progress += n,
                TicketStatus::Resolved => stats.resolved += n,
                TicketStatus::Closed => stats.closed += n,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn resolution_is_stamped_once_and_cleared_on_reopen() {
        let now = datetime!(2024-06-02 12:00 UTC);
        let earlier = datetime!(2024-06-01 09:00 UTC);

        assert_eq!(resolved_at(TicketStatus::Resolved, None, now), Some(now));
        assert_eq!(resolved_at(TicketStatus::Closed, Some(earlier), now), Some(earlier));
        assert_eq!(resolved_at(TicketStatus::Open, Some(earlier), now), None);
        assert_eq!(resolved_at(TicketStatus::InProgress, None, now), None);
    }

    #[test]
    fn stats_fill_missing_statuses_with_zero() {
        let stats = TicketStats::from_counts(&[(TicketStatus::Open, 3), (TicketStatus::Closed, 2)]);
        assert_eq!(
            stats,
            TicketStats {
                total: 5,
                open: 3,
                in_progress: 0,
                resolved: 0,
                closed: 2,
            }
        );
    }
}
