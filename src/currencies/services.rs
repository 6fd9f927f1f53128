use rust_decimal::{Decimal, RoundingStrategy};
use time::Duration;

use crate::error::{AppError, AppResult};

const CONVERSION_DP: u32 = 4;

/// Uppercases and checks a three-letter ISO code.
pub fn normalize_code(code: &str) -> AppResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(AppError::bad_request("Currency code must be three letters"));
    }
    Ok(code)
}

/// Converts through the USD base: `amount / from * to`.
pub fn convert(amount: Decimal, from_rate: Decimal, to_rate: Decimal) -> AppResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(AppError::bad_request("Amount must not be negative"));
    }
    if from_rate <= Decimal::ZERO {
        return Err(AppError::bad_request("Source currency has no valid rate"));
    }
    let converted = amount
        .checked_div(from_rate)
        .and_then(|usd| usd.checked_mul(to_rate))
        .ok_or_else(|| AppError::bad_request("Amount is too large"))?;
    Ok(converted.round_dp_with_strategy(CONVERSION_DP, RoundingStrategy::MidpointAwayFromZero))
}

/// Effective rate from one currency to another.
pub fn cross_rate(from_rate: Decimal, to_rate: Decimal) -> Decimal {
    to_rate
        .checked_div(from_rate)
        .map(|rate| rate.round_dp(8))
        .unwrap_or(Decimal::ZERO)
}

/// Trend window for `?period=`. Unknown values fall back to seven days.
pub fn period_window(period: Option<&str>) -> (&'static str, Duration) {
    match period.map(str::trim) {
        Some("1d") => ("1d", Duration::days(1)),
        Some("30d") => ("30d", Duration::days(30)),
        Some("90d") => ("90d", Duration::days(90)),
        _ => ("7d", Duration::days(7)),
    }
}

/// Running mean of the rates seen so far, one value per input.
pub fn running_averages(rates: &[Decimal]) -> Vec<Decimal> {
    let mut sum = Decimal::ZERO;
    rates
        .iter()
        .enumerate()
        .map(|(i, rate)| {
            sum += *rate;
            (sum / Decimal::from(i as u64 + 1)).round_dp(8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn converts_through_usd_base() {
        let out = convert(d("100"), d("0.9"), d("0.8")).unwrap();
        assert_eq!(out, d("88.8889"));
        assert_eq!(convert(d("0"), d("0.9"), d("0.8")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn same_currency_is_identity() {
        assert_eq!(convert(d("12.5"), d("157.2"), d("157.2")).unwrap(), d("12.5"));
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(
            convert(d("-1"), Decimal::ONE, Decimal::ONE),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn overflowing_amount_is_a_bad_request() {
        let huge = Decimal::MAX;
        assert!(matches!(
            convert(huge, Decimal::ONE, d("157.2")),
            Err(AppError::BadRequest(msg)) if msg == "Amount is too large"
        ));
        assert!(matches!(
            convert(huge, d("0.0001"), Decimal::ONE),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn running_average_of_three_points() {
        let avg = running_averages(&[d("1"), d("2"), d("3")]);
        assert_eq!(avg, vec![d("1"), d("1.5"), d("2")]);
        assert!(running_averages(&[]).is_empty());
    }

    #[test]
    fn unknown_period_is_a_week() {
        assert_eq!(period_window(Some("1d")), ("1d", Duration::days(1)));
        assert_eq!(period_window(Some("90d")).1, Duration::days(90));
        assert_eq!(period_window(Some("1y")), ("7d", Duration::days(7)));
        assert_eq!(period_window(None), ("7d", Duration::days(7)));
    }

    #[test]
    fn codes_are_uppercased() {
        assert_eq!(normalize_code(" eur ").unwrap(), "EUR");
        assert!(normalize_code("EURO").is_err());
        assert!(normalize_code("E1R").is_err());
    }

    #[test]
    fn cross_rate_divides_target_by_source() {
        assert_eq!(cross_rate(d("0.8"), d("0.9")), d("1.125"));
    }
}
