use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::{Currency, CurrencyFields, RatePoint};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct CreateCurrencyRequest {
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub exchange_rate: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CreateCurrencyRequest {
    pub fn into_fields(self) -> AppResult<(String, CurrencyFields)> {
        let code = super::services::normalize_code(&self.code)?;
        let fields = validate(CurrencyFields {
            name: self.name,
            symbol: self.symbol,
            exchange_rate: self.exchange_rate,
            is_active: self.is_active,
        })?;
        Ok((code, fields))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCurrencyRequest {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl UpdateCurrencyRequest {
    pub fn apply(self, current: &Currency) -> AppResult<CurrencyFields> {
        let fields = validate(CurrencyFields {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            symbol: self.symbol.unwrap_or_else(|| current.symbol.clone()),
            exchange_rate: self.exchange_rate.unwrap_or(current.exchange_rate),
            is_active: self.is_active.unwrap_or(current.is_active),
        })?;
        if current.is_default && !fields.is_active {
            return Err(AppError::bad_request("Cannot deactivate the default currency"));
        }
        Ok(fields)
    }
}

fn validate(mut f: CurrencyFields) -> AppResult<CurrencyFields> {
    f.name = f.name.trim().to_string();
    f.symbol = f.symbol.trim().to_string();
    if f.name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if f.symbol.is_empty() {
        return Err(AppError::bad_request("symbol is required"));
    }
    if f.exchange_rate <= Decimal::ZERO {
        return Err(AppError::bad_request("exchange_rate must be greater than 0"));
    }
    Ok(f)
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub converted_amount: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Serialize)]
pub struct LatestRate {
    pub code: String,
    pub rate: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl From<Currency> for LatestRate {
    fn from(c: Currency) -> Self {
        Self {
            code: c.code,
            rate: c.exchange_rate,
            last_updated: c.last_updated,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub code: String,
    pub rates: Vec<RatePoint>,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub rate: Decimal,
    pub average: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub code: String,
    pub period: &'static str,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub currency_code: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRatesResponse {
    pub message: &'static str,
    pub updated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn usd() -> Currency {
        Currency {
            id: Uuid::nil(),
            code: "USD".into(),
            name: "US Dollar".into(),
            symbol: "$".into(),
            exchange_rate: Decimal::ONE,
            is_default: true,
            is_active: true,
            last_updated: OffsetDateTime::UNIX_EPOCH,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn create_uppercases_code_and_checks_rate() {
        let req = CreateCurrencyRequest {
            code: "eur".into(),
            name: " Euro ".into(),
            symbol: "€".into(),
            exchange_rate: Decimal::new(92, 2),
            is_active: true,
        };
        let (code, fields) = req.into_fields().unwrap();
        assert_eq!(code, "EUR");
        assert_eq!(fields.name, "Euro");

        let bad = CreateCurrencyRequest {
            code: "EUR".into(),
            name: "Euro".into(),
            symbol: "€".into(),
            exchange_rate: Decimal::ZERO,
            is_active: true,
        };
        assert!(bad.into_fields().is_err());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let fields = UpdateCurrencyRequest {
            exchange_rate: Some(Decimal::new(101, 2)),
            ..Default::default()
        }
        .apply(&usd())
        .unwrap();
        assert_eq!(fields.name, "US Dollar");
        assert_eq!(fields.exchange_rate, Decimal::new(101, 2));
    }

    #[test]
    fn default_currency_cannot_be_deactivated() {
        let res = UpdateCurrencyRequest {
            is_active: Some(false),
            ..Default::default()
        }
        .apply(&usd());
        assert!(matches!(res, Err(AppError::BadRequest(_))));
    }
}
