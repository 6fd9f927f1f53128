use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Postal address stored as JSONB on users, suppliers and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Trims every field and rejects blanks.
    pub fn normalized(mut self) -> AppResult<Self> {
        for (field, value) in [
            ("street", &mut self.street),
            ("city", &mut self.city),
            ("state", &mut self.state),
            ("zip_code", &mut self.zip_code),
            ("country", &mut self.country),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(AppError::bad_request(format!("address.{field} is required")));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address {
            street: " 1 Main St ".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            country: "US".into(),
        }
    }

    #[test]
    fn normalized_trims() {
        let a = sample().normalized().unwrap();
        assert_eq!(a.street, "1 Main St");
    }

    #[test]
    fn normalized_rejects_blank_field() {
        let mut a = sample();
        a.city = "   ".into();
        let err = a.normalized().unwrap_err();
        assert_eq!(err.to_string(), "address.city is required");
    }
}
