use rust_decimal::Decimal;
use serde::Deserialize;

use super::repo::{Supplier, SupplierFields};
use crate::address::Address;
use crate::auth::services::is_valid_email;
use crate::error::{AppError, AppResult};

pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListSuppliersQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub is_active: Option<bool>,
    pub rating: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub is_active: Option<bool>,
    pub rating: Option<Decimal>,
}

impl CreateSupplierRequest {
    pub fn into_fields(self) -> AppResult<SupplierFields> {
        validate(SupplierFields {
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            is_active: self.is_active.unwrap_or(true),
            rating: self.rating.unwrap_or(Decimal::ZERO),
        })
    }
}

impl UpdateSupplierRequest {
    pub fn apply(self, current: Supplier) -> AppResult<SupplierFields> {
        validate(SupplierFields {
            name: self.name.unwrap_or(current.name),
            email: self.email.unwrap_or(current.email),
            phone: self.phone.unwrap_or(current.phone),
            address: self.address.unwrap_or(current.address.0),
            is_active: self.is_active.unwrap_or(current.is_active),
            rating: self.rating.unwrap_or(current.rating),
        })
    }
}

fn validate(mut f: SupplierFields) -> AppResult<SupplierFields> {
    f.name = f.name.trim().to_string();
    f.email = f.email.trim().to_lowercase();
    f.phone = f.phone.trim().to_string();

    if f.name.is_empty() {
        return Err(AppError::bad_request("Supplier name is required"));
    }
    if f.name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request(format!(
            "Supplier name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !is_valid_email(&f.email) {
        return Err(AppError::bad_request("Please enter a valid email"));
    }
    if f.phone.is_empty() {
        return Err(AppError::bad_request("Phone number is required"));
    }
    if f.rating < Decimal::ZERO || f.rating > Decimal::from(5) {
        return Err(AppError::bad_request("Rating must be between 0 and 5"));
    }
    f.address = f.address.normalized()?;
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateSupplierRequest {
        CreateSupplierRequest {
            name: "Acme Wholesale".into(),
            email: " Sales@Acme.IO ".into(),
            phone: "+1 555 0100".into(),
            address: Address {
                street: "1 Dock Rd".into(),
                city: "Oakland".into(),
                state: "CA".into(),
                zip_code: "94607".into(),
                country: "US".into(),
            },
            is_active: None,
            rating: None,
        }
    }

    #[test]
    fn defaults_and_normalisation() {
        let f = request().into_fields().unwrap();
        assert_eq!(f.email, "sales@acme.io");
        assert!(f.is_active);
        assert_eq!(f.rating, Decimal::ZERO);
    }

    #[test]
    fn rating_bounds() {
        let mut req = request();
        req.rating = Some(Decimal::new(51, 1));
        assert!(matches!(req.into_fields(), Err(AppError::BadRequest(_))));

        let mut req = request();
        req.rating = Some(Decimal::new(45, 1));
        assert_eq!(req.into_fields().unwrap().rating, Decimal::new(45, 1));
    }

    #[test]
    fn rejects_long_name_and_bad_email() {
        let mut req = request();
        req.name = "x".repeat(101);
        assert!(req.into_fields().is_err());

        let mut req = request();
        req.email = "not-an-email".into();
        assert_eq!(
            req.into_fields().unwrap_err().to_string(),
            "Please enter a valid email"
        );
    }
}
