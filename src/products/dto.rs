use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::inventory::Movement;
use super::repo::{Product, ProductFields, ProductFilter};
use crate::error::{AppError, AppResult};
use crate::params::{like_pattern, nullable, Pagination};

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListProductsQuery {
    pub fn split(self) -> (ProductFilter, Pagination) {
        let page = Pagination::from_query(self.limit, self.offset);
        let filter = ProductFilter {
            category: self.category.filter(|c| !c.trim().is_empty()),
            search: self
                .q
                .filter(|q| !q.trim().is_empty())
                .map(|q| like_pattern(&q)),
            min_price: self.min_price,
            max_price: self.max_price,
            supplier_id: self.supplier_id,
        };
        (filter, page)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    #[serde(default)]
    pub stock: i32,
    pub category: String,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    /// `null` detaches the product from its supplier.
    #[serde(default, deserialize_with = "nullable")]
    pub supplier_id: Option<Option<Uuid>>,
}

impl CreateProductRequest {
    pub fn into_fields(self) -> AppResult<ProductFields> {
        validate(ProductFields {
            name: self.name,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            stock: self.stock,
            category: self.category,
            supplier_id: self.supplier_id,
        })
    }
}

impl UpdateProductRequest {
    /// Overlays the provided fields on `current`.
    pub fn apply(self, current: Product) -> AppResult<ProductFields> {
        validate(ProductFields {
            name: self.name.unwrap_or(current.name),
            description: self.description.unwrap_or(current.description),
            price: self.price.unwrap_or(current.price),
            image_url: self.image_url.unwrap_or(current.image_url),
            stock: self.stock.unwrap_or(current.stock),
            category: self.category.unwrap_or(current.category),
            supplier_id: self.supplier_id.unwrap_or(current.supplier_id),
        })
    }
}

/// Signed stock change: positive to receive goods, negative to write off.
#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: i32,
    pub note: Option<String>,
}

impl AdjustStockRequest {
    pub fn note(&self) -> Option<String> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InventoryHistory {
    pub product_id: Uuid,
    pub stock: i32,
    pub movements: Vec<Movement>,
}

fn validate(mut f: ProductFields) -> AppResult<ProductFields> {
    for (field, value) in [
        ("name", &mut f.name),
        ("description", &mut f.description),
        ("image_url", &mut f.image_url),
        ("category", &mut f.category),
    ] {
        *value = value.trim().to_string();
        if value.is_empty() {
            return Err(AppError::bad_request(format!("{field} is required")));
        }
    }
    if f.price.is_sign_negative() {
        return Err(AppError::bad_request("price must not be negative"));
    }
    if f.stock < 0 {
        return Err(AppError::bad_request("stock must not be negative"));
    }
    f.price = f.price.round_dp(2);
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn create() -> CreateProductRequest {
        CreateProductRequest {
            name: " Ceramic mug ".into(),
            description: "350ml".into(),
            price: Decimal::new(12_499, 3),
            image_url: "https://cdn.example/mug.jpg".into(),
            stock: 10,
            category: "kitchen".into(),
            supplier_id: None,
        }
    }

    #[test]
    fn create_trims_and_rounds_price() {
        let f = create().into_fields().unwrap();
        assert_eq!(f.name, "Ceramic mug");
        assert_eq!(f.price, Decimal::new(1250, 2));
    }

    #[test]
    fn create_rejects_negative_values() {
        let mut req = create();
        req.price = Decimal::new(-1, 0);
        assert!(matches!(req.into_fields(), Err(AppError::BadRequest(_))));

        let mut req = create();
        req.stock = -1;
        assert!(matches!(req.into_fields(), Err(AppError::BadRequest(_))));

        let mut req = create();
        req.category = " ".into();
        assert_eq!(
            req.into_fields().unwrap_err().to_string(),
            "category is required"
        );
    }

    fn product() -> Product {
        let now = OffsetDateTime::now_utc();
        Product {
            id: Uuid::new_v4(),
            name: "Mug".into(),
            description: "350ml".into(),
            price: Decimal::new(999, 2),
            image_url: "https://cdn.example/mug.jpg".into(),
            stock: 4,
            category: "kitchen".into(),
            supplier_id: Some(Uuid::nil()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn update_keeps_unset_fields() {
        let current = product();
        let patch = UpdateProductRequest {
            stock: Some(7),
            ..Default::default()
        };
        let f = patch.apply(current).unwrap();
        assert_eq!(f.stock, 7);
        assert_eq!(f.name, "Mug");
        assert_eq!(f.price, Decimal::new(999, 2));
        assert_eq!(f.supplier_id, Some(Uuid::nil()));
    }

    #[test]
    fn update_can_detach_supplier() {
        let patch: UpdateProductRequest =
            serde_json::from_str(r#"{"supplier_id":null}"#).unwrap();
        assert_eq!(patch.apply(product()).unwrap().supplier_id, None);

        let other = Uuid::new_v4();
        let patch: UpdateProductRequest =
            serde_json::from_str(&format!(r#"{{"supplier_id":"{other}"}}"#)).unwrap();
        assert_eq!(patch.apply(product()).unwrap().supplier_id, Some(other));
    }

    #[test]
    fn list_query_builds_filter() {
        let q = ListProductsQuery {
            category: Some("".into()),
            q: Some("mug".into()),
            min_price: None,
            max_price: Some(Decimal::new(20, 0)),
            supplier_id: None,
            limit: Some(500),
            offset: None,
        };
        let (filter, page) = q.split();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("%mug%"));
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn blank_adjustment_note_is_dropped() {
        let req: AdjustStockRequest =
            serde_json::from_str(r#"{"quantity":5,"note":"  "}"#).unwrap();
        assert_eq!(req.note(), None);
        let req: AdjustStockRequest =
            serde_json::from_str(r#"{"quantity":-2,"note":" damaged "}"#).unwrap();
        assert_eq!(req.note().as_deref(), Some("damaged"));
    }
}
