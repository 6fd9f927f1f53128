use rust_decimal::Decimal;
use uuid::Uuid;

use super::dto::{CartLineView, CartView};
use super::repo::CartLine;
use crate::error::{AppError, AppResult};

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Prices every line at the product's current price.
pub fn price_cart(cart_id: Option<Uuid>, lines: Vec<CartLine>) -> CartView {
    let items: Vec<CartLineView> = lines
        .into_iter()
        .map(|l| CartLineView {
            line_total: line_total(l.unit_price, l.quantity),
            id: l.id,
            product_id: l.product_id,
            name: l.name,
            image_url: l.image_url,
            unit_price: l.unit_price,
            quantity: l.quantity,
            in_stock: l.quantity <= l.stock,
        })
        .collect();
    let total = items.iter().map(|i| i.line_total).sum();
    let item_count = items.iter().map(|i| i.quantity).sum();
    CartView {
        id: cart_id,
        items,
        total,
        item_count,
    }
}

pub fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::bad_request("Quantity must be at least 1"));
    }
    Ok(())
}

pub fn ensure_in_stock(requested: i32, stock: i32) -> AppResult<()> {
    if requested > stock {
        return Err(insufficient(stock));
    }
    Ok(())
}

/// Quantity of a line after adding `add` to what the cart already holds.
/// Adding to an existing line sums the two; it never creates a second line.
pub fn merge_quantity(existing: Option<i32>, add: i32, stock: i32) -> AppResult<i32> {
    let merged = existing
        .unwrap_or(0)
        .checked_add(add)
        .ok_or_else(|| insufficient(stock))?;
    ensure_in_stock(merged, stock)?;
    Ok(merged)
}

fn insufficient(stock: i32) -> AppError {
    AppError::bad_request(format!("Insufficient stock: {stock} available"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: Decimal, quantity: i32, stock: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: "Item".into(),
            image_url: "https://cdn.example/i.jpg".into(),
            unit_price: price,
            stock,
            quantity,
        }
    }

    #[test]
    fn total_sums_every_line_at_its_own_price() {
        let view = price_cart(
            Some(Uuid::nil()),
            vec![
                line(Decimal::new(1999, 2), 2, 10),
                line(Decimal::new(500, 2), 3, 10),
            ],
        );
        assert_eq!(view.items[0].line_total, Decimal::new(3998, 2));
        assert_eq!(view.items[1].line_total, Decimal::new(1500, 2));
        assert_eq!(view.total, Decimal::new(5498, 2));
        assert_eq!(view.item_count, 5);
    }

    #[test]
    fn empty_cart_totals_zero() {
        let view = price_cart(None, Vec::new());
        assert!(view.items.is_empty());
        assert_eq!(view.total, Decimal::ZERO);
        assert_eq!(view.item_count, 0);
    }

    #[test]
    fn flags_lines_beyond_stock() {
        let view = price_cart(None, vec![line(Decimal::ONE, 4, 3)]);
        assert!(!view.items[0].in_stock);
    }

    #[test]
    fn quantity_and_stock_checks() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(ensure_in_stock(5, 5).is_ok());
        assert!(matches!(
            ensure_in_stock(6, 5),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn adding_twice_merges_into_one_line() {
        let first = merge_quantity(None, 2, 10).unwrap();
        assert_eq!(first, 2);
        assert_eq!(merge_quantity(Some(first), 3, 10).unwrap(), 5);
    }

    #[test]
    fn merged_quantity_must_fit_stock() {
        assert_eq!(merge_quantity(Some(2), 3, 5).unwrap(), 5);
        match merge_quantity(Some(2), 4, 5) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Insufficient stock: 5 available"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn huge_additions_are_rejected_not_overflowed() {
        match merge_quantity(Some(3), i32::MAX, 5) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Insufficient stock: 5 available"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            merge_quantity(None, i32::MAX, 5),
            Err(AppError::BadRequest(_))
        ));
    }
}
