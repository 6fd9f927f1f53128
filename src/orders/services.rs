use rust_decimal::Decimal;
use uuid::Uuid;

use super::repo::{CheckoutLine, OrderStatus};
use crate::error::{AppError, AppResult};

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// pending → processing → shipped → delivered, and
    /// pending | processing → cancelled.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if !from.can_transition_to(to) {
        return Err(AppError::bad_request(format!(
            "Cannot change order status from {} to {}",
            from.as_str(),
            to.as_str()
        )));
    }
    Ok(())
}

/// Validates the locked cart lines and returns the order total.
pub fn checkout_total(lines: &[CheckoutLine]) -> AppResult<Decimal> {
    if lines.is_empty() {
        return Err(AppError::bad_request("Cart is empty"));
    }
    let mut total = Decimal::ZERO;
    for line in lines {
        if line.quantity > line.stock {
            return Err(AppError::bad_request(format!(
                "Insufficient stock for {}: {} available",
                line.name, line.stock
            )));
        }
        total += line.unit_price * Decimal::from(line.quantity);
    }
    Ok(total.round_dp(2))
}

/// Products checkout consumed, and therefore the cart lines it may clear.
pub fn ordered_products(lines: &[CheckoutLine]) -> Vec<Uuid> {
    lines.iter().map(|l| l.product_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 5] = [Pending, Processing, Shipped, Delivered, Cancelled];

    #[test]
    fn transition_table() {
        let allowed = [
            (Pending, Processing),
            (Processing, Shipped),
            (Shipped, Delivered),
            (Pending, Cancelled),
            (Processing, Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_reject_changes() {
        assert!(ensure_transition(Delivered, Cancelled).is_err());
        assert!(ensure_transition(Cancelled, Pending).is_err());
        assert!(ensure_transition(Shipped, Cancelled).is_err());
    }

    fn line(name: &str, price: Decimal, quantity: i32, stock: i32) -> CheckoutLine {
        CheckoutLine {
            product_id: Uuid::new_v4(),
            name: name.into(),
            category: "misc".into(),
            unit_price: price,
            stock,
            quantity,
        }
    }

    #[test]
    fn checkout_totals_lines() {
        let total = checkout_total(&[
            line("Mug", Decimal::new(1250, 2), 2, 5),
            line("Cap", Decimal::new(999, 2), 1, 1),
        ])
        .unwrap();
        assert_eq!(total, Decimal::new(3499, 2));
    }

    #[test]
    fn checkout_rejects_empty_cart_and_short_stock() {
        match checkout_total(&[]) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Cart is empty"),
            other => panic!("unexpected {other:?}"),
        }
        match checkout_total(&[line("Mug", Decimal::ONE, 3, 2)]) {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("Mug")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_ordered_products_leave_the_cart() {
        let lines = [
            line("Mug", Decimal::ONE, 1, 5),
            line("Cap", Decimal::ONE, 2, 5),
        ];
        let ids = ordered_products(&lines);
        assert_eq!(ids, vec![lines[0].product_id, lines[1].product_id]);
        assert!(ordered_products(&[]).is_empty());
    }
}
