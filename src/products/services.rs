use crate::error::{AppError, AppResult};

/// Stock after applying a signed adjustment.
pub fn adjusted_stock(stock: i32, delta: i32) -> AppResult<i32> {
    if delta == 0 {
        return Err(AppError::bad_request("quantity must not be zero"));
    }
    match stock.checked_add(delta) {
        Some(next) if next >= 0 => Ok(next),
        Some(_) => Err(AppError::bad_request(format!(
            "Insufficient stock: {stock} available"
        ))),
        None => Err(AppError::bad_request("quantity is too large")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiving_and_writing_off_stock() {
        assert_eq!(adjusted_stock(4, 6).unwrap(), 10);
        assert_eq!(adjusted_stock(4, -4).unwrap(), 0);
    }

    #[test]
    fn rejects_zero_negative_and_overflowing_adjustments() {
        assert!(matches!(adjusted_stock(4, 0), Err(AppError::BadRequest(_))));
        match adjusted_stock(4, -5) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Insufficient stock: 4 available"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            adjusted_stock(1, i32::MAX),
            Err(AppError::BadRequest(_))
        ));
    }
}
