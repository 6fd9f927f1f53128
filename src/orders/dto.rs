use serde::{Deserialize, Serialize};

use super::repo::{Order, OrderItem, OrderStatus};
use crate::address::Address;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: Address,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
