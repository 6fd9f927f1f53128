use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::SaleLine;

const TOP_PRODUCTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub revenue: Decimal,
    pub units_sold: i64,
}

#[derive(Debug, Serialize)]
pub struct SalesSummary {
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    pub total_sales: Decimal,
    pub order_count: i64,
    pub average_order_value: Decimal,
    pub units_sold: i64,
    pub top_products: Vec<ProductRevenue>,
    pub revenue_by_category: BTreeMap<String, Decimal>,
}

/// Aggregates order lines into the sales report.
pub fn summarize(lines: &[SaleLine], start: OffsetDateTime, end: OffsetDateTime) -> SalesSummary {
    let mut total_sales = Decimal::ZERO;
    let mut units_sold = 0i64;
    let mut orders = HashSet::new();
    let mut by_product: HashMap<(Option<Uuid>, &str), (Decimal, i64)> = HashMap::new();
    let mut revenue_by_category = BTreeMap::new();

    for line in lines {
        let revenue = line.unit_price * Decimal::from(line.quantity);
        total_sales += revenue;
        units_sold += i64::from(line.quantity);
        orders.insert(line.order_id);

        let entry = by_product
            .entry((line.product_id, line.name.as_str()))
            .or_insert((Decimal::ZERO, 0));
        entry.0 += revenue;
        entry.1 += i64::from(line.quantity);

        *revenue_by_category
            .entry(line.category.clone())
            .or_insert(Decimal::ZERO) += revenue;
    }

    let mut top_products: Vec<ProductRevenue> = by_product
        .into_iter()
        .map(|((product_id, name), (revenue, units))| ProductRevenue {
            product_id,
            name: name.to_string(),
            revenue,
            units_sold: units,
        })
        .collect();
    top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    top_products.truncate(TOP_PRODUCTS);

    let order_count = orders.len() as i64;
    let average_order_value = if order_count == 0 {
        Decimal::ZERO
    } else {
        (total_sales / Decimal::from(order_count)).round_dp(2)
    };

    SalesSummary {
        start_date: start,
        end_date: end,
        total_sales,
        order_count,
        average_order_value,
        units_sold,
        top_products,
        revenue_by_category,
    }
}

/// Units sold per unit currently in stock; zero for an empty shelf.
pub fn stock_turnover(units_sold: i64, stock: i32) -> Decimal {
    if stock <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(units_sold) / Decimal::from(stock)).round_dp(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn line(order: u128, product: u128, name: &str, category: &str, cents: i64, qty: i32) -> SaleLine {
        SaleLine {
            order_id: Uuid::from_u128(order),
            product_id: Some(Uuid::from_u128(product)),
            name: name.into(),
            category: category.into(),
            unit_price: Decimal::new(cents, 2),
            quantity: qty,
        }
    }

    #[test]
    fn aggregates_orders_products_and_categories() {
        let lines = vec![
            line(1, 10, "Mug", "kitchen", 1000, 2),
            line(1, 11, "Cap", "apparel", 1500, 1),
            line(2, 10, "Mug", "kitchen", 1000, 1),
        ];
        let start = datetime!(2024-06-01 0:00 UTC);
        let end = datetime!(2024-07-01 0:00 UTC);
        let s = summarize(&lines, start, end);

        assert_eq!(s.total_sales, Decimal::new(4500, 2));
        assert_eq!(s.order_count, 2);
        assert_eq!(s.average_order_value, Decimal::new(2250, 2));
        assert_eq!(s.units_sold, 4);
        assert_eq!(s.top_products[0].name, "Mug");
        assert_eq!(s.top_products[0].revenue, Decimal::new(3000, 2));
        assert_eq!(s.top_products[0].units_sold, 3);
        assert_eq!(s.revenue_by_category["kitchen"], Decimal::new(3000, 2));
        assert_eq!(s.revenue_by_category["apparel"], Decimal::new(1500, 2));
    }

    #[test]
    fn empty_window_reports_zeroes() {
        let t = datetime!(2024-06-01 0:00 UTC);
        let s = summarize(&[], t, t);
        assert_eq!(s.order_count, 0);
        assert_eq!(s.average_order_value, Decimal::ZERO);
        assert!(s.top_products.is_empty());
    }

    #[test]
    fn keeps_only_top_ten_products() {
        let lines: Vec<_> = (0..12)
            .map(|i| line(1, i, &format!("P{i:02}"), "misc", 100 * (i as i64 + 1), 1))
            .collect();
        let s = summarize(&lines, OffsetDateTime::UNIX_EPOCH, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(s.top_products.len(), 10);
        assert_eq!(s.top_products[0].name, "P11");
    }

    #[test]
    fn turnover_is_zero_without_stock() {
        assert_eq!(stock_turnover(10, 0), Decimal::ZERO);
        assert_eq!(stock_turnover(10, 4), Decimal::new(25, 1));
    }
}
