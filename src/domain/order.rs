use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Estimated minutes until an order is ready when the backend sends no ETA.
pub const DEFAULT_ETA_MINUTES: u32 = 30;

/// Server-assigned order identifier, stable for the lifetime of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kitchen workflow status of an order.
///
/// Decoding is lenient: any value outside the four known statuses (the
/// backend also knows `PAID` and `FAILED`) is displayed as [`OrderStatus::New`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum OrderStatus {
    #[default]
    New,
    InProgress,
    Ready,
    Delivered,
}

impl OrderStatus {
    /// Display order of the status groups on the dashboard.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Ready,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::InProgress => "In progress",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

/// Strict parse, used where an unknown status is a user mistake (CLI input).
impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(OrderStatus::New),
            "IN_PROGRESS" => Ok(OrderStatus::InProgress),
            "READY" => Ok(OrderStatus::Ready),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One line of an order. `subtotal` is always derived from `qty * unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IncomingItem")]
pub struct OrderItem {
    pub product_name: String,
    pub qty: NonZeroU32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Wire shape of an item.
///
/// The desktop app stored `{producto, cantidad, subtotal}` without a unit
/// price; the price is then recovered from the subtotal. Otherwise any
/// incoming subtotal is ignored.
#[derive(Deserialize)]
struct IncomingItem {
    #[serde(alias = "producto")]
    product_name: String,
    #[serde(alias = "cantidad")]
    qty: NonZeroU32,
    #[serde(default)]
    unit_price: Option<Decimal>,
    #[serde(default)]
    subtotal: Option<Decimal>,
}

impl TryFrom<IncomingItem> for OrderItem {
    type Error = String;

    fn try_from(item: IncomingItem) -> Result<Self, Self::Error> {
        let unit_price = match (item.unit_price, item.subtotal) {
            (Some(price), _) => price,
            (None, Some(subtotal)) => (subtotal / Decimal::from(item.qty.get())).normalize(),
            (None, None) => {
                return Err(format!("item {:?} has neither unit_price nor subtotal", item.product_name))
            }
        };
        Ok(OrderItem::new(item.product_name, item.qty, unit_price))
    }
}

impl OrderItem {
    pub fn new(product_name: impl Into<String>, qty: NonZeroU32, unit_price: Decimal) -> Self {
        Self {
            product_name: product_name.into(),
            qty,
            unit_price,
            subtotal: Decimal::from(qty.get()) * unit_price,
        }
    }
}

/// An order as known to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default, alias = "estado")]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Set by the feed client when the order arrives; never persisted.
    #[serde(skip)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "etaMinutes",
        alias = "eta_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub eta_minutes: Option<u32>,
    #[serde(
        default,
        alias = "name",
        alias = "cliente",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_name: Option<String>,
    #[serde(default, alias = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, alias = "direccion", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, alias = "pago", skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, alias = "creado", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Order {
    pub fn new(id: u64, status: OrderStatus, items: Vec<OrderItem>) -> Self {
        Self {
            id: OrderId(id),
            status,
            items,
            received_at: None,
            eta_minutes: None,
            customer_name: None,
            phone: None,
            address: None,
            payment_method: None,
            created_at: None,
        }
    }

    pub fn eta_minutes(&self) -> u32 {
        self.eta_minutes.unwrap_or(DEFAULT_ETA_MINUTES)
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(|item| item.subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subtotal_is_recomputed_from_qty_and_price() {
        let item: OrderItem = serde_json::from_value(json!({
            "product_name": "Ceviche mixto",
            "qty": 2,
            "unit_price": "1000.00",
            "subtotal": "1.00"
        }))
        .unwrap();

        assert_eq!(item.subtotal, Decimal::from(2000));
    }

    #[test]
    fn test_desktop_item_shape_recovers_unit_price() {
        let order: Order = serde_json::from_value(json!({
            "id": 1,
            "cliente": "Ana",
            "items": [{"producto": "Ceviche", "cantidad": 2, "subtotal": 12000}]
        }))
        .unwrap();

        let item = &order.items[0];
        assert_eq!(item.product_name, "Ceviche");
        assert_eq!(item.qty.get(), 2);
        assert_eq!(item.unit_price, Decimal::from(6000));
        assert_eq!(item.subtotal, Decimal::from(12000));
        assert_eq!(order.customer_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_item_without_any_price_is_rejected() {
        let result: Result<OrderItem, _> =
            serde_json::from_value(json!({"producto": "Gyoza", "cantidad": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let result: Result<OrderItem, _> = serde_json::from_value(json!({
            "product_name": "Gyoza",
            "qty": 0,
            "unit_price": 500
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_or_missing_status_reads_as_new() {
        let paid: Order = serde_json::from_value(json!({"id": 1, "status": "PAID"})).unwrap();
        let missing: Order = serde_json::from_value(json!({"id": 2})).unwrap();
        let legacy: Order = serde_json::from_value(json!({"id": 3, "estado": "READY"})).unwrap();

        assert_eq!(paid.status, OrderStatus::New);
        assert_eq!(missing.status, OrderStatus::New);
        assert_eq!(legacy.status, OrderStatus::Ready);
    }

    #[test]
    fn test_received_at_is_not_persisted() {
        let mut order = Order::new(5, OrderStatus::Ready, vec![]);
        order.received_at = Some(Utc::now());

        let encoded = serde_json::to_string(&order).unwrap();
        let decoded: Order = serde_json::from_str(&encoded).unwrap();

        assert!(!encoded.contains("received"));
        assert_eq!(decoded.received_at, None);
        assert_eq!(decoded.status, OrderStatus::Ready);
    }

    #[test]
    fn test_eta_defaults_to_thirty_minutes() {
        let order: Order = serde_json::from_value(json!({"id": 9})).unwrap();
        assert_eq!(order.eta_minutes(), 30);

        let order: Order = serde_json::from_value(json!({"id": 9, "etaMinutes": 12})).unwrap();
        assert_eq!(order.eta_minutes(), 12);
    }

    #[test]
    fn test_backend_order_shape_decodes() {
        let order: Order = serde_json::from_value(json!({
            "id": 42,
            "customer": 3,
            "name": "Ana",
            "phone": "+56 9 1234 5678",
            "status": "IN_PROGRESS",
            "total_price": "4500.00",
            "payment_method": "CASH",
            "items": [
                {"id": 1, "product_name": "Handroll Salmón", "qty": 1, "unit_price": "4500.00", "subtotal": "4500.00"}
            ]
        }))
        .unwrap();

        assert_eq!(order.id, OrderId(42));
        assert_eq!(order.customer_name.as_deref(), Some("Ana"));
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.total(), Decimal::from(4500));
    }

    #[test]
    fn test_strict_status_parse() {
        assert_eq!("ready".parse::<OrderStatus>(), Ok(OrderStatus::Ready));
        assert!("PAID".parse::<OrderStatus>().is_err());
    }
}
