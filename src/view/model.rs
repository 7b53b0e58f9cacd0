use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{Order, OrderId, OrderItem, OrderStatus};
use crate::feed::ConnectionState;

/// Time left until the order should be ready.
///
/// `None` when the order has no arrival timestamp this session; zero once the
/// deadline has passed.
pub fn remaining_time(order: &Order, now: DateTime<Utc>) -> Option<Duration> {
    let received_at = order.received_at?;
    let deadline = received_at + chrono::Duration::minutes(i64::from(order.eta_minutes()));
    Some((deadline - now).to_std().unwrap_or(Duration::ZERO))
}

pub fn elapsed_time(order: &Order, now: DateTime<Utc>) -> Option<Duration> {
    let received_at = order.received_at?;
    Some((now - received_at).to_std().unwrap_or(Duration::ZERO))
}

pub fn status_color(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::New => "#2ecc71",
        OrderStatus::InProgress => "#f1c40f",
        OrderStatus::Ready => "#3498db",
        OrderStatus::Delivered => "#95a5a6",
    }
}

pub fn format_countdown(remaining: Option<Duration>) -> String {
    match remaining {
        None => "--:--".to_string(),
        Some(left) if left.is_zero() => "ready".to_string(),
        Some(left) => {
            let secs = left.as_secs();
            format!("{:02}:{:02}", secs / 60, secs % 60)
        }
    }
}

pub fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => "Connected",
        ConnectionState::Connecting | ConnectionState::Disconnected => "Reconnecting...",
        ConnectionState::Stopped => "Disconnected",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub id: OrderId,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub color: &'static str,
    pub customer: String,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub remaining: Option<Duration>,
    pub elapsed: Option<Duration>,
    pub countdown: String,
}

impl OrderView {
    pub fn project(order: &Order, now: DateTime<Utc>) -> Self {
        let remaining = remaining_time(order, now);
        Self {
            id: order.id,
            status: order.status,
            status_label: order.status.label(),
            color: status_color(order.status),
            customer: order
                .customer_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            items: order.items.clone(),
            total: order.total(),
            remaining,
            elapsed: elapsed_time(order, now),
            countdown: format_countdown(remaining),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusGroup {
    pub status: OrderStatus,
    pub orders: Vec<OrderView>,
}

/// Everything the dashboard draws, recomputed on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub connection: ConnectionState,
    pub connection_label: &'static str,
    pub groups: Vec<StatusGroup>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardView {
    /// Groups follow [`OrderStatus::ALL`]; inside a group the cache order is kept.
    pub fn project(orders: &[Order], connection: ConnectionState, now: DateTime<Utc>) -> Self {
        let groups = OrderStatus::ALL
            .iter()
            .map(|status| StatusGroup {
                status: *status,
                orders: orders
                    .iter()
                    .filter(|order| order.status == *status)
                    .map(|order| OrderView::project(order, now))
                    .collect(),
            })
            .collect();

        Self {
            connection,
            connection_label: connection_label(connection),
            groups,
            generated_at: now,
        }
    }

    pub fn empty(connection: ConnectionState) -> Self {
        Self::project(&[], connection, Utc::now())
    }

    pub fn order_count(&self) -> usize {
        self.groups.iter().map(|group| group.orders.len()).sum()
    }

    /// Ids and statuses per group, ignoring the ticking countdowns.
    pub fn layout(&self) -> (ConnectionState, Vec<(OrderId, OrderStatus)>) {
        let orders = self
            .groups
            .iter()
            .flat_map(|group| group.orders.iter().map(|order| (order.id, order.status)))
            .collect();
        (self.connection, orders)
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.connection_label)?;
        if self.order_count() == 0 {
            return writeln!(f, "No orders yet...");
        }

        for group in self.groups.iter().filter(|group| !group.orders.is_empty()) {
            writeln!(f, "== {} ({})", group.status.label(), group.orders.len())?;
            for order in &group.orders {
                write!(
                    f,
                    "  #{} {} total ${} [{}]",
                    order.id, order.customer, order.total, order.countdown
                )?;
                match order.elapsed {
                    Some(elapsed) => writeln!(f, " received {}m ago", elapsed.as_secs() / 60)?,
                    None => writeln!(f)?,
                }
                for item in &order.items {
                    writeln!(f, "    {} x {} ${}", item.qty, item.product_name, item.subtotal)?;
                }
            }
        }
        Ok(())
    }
}
