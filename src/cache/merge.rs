use std::collections::HashSet;

use crate::domain::{Order, OrderId, OrderStatus};

pub fn contains(orders: &[Order], id: OrderId) -> bool {
    orders.iter().any(|order| order.id == id)
}

/// Prepends `incoming` unless an order with the same id is already known.
pub fn merge(existing: &[Order], incoming: Order) -> Vec<Order> {
    if contains(existing, incoming.id) {
        return existing.to_vec();
    }

    let mut updated = Vec::with_capacity(existing.len() + 1);
    updated.push(incoming);
    updated.extend_from_slice(existing);
    updated
}

/// Replaces the status of the order matching `id`; everything else is left as is.
pub fn apply_status(existing: &[Order], id: OrderId, status: OrderStatus) -> Vec<Order> {
    existing
        .iter()
        .map(|order| {
            if order.id == id {
                Order {
                    status,
                    ..order.clone()
                }
            } else {
                order.clone()
            }
        })
        .collect()
}

/// Drops later duplicates, keeping the first occurrence of every id.
pub fn dedup(orders: Vec<Order>) -> (Vec<Order>, usize) {
    let before = orders.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<Order> = orders.into_iter().filter(|order| seen.insert(order.id)).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

pub(crate) fn debug_assert_unique(orders: &[Order]) {
    if cfg!(debug_assertions) {
        let mut seen = HashSet::with_capacity(orders.len());
        for order in orders {
            assert!(seen.insert(order.id), "duplicate order id {} in cache", order.id);
        }
    }
}
