use std::sync::Arc;

use tracing::{debug, instrument};

use super::suppressed::{SuppressedKind, Suppressor};
use crate::cache::OrderStore;
use crate::domain::Order;
use crate::notifier::OrderNotifier;

/// Side effect requested by a cache mutation, dispatched by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Overwrite local storage with this full order list.
    Persist(Vec<Order>),
    /// Alert staff about this newly merged order.
    Notify(Order),
}

/// Runs effects one by one; a failing effect never stops the next one.
#[derive(Clone)]
pub struct EffectDispatcher {
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn OrderNotifier>,
    suppressor: Suppressor,
}

impl EffectDispatcher {
    pub fn new(
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn OrderNotifier>,
        suppressor: Suppressor,
    ) -> Self {
        Self {
            store,
            notifier,
            suppressor,
        }
    }

    #[instrument(skip_all, fields(effect_count = effects.len()))]
    pub async fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Persist(orders) => {
                    if let Err(e) = self.store.save(&orders).await {
                        self.suppressor.report(SuppressedKind::Persist, &e);
                    }
                }
                Effect::Notify(order) => {
                    debug!(order_id = %order.id, "Dispatching notification");
                    let notifier = self.notifier.clone();
                    tokio::spawn(async move {
                        notifier.notify(&order).await;
                    });
                }
            }
        }
    }
}
