use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::merge::{self, debug_assert_unique};
use crate::actor_framework::{client_method, ServiceResponse};
use crate::app_system::Effect;
use crate::domain::{Order, OrderId, OrderStatus};
use crate::error::CacheError;

#[derive(Debug)]
pub enum CacheRequest {
    Merge {
        order: Order,
        respond_to: ServiceResponse<Vec<Effect>>,
    },
    ApplyStatus {
        id: OrderId,
        status: OrderStatus,
        respond_to: ServiceResponse<Vec<Effect>>,
    },
    Snapshot {
        respond_to: ServiceResponse<Vec<Order>>,
    },
    Get {
        id: OrderId,
        respond_to: ServiceResponse<Option<Order>>,
    },
    Shutdown,
}

/// Owner of the in-memory order list, newest first.
///
/// Mutations never perform side effects themselves; they answer with the
/// [`Effect`]s the caller must dispatch (persist, notify).
pub struct CacheService {
    receiver: mpsc::Receiver<CacheRequest>,
    orders: Vec<Order>,
}

impl CacheService {
    pub fn new(buffer_size: usize, orders: Vec<Order>) -> (Self, CacheClient) {
        debug_assert_unique(&orders);
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self { receiver, orders };
        (service, CacheClient { sender })
    }

    #[instrument(name = "cache_service", skip(self))]
    pub async fn run(mut self) {
        info!(order_count = self.orders.len(), "CacheService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CacheRequest::Merge { order, respond_to } => {
                    self.handle_merge(order, respond_to);
                }
                CacheRequest::ApplyStatus { id, status, respond_to } => {
                    self.handle_apply_status(id, status, respond_to);
                }
                CacheRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.orders.clone());
                }
                CacheRequest::Get { id, respond_to } => {
                    let order = self.orders.iter().find(|order| order.id == id).cloned();
                    let _ = respond_to.send(order);
                }
                CacheRequest::Shutdown => {
                    info!("CacheService shutting down");
                    break;
                }
            }
        }

        info!("CacheService stopped");
    }

    #[instrument(fields(order_id = %order.id), skip(self, order, respond_to))]
    fn handle_merge(&mut self, order: Order, respond_to: ServiceResponse<Vec<Effect>>) {
        let merged = merge::merge(&self.orders, order.clone());
        if merged.len() == self.orders.len() {
            debug!("Order already cached");
            let _ = respond_to.send(Vec::new());
            return;
        }

        debug_assert_unique(&merged);
        self.orders = merged;
        info!(order_count = self.orders.len(), "Order merged into cache");

        let _ = respond_to.send(vec![Effect::Persist(self.orders.clone()), Effect::Notify(order)]);
    }

    #[instrument(fields(order_id = %id, new_status = %status), skip(self, id, status, respond_to))]
    fn handle_apply_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        respond_to: ServiceResponse<Vec<Effect>>,
    ) {
        let current = self.orders.iter().find(|order| order.id == id).map(|order| order.status);

        let effects = match current {
            None => {
                debug!("Order no longer cached, status not applied");
                Vec::new()
            }
            Some(current) if current == status => {
                debug!("Status unchanged");
                Vec::new()
            }
            Some(_) => {
                self.orders = merge::apply_status(&self.orders, id, status);
                info!("Order status applied");
                vec![Effect::Persist(self.orders.clone())]
            }
        };

        let _ = respond_to.send(effects);
    }
}

/// Handle to the cache service.
#[derive(Clone)]
pub struct CacheClient {
    sender: mpsc::Sender<CacheRequest>,
}

impl CacheClient {
    pub async fn shutdown(&self) -> Result<(), CacheError> {
        self.sender
            .send(CacheRequest::Shutdown)
            .await
            .map_err(|e| CacheError::ActorCommunicationError(e.to_string()))
    }
}

client_method!(CacheClient => fn merge(order: Order) -> Vec<Effect> as CacheRequest::Merge, Error = CacheError);
client_method!(CacheClient => fn apply_status(id: OrderId, status: OrderStatus) -> Vec<Effect> as CacheRequest::ApplyStatus, Error = CacheError);
client_method!(CacheClient => fn snapshot() -> Vec<Order> as CacheRequest::Snapshot, Error = CacheError);
client_method!(CacheClient => fn get(id: OrderId) -> Option<Order> as CacheRequest::Get, Error = CacheError);
