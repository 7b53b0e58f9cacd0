use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::effects::EffectDispatcher;
use super::suppressed::{SuppressedKind, Suppressor};
use crate::actor_framework::{client_method, ServiceResponse};
use crate::api::StatusApi;
use crate::cache::CacheClient;
use crate::domain::{Order, OrderId, OrderStatus};
use crate::error::SystemError;

/// Outcome of a staff status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    Unchanged,
}

#[derive(Debug)]
pub enum DashboardRequest {
    UpdateStatus {
        id: OrderId,
        status: OrderStatus,
        respond_to: ServiceResponse<StatusUpdate>,
    },
    /// Sent back by the background API call once the backend confirmed.
    StatusConfirmed {
        id: OrderId,
        status: OrderStatus,
        respond_to: ServiceResponse<StatusUpdate>,
    },
    Shutdown,
}

/// The dashboard's event loop.
///
/// Feed orders and confirmed status changes are handled here one at a time,
/// so every cache mutation and its effects run in a single sequence.
pub struct DashboardService {
    receiver: mpsc::Receiver<DashboardRequest>,
    sender: mpsc::Sender<DashboardRequest>,
    feed_orders: mpsc::Receiver<Order>,
    cache: CacheClient,
    dispatcher: EffectDispatcher,
    api: Arc<dyn StatusApi>,
    suppressor: Suppressor,
}

impl DashboardService {
    pub fn new(
        buffer_size: usize,
        feed_orders: mpsc::Receiver<Order>,
        cache: CacheClient,
        dispatcher: EffectDispatcher,
        api: Arc<dyn StatusApi>,
        suppressor: Suppressor,
    ) -> (Self, DashboardClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            sender: sender.clone(),
            feed_orders,
            cache,
            dispatcher,
            api,
            suppressor,
        };
        (service, DashboardClient { sender })
    }

    #[instrument(name = "dashboard_service", skip(self))]
    pub async fn run(mut self) {
        info!("DashboardService starting");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(DashboardRequest::UpdateStatus { id, status, respond_to }) => {
                        self.handle_update_status(id, status, respond_to);
                    }
                    Some(DashboardRequest::StatusConfirmed { id, status, respond_to }) => {
                        self.handle_status_confirmed(id, status, respond_to).await;
                    }
                    Some(DashboardRequest::Shutdown) | None => {
                        info!("DashboardService shutting down");
                        break;
                    }
                },
                order = self.feed_orders.recv() => match order {
                    Some(order) => self.handle_order_received(order).await,
                    None => {
                        info!("Feed closed, DashboardService stopping");
                        break;
                    }
                },
            }
        }

        info!("DashboardService stopped");
    }

    #[instrument(fields(order_id = %order.id), skip(self, order))]
    async fn handle_order_received(&self, order: Order) {
        match self.cache.merge(order).await {
            Ok(effects) => self.dispatcher.dispatch(effects).await,
            Err(e) => self.suppressor.report(SuppressedKind::Cache, &e),
        }
    }

    /// Calls the API in its own task so feed orders keep flowing; only a
    /// confirmed change comes back through the mailbox.
    #[instrument(fields(order_id = %id, new_status = %status), skip(self, id, status, respond_to))]
    fn handle_update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        respond_to: ServiceResponse<StatusUpdate>,
    ) {
        debug!("Processing update_status request");
        let api = self.api.clone();
        let sender = self.sender.clone();
        let suppressor = self.suppressor.clone();

        tokio::spawn(async move {
            match api.update_status(id, status).await {
                Ok(()) => {
                    let confirmed = DashboardRequest::StatusConfirmed {
                        id,
                        status,
                        respond_to,
                    };
                    if sender.send(confirmed).await.is_err() {
                        debug!(order_id = %id, "Dashboard gone before status confirmation");
                    }
                }
                Err(e) => {
                    suppressor.report(SuppressedKind::StatusUpdate, &e);
                    let _ = respond_to.send(StatusUpdate::Unchanged);
                }
            }
        });
    }

    #[instrument(fields(order_id = %id, new_status = %status), skip(self, id, status, respond_to))]
    async fn handle_status_confirmed(
        &self,
        id: OrderId,
        status: OrderStatus,
        respond_to: ServiceResponse<StatusUpdate>,
    ) {
        let outcome = match self.cache.get(id).await {
            Ok(Some(_)) => self.cache.apply_status(id, status).await,
            Ok(None) => {
                debug!("Order left the cache before confirmation");
                let _ = respond_to.send(StatusUpdate::Unchanged);
                return;
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(effects) => {
                info!("Order status confirmed by backend");
                self.dispatcher.dispatch(effects).await;
                let _ = respond_to.send(StatusUpdate::Applied);
            }
            Err(e) => {
                self.suppressor.report(SuppressedKind::Cache, &e);
                let _ = respond_to.send(StatusUpdate::Unchanged);
            }
        }
    }
}

/// Handle to the dashboard event loop.
#[derive(Clone)]
pub struct DashboardClient {
    sender: mpsc::Sender<DashboardRequest>,
}

impl DashboardClient {
    pub async fn shutdown(&self) -> Result<(), SystemError> {
        self.sender
            .send(DashboardRequest::Shutdown)
            .await
            .map_err(|e| SystemError::ActorCommunicationError(e.to_string()))
    }
}

client_method!(DashboardClient => fn update_status(id: OrderId, status: OrderStatus) -> StatusUpdate as DashboardRequest::UpdateStatus, Error = SystemError);

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::CacheService;
    use crate::mock_framework::{MemoryStore, MockStatusApi, RecordingNotifier};
    use crate::app_system::SuppressedLog;

    async fn wait_for_reports(log: &SuppressedLog, kind: SuppressedKind, count: usize) {
        for _ in 0..200 {
            if log.count(kind) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} {kind:?} reports, got {}", log.count(kind));
    }

    #[tokio::test]
    async fn test_cache_failures_are_reported_and_not_applied() {
        let (cache_service, cache) = CacheService::new(10, vec![]);
        let cache_task = tokio::spawn(cache_service.run());
        cache.shutdown().await.unwrap();
        cache_task.await.unwrap();

        let (suppressor, log) = Suppressor::recording();
        let store = Arc::new(MemoryStore::default());
        let dispatcher = EffectDispatcher::new(
            store.clone(),
            Arc::new(RecordingNotifier::default()),
            suppressor.clone(),
        );
        let (orders_tx, orders_rx) = mpsc::channel(10);
        let (service, client) = DashboardService::new(
            10,
            orders_rx,
            cache,
            dispatcher,
            Arc::new(MockStatusApi::accepting()),
            suppressor,
        );
        tokio::spawn(service.run());

        orders_tx.send(Order::new(1, OrderStatus::New, vec![])).await.unwrap();
        wait_for_reports(&log, SuppressedKind::Cache, 1).await;

        let outcome = client.update_status(OrderId(1), OrderStatus::Ready).await.unwrap();
        assert_eq!(outcome, StatusUpdate::Unchanged);
        assert_eq!(log.count(SuppressedKind::Cache), 2);
        assert_eq!(store.save_count(), 0);
    }
}
