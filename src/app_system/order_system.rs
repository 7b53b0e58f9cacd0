use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{error, info, instrument};

use super::dashboard::{DashboardClient, DashboardService};
use super::effects::EffectDispatcher;
use super::suppressed::Suppressor;
use crate::api::StatusApi;
use crate::cache::{CacheClient, CacheService, OrderStore};
use crate::error::SystemError;
use crate::feed::{Connector, FeedClient, FeedService};
use crate::notifier::OrderNotifier;
use crate::view::{DashboardView, ViewTicker};

const MAILBOX_SIZE: usize = 100;

/// External collaborators the dashboard core is wired to.
pub struct SystemDeps {
    pub store: Arc<dyn OrderStore>,
    pub connector: Arc<dyn Connector>,
    pub notifier: Arc<dyn OrderNotifier>,
    pub api: Arc<dyn StatusApi>,
    pub suppressor: Suppressor,
    pub tick: Duration,
}

/// The application root: owns every service and hands out their clients.
pub struct OrderSystem {
    pub cache_client: CacheClient,
    pub feed_client: FeedClient,
    pub dashboard_client: DashboardClient,
    pub views: watch::Receiver<DashboardView>,
    stop_ticker: oneshot::Sender<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl OrderSystem {
    /// Hydrates the cache, starts every service and opens the feed.
    ///
    /// **Startup Order:**
    /// 1. Load persisted orders and start the cache
    /// 2. Start the feed service (not yet connected)
    /// 3. Start the dashboard loop fed by the feed's order channel, then the view ticker
    /// 4. Open the feed connection
    #[instrument(name = "order_system", skip(deps))]
    pub async fn start(deps: SystemDeps) -> Self {
        info!("Starting order dashboard");
        let mut handles = Vec::new();

        let orders = deps.store.load().await;
        let (cache_service, cache_client) = CacheService::new(MAILBOX_SIZE, orders);
        handles.push(tokio::spawn(cache_service.run()));

        let (feed_service, feed_client, feed_orders) =
            FeedService::new(MAILBOX_SIZE, deps.connector, deps.suppressor.clone());
        handles.push(tokio::spawn(feed_service.run()));

        let dispatcher = EffectDispatcher::new(deps.store, deps.notifier, deps.suppressor.clone());
        let (dashboard_service, dashboard_client) = DashboardService::new(
            MAILBOX_SIZE,
            feed_orders,
            cache_client.clone(),
            dispatcher,
            deps.api,
            deps.suppressor,
        );
        handles.push(tokio::spawn(dashboard_service.run()));

        let (ticker, views, stop_ticker) =
            ViewTicker::new(cache_client.clone(), feed_client.watch_state(), deps.tick);
        handles.push(tokio::spawn(ticker.run()));

        if let Err(e) = feed_client.start().await {
            error!(error = %e, "Order feed could not be started");
        }

        info!("Order dashboard started");
        Self {
            cache_client,
            feed_client,
            dashboard_client,
            views,
            stop_ticker,
            handles,
        }
    }

    /// Stops everything in reverse dependency order and waits for the tasks.
    #[instrument(skip(self))]
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down order dashboard");

        let _ = self.stop_ticker.send(());
        let _ = self.feed_client.shutdown().await;
        let _ = self.dashboard_client.shutdown().await;
        let _ = self.cache_client.shutdown().await;

        let mut first_failure = None;
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Service shutdown error");
                first_failure.get_or_insert(e);
            }
        }

        info!("Order dashboard shutdown complete");
        match first_failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
