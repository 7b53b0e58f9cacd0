use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use super::model::DashboardView;
use crate::cache::CacheClient;
use crate::feed::ConnectionState;

/// Recomputes the dashboard view from the cache on a fixed period.
pub struct ViewTicker {
    cache: CacheClient,
    connection: watch::Receiver<ConnectionState>,
    views: watch::Sender<DashboardView>,
    period: Duration,
    stop: oneshot::Receiver<()>,
}

impl ViewTicker {
    pub fn new(
        cache: CacheClient,
        connection: watch::Receiver<ConnectionState>,
        period: Duration,
    ) -> (Self, watch::Receiver<DashboardView>, oneshot::Sender<()>) {
        let initial = DashboardView::empty(*connection.borrow());
        let (views, views_rx) = watch::channel(initial);
        let (stop_tx, stop) = oneshot::channel();

        let ticker = Self {
            cache,
            connection,
            views,
            period,
            stop,
        };
        (ticker, views_rx, stop_tx)
    }

    #[instrument(name = "view_ticker", skip(self), fields(period_ms = self.period.as_millis() as u64))]
    pub async fn run(mut self) {
        info!("ViewTicker starting");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut self.stop => break,
                _ = interval.tick() => {
                    if !self.refresh().await {
                        break;
                    }
                }
            }
        }

        info!("ViewTicker stopped");
    }

    /// Returns `false` once the cache is gone.
    async fn refresh(&self) -> bool {
        let orders = match self.cache.snapshot().await {
            Ok(orders) => orders,
            Err(e) => {
                debug!(error = %e, "Cache unavailable, stopping ticker");
                return false;
            }
        };

        let connection = *self.connection.borrow();
        let view = DashboardView::project(&orders, connection, Utc::now());
        self.views.send_replace(view);
        true
    }
}
