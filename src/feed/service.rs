use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, info, instrument};

use super::backoff::Backoff;
use super::connector::{Connection, Connector};
use super::protocol::FeedMessage;
use crate::actor_framework::{client_method, ServiceResponse};
use crate::app_system::{SuppressedKind, Suppressor};
use crate::domain::Order;
use crate::error::FeedError;

const EVENT_CAPACITY: usize = 256;

/// Connection status of the feed as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

/// Events broadcast to feed subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    OrderReceived(Order),
}

#[derive(Debug)]
pub enum FeedRequest {
    Start { respond_to: ServiceResponse<()> },
    Stop { respond_to: ServiceResponse<()> },
    Shutdown,
}

type ConnectAttempt = Pin<Box<dyn Future<Output = Result<Box<dyn Connection>, FeedError>> + Send>>;

enum Phase {
    Idle,
    Connecting(ConnectAttempt),
    Connected(Live),
    Waiting(Pin<Box<Sleep>>),
}

struct Live {
    connection: Box<dyn Connection>,
    opened_at: Instant,
    frames: u64,
}

/// Keeps a single connection to the order feed, reconnecting with backoff.
///
/// Decoded orders go to a single bounded `mpsc` consumer, so a slow consumer
/// holds back frame reading instead of losing orders. The broadcast events
/// are for observers only and may lag.
pub struct FeedService {
    receiver: mpsc::Receiver<FeedRequest>,
    connector: Arc<dyn Connector>,
    orders: mpsc::Sender<Order>,
    events: broadcast::Sender<FeedEvent>,
    state: watch::Sender<ConnectionState>,
    backoff: Backoff,
    suppressor: Suppressor,
}

impl FeedService {
    pub fn new(
        buffer_size: usize,
        connector: Arc<dyn Connector>,
        suppressor: Suppressor,
    ) -> (Self, FeedClient, mpsc::Receiver<Order>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (orders, orders_rx) = mpsc::channel(buffer_size);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, state_rx) = watch::channel(ConnectionState::Disconnected);

        let client = FeedClient {
            sender,
            events: events.clone(),
            state: state_rx,
        };
        let service = Self {
            receiver,
            connector,
            orders,
            events,
            state,
            backoff: Backoff::default(),
            suppressor,
        };
        (service, client, orders_rx)
    }

    #[instrument(name = "feed_service", skip(self))]
    pub async fn run(mut self) {
        info!("FeedService starting");
        let mut phase = Phase::Idle;

        loop {
            let next = match phase {
                Phase::Idle => {
                    let request = self.receiver.recv().await;
                    self.handle_request(request, Phase::Idle).await
                }
                Phase::Connecting(mut attempt) => {
                    tokio::select! {
                        request = self.receiver.recv() => {
                            self.handle_request(request, Phase::Connecting(attempt)).await
                        }
                        result = &mut attempt => Some(self.handle_connect_result(result)),
                    }
                }
                Phase::Connected(mut live) => {
                    tokio::select! {
                        request = self.receiver.recv() => {
                            self.handle_request(request, Phase::Connected(live)).await
                        }
                        frame = live.connection.next_text() => Some(self.handle_frame(frame, live).await),
                    }
                }
                Phase::Waiting(mut delay) => {
                    tokio::select! {
                        request = self.receiver.recv() => {
                            self.handle_request(request, Phase::Waiting(delay)).await
                        }
                        _ = &mut delay => Some(self.begin_connect()),
                    }
                }
            };

            match next {
                Some(next) => phase = next,
                None => break,
            }
        }

        info!("FeedService stopped");
    }

    async fn handle_request(&mut self, request: Option<FeedRequest>, current: Phase) -> Option<Phase> {
        let Some(request) = request else {
            debug!("All feed clients dropped");
            self.teardown(current).await;
            return None;
        };

        match request {
            FeedRequest::Start { respond_to } => {
                let next = match current {
                    Phase::Idle => {
                        info!("Starting order feed");
                        self.backoff.reset();
                        self.begin_connect()
                    }
                    running => {
                        debug!("Order feed already running");
                        running
                    }
                };
                let _ = respond_to.send(());
                Some(next)
            }
            FeedRequest::Stop { respond_to } => {
                self.teardown(current).await;
                let _ = respond_to.send(());
                Some(Phase::Idle)
            }
            FeedRequest::Shutdown => {
                info!("FeedService shutting down");
                self.teardown(current).await;
                None
            }
        }
    }

    /// Cancels a pending attempt or reconnect timer and closes a live connection.
    async fn teardown(&mut self, current: Phase) {
        match current {
            Phase::Connected(mut live) => {
                live.connection.close().await;
                let _ = self.events.send(FeedEvent::Disconnected);
            }
            Phase::Idle | Phase::Connecting(_) | Phase::Waiting(_) => {}
        }
        self.state.send_replace(ConnectionState::Stopped);
        info!("Order feed stopped");
    }

    fn begin_connect(&mut self) -> Phase {
        self.state.send_replace(ConnectionState::Connecting);
        let connector = self.connector.clone();
        Phase::Connecting(Box::pin(async move { connector.connect().await }))
    }

    fn handle_connect_result(&mut self, result: Result<Box<dyn Connection>, FeedError>) -> Phase {
        match result {
            Ok(connection) => {
                info!("Order feed connected");
                self.state.send_replace(ConnectionState::Connected);
                let _ = self.events.send(FeedEvent::Connected);
                Phase::Connected(Live {
                    connection,
                    opened_at: Instant::now(),
                    frames: 0,
                })
            }
            Err(e) => {
                self.suppressor.report(SuppressedKind::Connect, &e);
                self.schedule_reconnect()
            }
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<String, FeedError>>, mut live: Live) -> Phase {
        match frame {
            Some(Ok(text)) => {
                live.frames += 1;
                self.handle_text(&text).await;
                Phase::Connected(live)
            }
            Some(Err(e)) => {
                self.suppressor.report(SuppressedKind::Connection, &e);
                live.connection.close().await;
                self.connection_lost(live)
            }
            None => {
                info!("Order feed closed by peer");
                self.connection_lost(live)
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        match FeedMessage::decode(text) {
            Ok(message) => match message.into_new_order() {
                Some(mut order) => {
                    order.received_at = Some(Utc::now());
                    info!(order_id = %order.id, "Order received from feed");
                    let _ = self.events.send(FeedEvent::OrderReceived(order.clone()));
                    if self.orders.send(order).await.is_err() {
                        debug!("No order consumer attached");
                    }
                }
                None => debug!("Ignoring feed frame"),
            },
            Err(e) => self.suppressor.report(SuppressedKind::Decode, &e),
        }
    }

    /// A connection that stayed up or carried traffic earns a fresh backoff;
    /// one that drops straight after opening keeps growing the delay.
    fn connection_lost(&mut self, live: Live) -> Phase {
        if live.frames > 0 || live.opened_at.elapsed() >= self.backoff.base() {
            self.backoff.reset();
        }
        let _ = self.events.send(FeedEvent::Disconnected);
        self.schedule_reconnect()
    }

    fn schedule_reconnect(&mut self) -> Phase {
        let delay: Duration = self.backoff.next_delay();
        self.state.send_replace(ConnectionState::Disconnected);
        info!(delay_ms = delay.as_millis() as u64, "Order feed reconnect scheduled");
        Phase::Waiting(Box::pin(sleep(delay)))
    }
}

/// Handle to the feed service.
#[derive(Clone)]
pub struct FeedClient {
    sender: mpsc::Sender<FeedRequest>,
    events: broadcast::Sender<FeedEvent>,
    state: watch::Receiver<ConnectionState>,
}

impl FeedClient {
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub async fn shutdown(&self) -> Result<(), FeedError> {
        self.sender
            .send(FeedRequest::Shutdown)
            .await
            .map_err(|e| FeedError::ActorCommunicationError(e.to_string()))
    }
}

client_method!(FeedClient => fn start() -> () as FeedRequest::Start, Error = FeedError);
client_method!(FeedClient => fn stop() -> () as FeedRequest::Stop, Error = FeedError);
