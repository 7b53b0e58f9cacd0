//! # Mock Framework
//!
//! Test doubles for the dashboard's external collaborators.
//!
//! - [`MockConnector`] hands out scripted feed connections and records when
//!   each connection attempt happened.
//! - [`MemoryStore`] keeps every saved snapshot in memory.
//! - [`RecordingNotifier`], [`RecordingSink`] and [`FailingAudio`] stand in for
//!   platform alerts.
//! - [`MockStatusApi`] accepts or rejects status updates.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use crate::api::StatusApi;
use crate::cache::OrderStore;
use crate::domain::{Order, OrderId, OrderStatus};
use crate::error::{ApiError, CacheError, FeedError, NotifyError};
use crate::feed::{Connection, Connector};
use crate::notifier::{AudioCue, NotificationSink, OrderNotifier};

pub type FrameSender = mpsc::UnboundedSender<Result<String, FeedError>>;

enum Plan {
    Open(mpsc::UnboundedReceiver<Result<String, FeedError>>),
    Fail,
}

/// Connector whose attempts follow a queue of plans; an empty queue fails.
#[derive(Default)]
pub struct MockConnector {
    plans: Mutex<VecDeque<Plan>>,
    attempts: Mutex<Vec<Instant>>,
    closes: Arc<AtomicUsize>,
    attempted: Notify,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a connection that stays open until the returned sender is dropped.
    pub fn push_open(&self) -> FrameSender {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.plans.lock().unwrap().push_back(Plan::Open(receiver));
        sender
    }

    /// Queues a connection that the peer closes right after it opens.
    pub fn push_closed(&self) {
        let (_, receiver) = mpsc::unbounded_channel();
        self.plans.lock().unwrap().push_back(Plan::Open(receiver));
    }

    pub fn push_failure(&self) {
        self.plans.lock().unwrap().push_back(Plan::Fail);
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub async fn wait_for_attempts(&self, count: usize) -> Vec<Instant> {
        loop {
            let attempted = self.attempted.notified();
            let attempts = self.attempts();
            if attempts.len() >= count {
                return attempts;
            }
            attempted.await;
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, FeedError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let plan = self.plans.lock().unwrap().pop_front().unwrap_or(Plan::Fail);
        self.attempted.notify_waiters();

        match plan {
            Plan::Open(frames) => Ok(Box::new(MockConnection {
                frames,
                closes: self.closes.clone(),
            })),
            Plan::Fail => Err(FeedError::Connect("connection refused".to_string())),
        }
    }
}

struct MockConnection {
    frames: mpsc::UnboundedReceiver<Result<String, FeedError>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn next_text(&mut self) -> Option<Result<String, FeedError>> {
        self.frames.recv().await
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.frames.close();
    }
}

/// In-memory [`OrderStore`] recording every saved snapshot.
#[derive(Default)]
pub struct MemoryStore {
    initial: Vec<Order>,
    saves: Mutex<Vec<Vec<Order>>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            initial: orders,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<Vec<Order>> {
        self.saves.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn load(&self) -> Vec<Order> {
        self.initial.clone()
    }

    async fn save(&self, orders: &[Order]) -> Result<(), CacheError> {
        self.saves.lock().unwrap().push(orders.to_vec());
        if self.fail_saves {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only storage",
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<Order>>,
    changed: Notify,
}

impl RecordingNotifier {
    pub fn notified(&self) -> Vec<Order> {
        self.notified.lock().unwrap().clone()
    }

    pub async fn wait_for(&self, count: usize) -> Vec<Order> {
        loop {
            let changed = self.changed.notified();
            let notified = self.notified();
            if notified.len() >= count {
                return notified;
            }
            changed.await;
        }
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn notify(&self, order: &Order) {
        self.notified.lock().unwrap().push(order.clone());
        self.changed.notify_waiters();
    }
}

#[derive(Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.shown.lock().unwrap().push((title.to_string(), body.to_string()));
        if self.fail {
            return Err(NotifyError::Exit {
                command: "notify-send".to_string(),
                status: "permission denied".to_string(),
            });
        }
        Ok(())
    }
}

pub struct FailingAudio;

#[async_trait]
impl AudioCue for FailingAudio {
    async fn play(&self) -> Result<(), NotifyError> {
        Err(NotifyError::Exit {
            command: "paplay".to_string(),
            status: "no audio device".to_string(),
        })
    }
}

/// Status API that either confirms or rejects every update.
pub struct MockStatusApi {
    accept: bool,
    calls: Mutex<Vec<(OrderId, OrderStatus)>>,
}

impl MockStatusApi {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(OrderId, OrderStatus)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusApi for MockStatusApi {
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push((id, status));
        if self.accept {
            Ok(())
        } else {
            Err(ApiError::Rejected { id: id.0, status: 409 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connector_follows_plans() {
        let connector = MockConnector::new();
        let frames = connector.push_open();
        connector.push_failure();

        let mut connection = connector.connect().await.unwrap();
        frames.send(Ok("hello".to_string())).unwrap();
        assert_eq!(connection.next_text().await.unwrap().unwrap(), "hello");

        drop(frames);
        assert!(connection.next_text().await.is_none());

        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_err());
        assert_eq!(connector.wait_for_attempts(3).await.len(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_records_snapshots() {
        let store = MemoryStore::with_orders(vec![Order::new(1, OrderStatus::New, vec![])]);

        assert_eq!(store.load().await.len(), 1);
        store.save(&[]).await.unwrap();
        assert_eq!(store.saves(), vec![Vec::<Order>::new()]);
    }
}
