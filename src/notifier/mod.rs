//! New-order alerts: a desktop notification plus a short audio cue.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::app_system::{SuppressedKind, Suppressor};
use crate::domain::Order;
use crate::error::NotifyError;

#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn show(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait AudioCue: Send + Sync + 'static {
    async fn play(&self) -> Result<(), NotifyError>;
}

/// Alerts staff about a freshly merged order. Never fails.
#[async_trait]
pub trait OrderNotifier: Send + Sync + 'static {
    async fn notify(&self, order: &Order);
}

pub fn notification_text(order: &Order) -> (String, String) {
    let body = match order.customer_name.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => format!("Order #{} from {}", order.id, name),
        None => format!("New order #{}", order.id),
    };
    ("New order".to_string(), body)
}

pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    audio: Arc<dyn AudioCue>,
    suppressor: Suppressor,
}

impl Notifier {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        audio: Arc<dyn AudioCue>,
        suppressor: Suppressor,
    ) -> Self {
        Self {
            sink,
            audio,
            suppressor,
        }
    }
}

#[async_trait]
impl OrderNotifier for Notifier {
    #[instrument(fields(order_id = %order.id), skip(self, order))]
    async fn notify(&self, order: &Order) {
        let (title, body) = notification_text(order);

        if let Err(e) = self.sink.show(&title, &body).await {
            self.suppressor.report(SuppressedKind::Notification, &e);
        }
        if let Err(e) = self.audio.play().await {
            self.suppressor.report(SuppressedKind::Audio, &e);
        }
    }
}

async fn run_command(program: &str, args: &[&str]) -> Result<(), NotifyError> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|source| NotifyError::Launch {
            command: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(NotifyError::Exit {
            command: program.to_string(),
            status: status.to_string(),
        })
    }
}

/// Desktop notification through a `notify-send` compatible program.
pub struct CommandNotification {
    program: String,
}

impl CommandNotification {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandNotification {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

#[async_trait]
impl NotificationSink for CommandNotification {
    async fn show(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        run_command(&self.program, &[title, body]).await
    }
}

/// Plays the cue file with an external player; silent when either is unset.
pub struct CommandAudio {
    player: Option<String>,
    cue: Option<PathBuf>,
}

impl CommandAudio {
    pub fn new(player: Option<String>, cue: Option<PathBuf>) -> Self {
        Self { player, cue }
    }
}

#[async_trait]
impl AudioCue for CommandAudio {
    async fn play(&self) -> Result<(), NotifyError> {
        let (Some(player), Some(cue)) = (&self.player, &self.cue) else {
            debug!("No audio cue configured");
            return Ok(());
        };
        let cue = cue.to_string_lossy();
        run_command(player, &[cue.as_ref()]).await
    }
}
