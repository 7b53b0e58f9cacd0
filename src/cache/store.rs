use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::merge::dedup;
use crate::app_system::{SuppressedKind, Suppressor};
use crate::domain::Order;
use crate::error::CacheError;

pub const ORDERS_FILE: &str = "pedidos.json";

/// Durable home of the order list.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Reads the persisted orders. Missing or unreadable data yields an empty list.
    async fn load(&self) -> Vec<Order>;

    /// Overwrites the persisted orders with `orders`.
    async fn save(&self, orders: &[Order]) -> Result<(), CacheError>;
}

/// A JSON document on disk, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub async fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, CacheError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(value)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, data).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

/// Stores the order list as `pedidos.json` inside the application data directory.
pub struct JsonFileStore {
    file: JsonFile,
    suppressor: Suppressor,
}

impl JsonFileStore {
    pub fn new(data_dir: impl AsRef<Path>, suppressor: Suppressor) -> Self {
        Self {
            file: JsonFile::new(data_dir.as_ref().join(ORDERS_FILE)),
            suppressor,
        }
    }
}

#[async_trait]
impl OrderStore for JsonFileStore {
    async fn load(&self) -> Vec<Order> {
        let records = match self.file.read::<Vec<serde_json::Value>>().await {
            Ok(Some(records)) => records,
            Ok(None) => {
                debug!(path = %self.file.path().display(), "No saved orders yet");
                return Vec::new();
            }
            Err(e) => {
                self.suppressor.report(SuppressedKind::Load, &e);
                return Vec::new();
            }
        };

        let mut orders = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Order>(record) {
                Ok(order) => orders.push(order),
                Err(e) => self.suppressor.report(
                    SuppressedKind::Load,
                    format!("skipped saved order at index {index}: {e}"),
                ),
            }
        }

        let (orders, dropped) = dedup(orders);
        if dropped > 0 {
            self.suppressor.report(
                SuppressedKind::Load,
                format!("dropped {dropped} duplicate orders from {}", self.file.path().display()),
            );
        }
        info!(order_count = orders.len(), "Orders loaded from local storage");
        orders
    }

    async fn save(&self, orders: &[Order]) -> Result<(), CacheError> {
        self.file.write(orders).await?;
        debug!(order_count = orders.len(), "Orders saved locally");
        Ok(())
    }
}
