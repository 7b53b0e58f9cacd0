//! Client side of the backend's order status endpoint.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{OrderId, OrderStatus};
use crate::error::ApiError;

#[async_trait]
pub trait StatusApi: Send + Sync + 'static {
    /// Succeeds only when the backend explicitly confirms the change.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct StatusPatch {
    status: OrderStatus,
}

/// `PATCH {base}/api/orders/{id}/` with `{"status": ...}`.
pub struct HttpStatusApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpStatusApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn order_url(&self, id: OrderId) -> String {
        format!("{}/api/orders/{}/", self.base_url, id)
    }
}

#[async_trait]
impl StatusApi for HttpStatusApi {
    #[instrument(fields(order_id = %id, new_status = %status), skip(self, id, status))]
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), ApiError> {
        let response = self
            .http
            .patch(self.order_url(id))
            .json(&StatusPatch { status })
            .send()
            .await?;

        let code = response.status();
        if code.is_success() {
            debug!(status_code = code.as_u16(), "Status update confirmed");
            Ok(())
        } else {
            Err(ApiError::Rejected {
                id: id.0,
                status: code.as_u16(),
            })
        }
    }
}
