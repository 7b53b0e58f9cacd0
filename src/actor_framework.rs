//! Shared plumbing for the service/client pairs.
//!
//! Each stateful component is a *service* that owns its state and drains an
//! `mpsc` mailbox one request at a time, plus a cloneable *client* handle that
//! sends typed requests carrying a `oneshot` responder.

use tokio::sync::oneshot;

pub type ServiceResponse<T> = oneshot::Sender<T>;

/// Generate a client method that sends `$request::$variant` and awaits the reply.
///
/// A closed or dropped mailbox maps to the error type's `ActorCommunicationError`.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[tracing::instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                tracing::debug!("Sending request");
                let (respond_to, response) = tokio::sync::oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| <$error_type>::ActorCommunicationError("Actor closed".to_string()))?;

                response.await.map_err(|_| <$error_type>::ActorCommunicationError("Actor dropped".to_string()))
            }
        }
    };
}

pub(crate) use client_method;
