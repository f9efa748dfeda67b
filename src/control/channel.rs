// Request/reply channel between page contexts and the control handler
// Author: kelexine (https://github.com/kelexine)

use super::handler::ControlHandler;
use super::messages::{ControlMessage, ControlResult};
use crate::error::{Result, VaultError};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// One message in flight. The reply port is consumed exactly once.
#[derive(Debug)]
pub struct ControlRequest {
    pub id: Uuid,
    pub message: Value,
    pub reply: oneshot::Sender<ControlReply>,
}

/// Reply correlated to its request id.
#[derive(Debug, Clone)]
pub struct ControlReply {
    pub id: Uuid,
    pub result: ControlResult,
}

/// Sender side of the control channel. Cheap to clone.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    /// Start the receive loop. Each message runs on its own task so slow
    /// populates never block INFO or CLEAR.
    pub fn spawn(handler: ControlHandler, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ControlRequest>(capacity.max(1));

        let task = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let ControlRequest { id, message, reply } = request;
                    let result = handler.handle_value(message).await;
                    if reply.send(ControlReply { id, result }).is_err() {
                        debug!("Control caller {} went away before the reply", id);
                    }
                });
            }
            debug!("Control channel closed");
        });

        (Self { tx }, task)
    }

    /// Send a raw message and wait for its reply.
    pub async fn call(&self, message: Value) -> Result<ControlResult> {
        let id = Uuid::new_v4();
        let (reply, rx) = oneshot::channel();

        self.tx
            .send(ControlRequest { id, message, reply })
            .await
            .map_err(|_| VaultError::ChannelClosed)?;

        let answer = rx.await.map_err(|_| VaultError::ChannelClosed)?;
        if answer.id != id {
            warn!("Control reply id mismatch: sent {}, got {}", id, answer.id);
        }
        Ok(answer.result)
    }

    pub async fn send(&self, message: ControlMessage) -> Result<ControlResult> {
        self.call(message.to_value()).await
    }

    /// Like [`call`](Self::call), but gives up after `timeout`. The handler
    /// keeps running; its late reply is dropped.
    pub async fn call_with_timeout(&self, message: Value, timeout: Duration) -> Result<ControlResult> {
        tokio::time::timeout(timeout, self.call(message))
            .await
            .map_err(|_| VaultError::CallerTimeout(timeout))?
    }
}
