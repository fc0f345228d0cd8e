//! Requests from the bus side to the loop owning the projector.

use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use crate::ProjectorError;
use crate::node::{NodeId, PropValue, PropertyMap};
use crate::projector::Projector;
use crate::tree::LayoutNode;

/// dbusmenu event name that activates an item.
pub const EVENT_CLICKED: &str = "clicked";

/// A query or event forwarded to the projector's loop.
#[derive(Debug)]
pub enum MenuRequest {
    Layout {
        parent: NodeId,
        depth: i32,
        properties: Vec<String>,
        reply: oneshot::Sender<Result<(u32, LayoutNode), ProjectorError>>,
    },
    GroupProperties {
        ids: Vec<NodeId>,
        properties: Vec<String>,
        reply: oneshot::Sender<Vec<(NodeId, PropertyMap)>>,
    },
    Property {
        id: NodeId,
        name: String,
        reply: oneshot::Sender<Result<PropValue, ProjectorError>>,
    },
    Event {
        id: NodeId,
        event: String,
        timestamp: u32,
        reply: oneshot::Sender<Result<(), ProjectorError>>,
    },
}

/// Errors seen by a [`MenuClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Projector(#[from] ProjectorError),

    #[error("menu service is not running")]
    Closed,
}

/// Thread-safe handle that sends [`MenuRequest`]s and awaits the replies.
#[derive(Debug, Clone)]
pub struct MenuClient {
    tx: mpsc::Sender<MenuRequest>,
}

impl MenuClient {
    pub fn new(tx: mpsc::Sender<MenuRequest>) -> Self {
        Self { tx }
    }

    pub async fn layout(
        &self,
        parent: NodeId,
        depth: i32,
        properties: Vec<String>,
    ) -> Result<(u32, LayoutNode), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(MenuRequest::Layout {
            parent,
            depth,
            properties,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| ClientError::Closed)??)
    }

    pub async fn group_properties(
        &self,
        ids: Vec<NodeId>,
        properties: Vec<String>,
    ) -> Result<Vec<(NodeId, PropertyMap)>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(MenuRequest::GroupProperties {
            ids,
            properties,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    pub async fn property(&self, id: NodeId, name: String) -> Result<PropValue, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(MenuRequest::Property { id, name, reply }).await?;
        Ok(rx.await.map_err(|_| ClientError::Closed)??)
    }

    pub async fn event(&self, id: NodeId, event: String, timestamp: u32) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(MenuRequest::Event {
            id,
            event,
            timestamp,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| ClientError::Closed)??)
    }

    async fn send(&self, request: MenuRequest) -> Result<(), ClientError> {
        self.tx.send(request).await.map_err(|_| ClientError::Closed)
    }
}

impl Projector {
    /// Answers one request. A requester that stopped waiting is ignored.
    pub fn handle(&self, request: MenuRequest) {
        let delivered = match request {
            MenuRequest::Layout {
                parent,
                depth,
                properties,
                reply,
            } => reply.send(self.layout(parent, depth, &properties)).is_ok(),
            MenuRequest::GroupProperties {
                ids,
                properties,
                reply,
            } => reply.send(self.group_properties(&ids, &properties)).is_ok(),
            MenuRequest::Property { id, name, reply } => {
                reply.send(self.property(id, &name)).is_ok()
            }
            MenuRequest::Event {
                id,
                event,
                timestamp,
                reply,
            } => {
                let result = if event == EVENT_CLICKED {
                    self.activate(id, timestamp)
                } else {
                    trace!(node = %id, event = %event, "ignoring menu event");
                    Ok(())
                };
                if let Err(e) = &result {
                    warn!(node = %id, error = %e, "menu activation failed");
                }
                reply.send(result).is_ok()
            }
        };
        if !delivered {
            trace!("menu request reply dropped: requester went away");
        }
    }
}
