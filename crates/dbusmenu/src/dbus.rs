//! `com.canonical.dbusmenu` over zbus.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use zbus::object_server::{InterfaceRef, SignalContext};
use zbus::zvariant::{OwnedValue, Structure, StructureBuilder, Type, Value};
use zbus::{Connection, fdo, interface};

use crate::client::{ClientError, MenuClient, MenuRequest};
use crate::node::{NodeId, PropValue, PropertyMap};
use crate::projector::{MenuUpdate, Projector};
use crate::tree::LayoutNode;
use crate::{MenuServiceError, ProjectorError};

/// Protocol version implemented.
const DBUSMENU_VERSION: u32 = 3;

/// Requests buffered between the bus and the projector loop.
const REQUEST_QUEUE: usize = 32;

type WireProperties = HashMap<String, Value<'static>>;

/// A `(ia{sv}av)` layout entry. Children are nested entries wrapped in
/// variants.
#[derive(Debug, Serialize, Type)]
pub struct LayoutItem {
    pub id: i32,
    pub properties: WireProperties,
    pub children: Vec<Value<'static>>,
}

impl From<LayoutNode> for LayoutItem {
    fn from(node: LayoutNode) -> Self {
        Self {
            id: node.id.0,
            properties: wire_properties(node.properties),
            children: node
                .children
                .into_iter()
                .map(|child| Value::from(layout_structure(child)))
                .collect(),
        }
    }
}

fn layout_structure(node: LayoutNode) -> Structure<'static> {
    let item = LayoutItem::from(node);
    StructureBuilder::new()
        .add_field(item.id)
        .add_field(item.properties)
        .add_field(item.children)
        .build()
}

fn wire_value(value: PropValue) -> Value<'static> {
    match value {
        PropValue::Str(s) => Value::from(s),
        PropValue::Bool(b) => Value::from(b),
        PropValue::Int(i) => Value::from(i),
        PropValue::Bytes(bytes) => Value::from(bytes),
        PropValue::Shortcut(keys) => Value::from(keys),
    }
}

fn wire_properties(properties: PropertyMap) -> WireProperties {
    properties
        .into_iter()
        .map(|(name, value)| (name, wire_value(value)))
        .collect()
}

fn to_fdo(err: ClientError) -> fdo::Error {
    match err {
        ClientError::Projector(
            e @ (ProjectorError::UnknownNode(_)
            | ProjectorError::UnknownActionTarget(_)
            | ProjectorError::UnknownProperty(_)),
        ) => fdo::Error::InvalidArgs(e.to_string()),
        other => fdo::Error::Failed(other.to_string()),
    }
}

/// The bus-facing object. Holds only a [`MenuClient`], so it is `Send` and
/// `Sync` while the projector stays on its own loop.
pub struct DbusMenu {
    client: MenuClient,
}

impl DbusMenu {
    pub fn new(client: MenuClient) -> Self {
        Self { client }
    }
}

#[interface(name = "com.canonical.dbusmenu")]
impl DbusMenu {
    #[zbus(out_args("revision", "layout"))]
    async fn get_layout(
        &self,
        parent_id: i32,
        recursion_depth: i32,
        property_names: Vec<String>,
    ) -> fdo::Result<(u32, LayoutItem)> {
        let (revision, layout) = self
            .client
            .layout(NodeId(parent_id), recursion_depth, property_names)
            .await
            .map_err(to_fdo)?;
        Ok((revision, LayoutItem::from(layout)))
    }

    async fn get_group_properties(
        &self,
        ids: Vec<i32>,
        property_names: Vec<String>,
    ) -> fdo::Result<Vec<(i32, WireProperties)>> {
        let ids = ids.into_iter().map(NodeId).collect();
        let nodes = self
            .client
            .group_properties(ids, property_names)
            .await
            .map_err(to_fdo)?;
        Ok(nodes
            .into_iter()
            .map(|(id, properties)| (id.0, wire_properties(properties)))
            .collect())
    }

    async fn get_property(&self, id: i32, name: String) -> fdo::Result<Value<'static>> {
        let value = self
            .client
            .property(NodeId(id), name)
            .await
            .map_err(to_fdo)?;
        Ok(wire_value(value))
    }

    async fn event(
        &self,
        id: i32,
        event_id: String,
        _data: OwnedValue,
        timestamp: u32,
    ) -> fdo::Result<()> {
        self.client
            .event(NodeId(id), event_id, timestamp)
            .await
            .map_err(to_fdo)
    }

    /// Returns the ids that were not found.
    async fn event_group(&self, events: Vec<(i32, String, OwnedValue, u32)>) -> fdo::Result<Vec<i32>> {
        let total = events.len();
        let mut id_errors = Vec::new();
        for (id, event_id, _data, timestamp) in events {
            match self.client.event(NodeId(id), event_id, timestamp).await {
                Ok(()) => {}
                Err(ClientError::Projector(ProjectorError::UnknownActionTarget(_))) => {
                    id_errors.push(id)
                }
                Err(ClientError::Projector(e)) => debug!(id, error = %e, "grouped event failed"),
                Err(e) => return Err(to_fdo(e)),
            }
        }
        if total > 0 && id_errors.len() == total {
            return Err(fdo::Error::InvalidArgs("no valid menu item ids".into()));
        }
        Ok(id_errors)
    }

    /// The tree is always current, so no update is ever needed.
    fn about_to_show(&self, id: i32) -> bool {
        trace!(id, "about to show");
        false
    }

    #[zbus(out_args("updates_needed", "id_errors"))]
    fn about_to_show_group(&self, ids: Vec<i32>) -> (Vec<i32>, Vec<i32>) {
        trace!(?ids, "about to show group");
        (Vec::new(), Vec::new())
    }

    #[zbus(property)]
    fn version(&self) -> u32 {
        DBUSMENU_VERSION
    }

    #[zbus(property)]
    fn text_direction(&self) -> String {
        "ltr".to_string()
    }

    #[zbus(property)]
    fn status(&self) -> String {
        "normal".to_string()
    }

    #[zbus(property)]
    fn icon_theme_path(&self) -> Vec<String> {
        Vec::new()
    }

    #[zbus(signal)]
    async fn items_properties_updated(
        ctxt: &SignalContext<'_>,
        updated_props: Vec<(i32, WireProperties)>,
        removed_props: Vec<(i32, Vec<String>)>,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn layout_updated(ctxt: &SignalContext<'_>, revision: u32, parent: i32) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn item_activation_requested(
        ctxt: &SignalContext<'_>,
        id: i32,
        timestamp: u32,
    ) -> zbus::Result<()>;
}

/// Serves a [`Projector`] on a bus connection.
///
/// [`MenuService::run`] owns the projector and must be driven on the thread
/// that created it (for example with `tokio::task::spawn_local`).
pub struct MenuService {
    projector: Projector,
    requests: mpsc::Receiver<MenuRequest>,
    updates: mpsc::UnboundedReceiver<MenuUpdate>,
    iface: InterfaceRef<DbusMenu>,
}

impl MenuService {
    /// Registers the dbusmenu object at `path`.
    pub async fn publish(
        connection: &Connection,
        path: &str,
        projector: Projector,
    ) -> Result<Self, MenuServiceError> {
        let updates = projector
            .take_updates()
            .ok_or(MenuServiceError::UpdatesTaken)?;
        let (tx, requests) = mpsc::channel(REQUEST_QUEUE);

        let server = connection.object_server();
        server.at(path, DbusMenu::new(MenuClient::new(tx))).await?;
        let iface = server.interface::<_, DbusMenu>(path).await?;
        info!(path, revision = projector.revision(), "dbusmenu published");

        Ok(Self {
            projector,
            requests,
            updates,
            iface,
        })
    }

    /// Answers bus requests and emits change signals until the interface is
    /// removed or the projector goes away. A signal that cannot be sent is
    /// logged and dropped.
    pub async fn run(mut self) -> Result<(), MenuServiceError> {
        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(request) => self.projector.handle(request),
                    None => break,
                },
                update = self.updates.recv() => match update {
                    Some(update) => {
                        if let Err(e) = self.emit(update).await {
                            warn!(error = %e, "failed to emit dbusmenu signal");
                        }
                    }
                    None => break,
                },
            }
        }
        info!("dbusmenu service stopped");
        Ok(())
    }

    async fn emit(&self, update: MenuUpdate) -> zbus::Result<()> {
        let ctxt = self.iface.signal_context();
        match update {
            MenuUpdate::LayoutUpdated { revision, parent } => {
                debug!(revision, %parent, "emitting LayoutUpdated");
                DbusMenu::layout_updated(ctxt, revision, parent.0).await?;
            }
            MenuUpdate::PropertiesUpdated(changed) => {
                debug!(nodes = changed.len(), "emitting ItemsPropertiesUpdated");
                let updated = changed
                    .into_iter()
                    .map(|(id, properties)| (id.0, wire_properties(properties)))
                    .collect();
                DbusMenu::items_properties_updated(ctxt, updated, Vec::new()).await?;
            }
        }
        Ok(())
    }
}
