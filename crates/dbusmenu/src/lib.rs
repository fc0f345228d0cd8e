//! Projection of an abstract menu model onto the `com.canonical.dbusmenu`
//! protocol.
//!
//! The [`Projector`] walks a [`MenuModel`](driveicon_model::MenuModel) into a
//! [`ProtocolTree`], keeps enabled and toggle properties in sync with an
//! [`ActionGroup`](driveicon_model::ActionGroup), and forwards activations
//! back to it. Changes are reported as [`MenuUpdate`]s.
//!
//! The projector is single-threaded. [`MenuService`] publishes it on a bus
//! connection: the zbus interface object forwards every request as a
//! [`MenuRequest`] to the loop that owns the projector, so the projector never
//! leaves its thread.

mod binding;
mod client;
mod dbus;
mod icon;
mod node;
mod projector;
mod tree;

pub use binding::BindingIndex;
pub use client::{ClientError, EVENT_CLICKED, MenuClient, MenuRequest};
pub use dbus::{DbusMenu, LayoutItem, MenuService};
pub use icon::{FirstName, IconLookup};
pub use node::{
    ALL_PROPERTIES, ActionBinding, NodeId, NodeKind, NodeProperties, PROP_CHILDREN_DISPLAY,
    PROP_ENABLED, PROP_ICON_DATA, PROP_ICON_NAME, PROP_LABEL, PROP_SHORTCUT, PROP_TOGGLE_STATE,
    PROP_TOGGLE_TYPE, PROP_TYPE, PROP_VISIBLE, PropValue, PropertyMap, ProtocolNode, ToggleState,
    ToggleType,
};
pub use projector::{MenuUpdate, Projector};
pub use tree::{LayoutNode, ProtocolTree};

use driveicon_model::ModelError;

/// Errors raised while projecting or serving a menu.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectorError {
    /// A menu item carries an icon that cannot be exported by name.
    #[error("unsupported icon kind: {0}")]
    UnsupportedIconKind(String),

    /// Activation of a node id that is not part of the current tree.
    #[error("unknown menu item: {0}")]
    UnknownActionTarget(i32),

    /// Layout or property query for a node id that is not part of the tree.
    #[error("no such menu node: {0}")]
    UnknownNode(i32),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// The action registry rejected an activation.
    #[error("activation failed: {0}")]
    Activation(#[from] ModelError),
}

/// Errors raised by the bus-facing menu service.
#[derive(Debug, thiserror::Error)]
pub enum MenuServiceError {
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("projector updates were already taken by another consumer")]
    UpdatesTaken,
}
