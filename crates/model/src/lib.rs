//! Abstract menu model and action registry.
//!
//! These are the collaborators the tray bridge projects onto D-Bus:
//! - [`MenuModel`]: an ordered, nestable tree of attribute sets with
//!   section/submenu links and an items-changed notification.
//! - [`ActionGroup`]: named actions with an enabled flag, an optional typed
//!   state and an activation entry point.
//!
//! Both are single-threaded (`Rc`-based) and notify observers through
//! [`Subscription`] handles that disconnect on drop.

pub mod action;
pub mod icon;
pub mod menu;
pub mod signal;
pub mod target;
pub mod variant;

pub use action::{
    ActionEnabledChanged, ActionGroup, ActionStateChanged, SimpleAction, SimpleActionGroup,
};
pub use icon::{Icon, ThemedIcon};
pub use menu::{
    ATTRIBUTE_ACTION, ATTRIBUTE_ICON, ATTRIBUTE_LABEL, ATTRIBUTE_TARGET, ItemsChanged, LinkKind,
    Menu, MenuAttributes, MenuId, MenuItem, MenuLink, MenuModel,
};
pub use signal::Subscription;
pub use target::{TargetId, TargetRegistry};
pub use variant::{Variant, VariantType};

/// Errors raised by the menu model and action registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action '{0}' is disabled")]
    ActionDisabled(String),

    #[error("action '{action}' expects parameter {expected:?}, got {got:?}")]
    ParameterMismatch {
        action: String,
        expected: Option<VariantType>,
        got: Option<VariantType>,
    },

    #[error("action '{action}' holds state {expected:?}, got {got:?}")]
    StateMismatch {
        action: String,
        expected: Option<VariantType>,
        got: VariantType,
    },

    #[error("unknown action target: {0}")]
    UnknownTarget(String),
}
