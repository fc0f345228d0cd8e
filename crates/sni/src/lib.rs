//! StatusNotifierItem tray icon for the DriveIcon tray bridge.
//!
//! Publishes an `org.kde.StatusNotifierItem` object and registers it with the
//! session's `org.kde.StatusNotifierWatcher`. The host talks to it via:
//! - [`TrayUpdate`]: changes to title, status, icons or tooltip, applied
//!   through [`TrayIcon::update`]
//! - [`TrayEvent`]: clicks and scrolls relayed from the desktop shell
//!
//! The context menu itself is served separately (see `driveicon-dbusmenu`)
//! at the object path advertised in the `Menu` property.

mod item;
mod state;
mod tray;
mod types;
mod watcher;

pub use item::StatusNotifierItem;
pub use state::{ItemSignal, ItemState};
pub use tray::{TrayConfig, TrayIcon};
pub use types::{Category, Pixmap, Status, ToolTip, TrayEvent, TrayUpdate};
pub use watcher::StatusNotifierWatcherProxy;

/// Errors raised while publishing or updating the tray icon.
#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    #[error("D-Bus connection error: {0}")]
    Connection(#[from] zbus::Error),

    #[error("status notifier watcher rejected the item: {0}")]
    Registration(zbus::Error),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("a status notifier item is already published at {0}")]
    AlreadyExported(String),
}
