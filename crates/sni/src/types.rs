//! Value types shared by the tray icon and its host.

use driveicon_model::Icon;
use serde::{Deserialize, Serialize};

/// `(width, height, ARGB32 bytes)` as carried in pixmap properties.
pub type Pixmap = (i32, i32, Vec<u8>);

/// What kind of item this is, as advertised in `Category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    ApplicationStatus,
    Communications,
    SystemServices,
    Hardware,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::ApplicationStatus => "ApplicationStatus",
            Category::Communications => "Communications",
            Category::SystemServices => "SystemServices",
            Category::Hardware => "Hardware",
        }
    }
}

/// Visibility hint for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing to show; shells may hide the item.
    Passive,
    #[default]
    Active,
    NeedsAttention,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passive => "Passive",
            Status::Active => "Active",
            Status::NeedsAttention => "NeedsAttention",
        }
    }
}

/// Tooltip shown when hovering the item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolTip {
    pub icon: Option<Icon>,
    pub title: String,
    pub description: String,
}

/// Events relayed from the shell to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayEvent {
    /// The shell asked the item to show its context menu at `(x, y)`.
    ContextMenu { x: i32, y: i32 },
    /// Primary activation, usually a left click.
    Activate { x: i32, y: i32 },
    /// Secondary activation, usually a middle click.
    SecondaryActivate { x: i32, y: i32 },
    /// Mouse wheel; `orientation` is `"vertical"` or `"horizontal"`.
    Scroll { delta: i32, orientation: String },
}

/// Changes sent from the host to the tray icon.
#[derive(Debug, Clone, PartialEq)]
pub enum TrayUpdate {
    Title(String),
    Status(Status),
    Icon(Option<Icon>),
    OverlayIcon(Option<Icon>),
    AttentionIcon(Option<Icon>),
    ToolTip(Option<ToolTip>),
}
