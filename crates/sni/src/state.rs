//! The local state record behind the item's properties.

use driveicon_model::Icon;
use zbus::zvariant::OwnedObjectPath;

use crate::types::{Category, Pixmap, Status, ToolTip, TrayUpdate};

/// Signal to emit after a [`TrayUpdate`] has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSignal {
    NewTitle,
    NewStatus(Status),
    NewIcon,
    NewOverlayIcon,
    NewAttentionIcon,
    NewToolTip,
}

/// Current values of every exported property.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemState {
    pub category: Category,
    pub id: String,
    pub title: String,
    pub status: Status,
    pub window_id: u32,
    pub icon: Option<Icon>,
    pub overlay_icon: Option<Icon>,
    pub attention_icon: Option<Icon>,
    pub tooltip: Option<ToolTip>,
    pub item_is_menu: bool,
    /// Object path of the dbusmenu serving the context menu.
    pub menu: OwnedObjectPath,
}

impl ItemState {
    /// Stores the update and returns the signal announcing it.
    pub fn apply(&mut self, update: TrayUpdate) -> ItemSignal {
        match update {
            TrayUpdate::Title(title) => {
                self.title = title;
                ItemSignal::NewTitle
            }
            TrayUpdate::Status(status) => {
                self.status = status;
                ItemSignal::NewStatus(status)
            }
            TrayUpdate::Icon(icon) => {
                self.icon = icon;
                ItemSignal::NewIcon
            }
            TrayUpdate::OverlayIcon(icon) => {
                self.overlay_icon = icon;
                ItemSignal::NewOverlayIcon
            }
            TrayUpdate::AttentionIcon(icon) => {
                self.attention_icon = icon;
                ItemSignal::NewAttentionIcon
            }
            TrayUpdate::ToolTip(tooltip) => {
                self.tooltip = tooltip;
                ItemSignal::NewToolTip
            }
        }
    }

    /// `(icon-name, icon-pixmap, title, description)`; all empty without a
    /// tooltip.
    pub fn wire_tooltip(&self) -> (String, Vec<Pixmap>, String, String) {
        match &self.tooltip {
            Some(tip) => (
                icon_name(tip.icon.as_ref()),
                icon_pixmap(tip.icon.as_ref()),
                tip.title.clone(),
                tip.description.clone(),
            ),
            None => (String::new(), Vec::new(), String::new(), String::new()),
        }
    }
}

/// Themed icons export their preferred name; other kinds export none.
pub fn icon_name(icon: Option<&Icon>) -> String {
    icon.and_then(Icon::as_themed)
        .map(|themed| themed.primary_name().to_string())
        .unwrap_or_default()
}

/// Pixmaps are never exported.
pub fn icon_pixmap(_icon: Option<&Icon>) -> Vec<Pixmap> {
    Vec::new()
}
