//! The `org.kde.StatusNotifierItem` interface object.

use tokio::sync::mpsc;
use tracing::{debug, warn};
use zbus::interface;
use zbus::object_server::SignalContext;
use zbus::zvariant::OwnedObjectPath;

use crate::state::{ItemSignal, ItemState, icon_name, icon_pixmap};
use crate::types::{Pixmap, TrayEvent, TrayUpdate};

/// Exposes an [`ItemState`] and relays shell requests as [`TrayEvent`]s.
pub struct StatusNotifierItem {
    state: ItemState,
    events: mpsc::UnboundedSender<TrayEvent>,
}

impl StatusNotifierItem {
    pub fn new(state: ItemState, events: mpsc::UnboundedSender<TrayEvent>) -> Self {
        Self { state, events }
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    pub(crate) fn apply(&mut self, update: TrayUpdate) -> ItemSignal {
        self.state.apply(update)
    }

    fn relay(&self, event: TrayEvent) {
        debug!(?event, "tray event");
        if self.events.send(event).is_err() {
            warn!("tray event dropped: host stopped listening");
        }
    }

    /// Emits the signal announcing an applied update.
    pub(crate) async fn announce(ctxt: &SignalContext<'_>, signal: ItemSignal) -> zbus::Result<()> {
        match signal {
            ItemSignal::NewTitle => Self::new_title(ctxt).await,
            ItemSignal::NewStatus(status) => Self::new_status(ctxt, status.as_str()).await,
            ItemSignal::NewIcon => Self::new_icon(ctxt).await,
            ItemSignal::NewOverlayIcon => Self::new_overlay_icon(ctxt).await,
            ItemSignal::NewAttentionIcon => Self::new_attention_icon(ctxt).await,
            ItemSignal::NewToolTip => Self::new_tool_tip(ctxt).await,
        }
    }
}

#[interface(name = "org.kde.StatusNotifierItem")]
impl StatusNotifierItem {
    fn context_menu(&self, x: i32, y: i32) {
        self.relay(TrayEvent::ContextMenu { x, y });
    }

    fn activate(&self, x: i32, y: i32) {
        self.relay(TrayEvent::Activate { x, y });
    }

    fn secondary_activate(&self, x: i32, y: i32) {
        self.relay(TrayEvent::SecondaryActivate { x, y });
    }

    fn scroll(&self, delta: i32, orientation: String) {
        self.relay(TrayEvent::Scroll { delta, orientation });
    }

    #[zbus(property)]
    fn category(&self) -> String {
        self.state.category.as_str().to_string()
    }

    #[zbus(property)]
    fn id(&self) -> String {
        self.state.id.clone()
    }

    #[zbus(property)]
    fn title(&self) -> String {
        self.state.title.clone()
    }

    #[zbus(property)]
    fn status(&self) -> String {
        self.state.status.as_str().to_string()
    }

    #[zbus(property)]
    fn window_id(&self) -> u32 {
        self.state.window_id
    }

    #[zbus(property)]
    fn icon_name(&self) -> String {
        icon_name(self.state.icon.as_ref())
    }

    #[zbus(property)]
    fn icon_pixmap(&self) -> Vec<Pixmap> {
        icon_pixmap(self.state.icon.as_ref())
    }

    #[zbus(property)]
    fn overlay_icon_name(&self) -> String {
        icon_name(self.state.overlay_icon.as_ref())
    }

    #[zbus(property)]
    fn overlay_icon_pixmap(&self) -> Vec<Pixmap> {
        icon_pixmap(self.state.overlay_icon.as_ref())
    }

    #[zbus(property)]
    fn attention_icon_name(&self) -> String {
        icon_name(self.state.attention_icon.as_ref())
    }

    #[zbus(property)]
    fn attention_icon_pixmap(&self) -> Vec<Pixmap> {
        icon_pixmap(self.state.attention_icon.as_ref())
    }

    #[zbus(property)]
    fn attention_movie_name(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn tool_tip(&self) -> (String, Vec<Pixmap>, String, String) {
        self.state.wire_tooltip()
    }

    #[zbus(property)]
    fn item_is_menu(&self) -> bool {
        self.state.item_is_menu
    }

    #[zbus(property)]
    fn menu(&self) -> OwnedObjectPath {
        self.state.menu.clone()
    }

    #[zbus(signal)]
    async fn new_title(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_attention_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_overlay_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_tool_tip(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_status(ctxt: &SignalContext<'_>, status: &str) -> zbus::Result<()>;
}
