//! Tray icon handle and configuration.

use driveicon_model::Icon;
use tokio::sync::mpsc;
use tracing::info;
use zbus::Connection;
use zbus::object_server::InterfaceRef;
use zbus::proxy::{CacheProperties, OwnerChangedStream};
use zbus::zvariant::OwnedObjectPath;

use crate::TrayError;
use crate::item::StatusNotifierItem;
use crate::state::ItemState;
use crate::types::{Category, Status, ToolTip, TrayEvent, TrayUpdate};
use crate::watcher::StatusNotifierWatcherProxy;

/// Object path shared by the item and its menu unless configured otherwise.
pub const DEFAULT_OBJECT_PATH: &str = "/SNIMenu";

/// Configuration for the tray icon.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayConfig {
    pub category: Category,
    /// Application identifier, stable across restarts.
    pub id: String,
    /// Human-readable name shown by some shells.
    pub title: String,
    pub status: Status,
    pub window_id: u32,
    pub icon: Option<Icon>,
    pub overlay_icon: Option<Icon>,
    pub attention_icon: Option<Icon>,
    pub tooltip: Option<ToolTip>,
    /// When set, shells show the menu on primary activation.
    pub item_is_menu: bool,
    /// Object path of the item. The dbusmenu is expected at the same path.
    pub object_path: String,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            category: Category::ApplicationStatus,
            id: "driveicon".into(),
            title: "DriveIcon".into(),
            status: Status::Active,
            window_id: 0,
            icon: Some(Icon::themed("drive-removable-media")),
            overlay_icon: None,
            attention_icon: None,
            tooltip: None,
            item_is_menu: false,
            object_path: DEFAULT_OBJECT_PATH.into(),
        }
    }
}

impl TrayConfig {
    /// Builds the initial property state.
    pub fn into_state(self) -> Result<ItemState, TrayError> {
        let menu = OwnedObjectPath::try_from(self.object_path.clone())
            .map_err(|_| TrayError::InvalidPath(self.object_path.clone()))?;
        Ok(ItemState {
            category: self.category,
            id: self.id,
            title: self.title,
            status: self.status,
            window_id: self.window_id,
            icon: self.icon,
            overlay_icon: self.overlay_icon,
            attention_icon: self.attention_icon,
            tooltip: self.tooltip,
            item_is_menu: self.item_is_menu,
            menu,
        })
    }
}

/// Handle to a published tray icon.
pub struct TrayIcon {
    iface: InterfaceRef<StatusNotifierItem>,
    events: Option<mpsc::UnboundedReceiver<TrayEvent>>,
    watcher: StatusNotifierWatcherProxy<'static>,
    path: String,
}

impl TrayIcon {
    /// Publishes the item on `connection` and registers it with the watcher.
    pub async fn publish(connection: &Connection, config: TrayConfig) -> Result<Self, TrayError> {
        let tray = Self::export(connection, config).await?;
        tray.register().await?;
        Ok(tray)
    }

    /// Publishes the item without registering it. Useful when no watcher
    /// may be running yet; call [`TrayIcon::register`] once one appears.
    pub async fn export(connection: &Connection, config: TrayConfig) -> Result<Self, TrayError> {
        let path = config.object_path.clone();
        let state = config.into_state()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let server = connection.object_server();
        if !server.at(path.as_str(), StatusNotifierItem::new(state, tx)).await? {
            return Err(TrayError::AlreadyExported(path));
        }
        let iface = server
            .interface::<_, StatusNotifierItem>(path.as_str())
            .await?;
        let watcher = StatusNotifierWatcherProxy::builder(connection)
            .cache_properties(CacheProperties::No)
            .build()
            .await?;

        Ok(Self {
            iface,
            events: Some(rx),
            watcher,
            path,
        })
    }

    /// Registers the item with the current watcher.
    ///
    /// Watchers forget their items when they restart, so hosts call this
    /// again whenever [`TrayIcon::watcher_changes`] yields a new owner.
    pub async fn register(&self) -> Result<(), TrayError> {
        self.watcher
            .register_status_notifier_item(&self.path)
            .await
            .map_err(TrayError::Registration)?;
        info!(path = %self.path, "status notifier item registered");
        Ok(())
    }

    /// Stream of owner changes of the watcher's bus name. `None` items mean
    /// the watcher went away.
    pub async fn watcher_changes(&self) -> Result<OwnerChangedStream<'_>, TrayError> {
        Ok(self.watcher.inner().receive_owner_changed().await?)
    }

    /// Applies `update` to the exported state, then emits its signal.
    pub async fn update(&self, update: TrayUpdate) -> Result<(), TrayError> {
        let signal = self.iface.get_mut().await.apply(update);
        StatusNotifierItem::announce(self.iface.signal_context(), signal).await?;
        Ok(())
    }

    /// Takes the event receiver. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TrayEvent>> {
        self.events.take()
    }

    /// Snapshot of the exported state.
    pub async fn state(&self) -> ItemState {
        self.iface.get().await.state().clone()
    }

    pub fn object_path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio::net::UnixStream;
    use zbus::connection::Builder;
    use zbus::{Guid, interface, proxy};

    use super::*;

    #[proxy(
        interface = "org.kde.StatusNotifierItem",
        default_service = "one.markle.DriveIconTest",
        default_path = "/SNIMenu"
    )]
    trait Item {
        fn activate(&self, x: i32, y: i32) -> zbus::Result<()>;

        #[zbus(property)]
        fn status(&self) -> zbus::Result<String>;

        #[zbus(property)]
        fn title(&self) -> zbus::Result<String>;

        #[zbus(signal)]
        fn new_status(&self, status: String) -> zbus::Result<()>;

        #[zbus(signal)]
        fn new_title(&self) -> zbus::Result<()>;
    }

    /// Records the services registered with it.
    struct Watcher {
        registered: mpsc::UnboundedSender<String>,
    }

    #[interface(name = "org.kde.StatusNotifierWatcher")]
    impl Watcher {
        fn register_status_notifier_item(&self, service: String) {
            let _ = self.registered.send(service);
        }
    }

    /// Two connected peers: the first serves the item, the second plays the
    /// shell.
    async fn peers() -> (Connection, Connection) {
        let (a, b) = UnixStream::pair().unwrap();
        let (service, shell) = tokio::try_join!(
            Builder::unix_stream(a).server(Guid::generate()).unwrap().p2p().build(),
            Builder::unix_stream(b).p2p().build(),
        )
        .unwrap();
        // Proxies ask their peer for name owners; make sure it answers.
        shell.object_server();
        (service, shell)
    }

    async fn item_proxy(shell: &Connection) -> ItemProxy<'static> {
        ItemProxy::builder(shell)
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .unwrap()
    }

    #[test]
    fn tray_config_default() {
        let config = TrayConfig::default();
        assert_eq!(config.id, "driveicon");
        assert_eq!(config.object_path, "/SNIMenu");
        assert_eq!(config.status, Status::Active);
        assert!(!config.item_is_menu);
    }

    #[test]
    fn config_becomes_state() {
        let config = TrayConfig {
            title: "Volumes".into(),
            category: Category::Hardware,
            ..TrayConfig::default()
        };
        let state = config.into_state().unwrap();
        assert_eq!(state.title, "Volumes");
        assert_eq!(state.category, Category::Hardware);
        assert_eq!(state.menu.as_str(), "/SNIMenu");
    }

    #[test]
    fn invalid_object_path_is_rejected() {
        let config = TrayConfig {
            object_path: "not a path".into(),
            ..TrayConfig::default()
        };
        assert!(matches!(config.into_state(), Err(TrayError::InvalidPath(p)) if p == "not a path"));
    }

    #[tokio::test]
    async fn status_is_current_when_signal_arrives() {
        let (service, shell) = peers().await;
        let tray = TrayIcon::export(&service, TrayConfig::default()).await.unwrap();
        let proxy = item_proxy(&shell).await;
        let mut changes = proxy.receive_new_status().await.unwrap();
        assert_eq!(proxy.status().await.unwrap(), "Active");

        tray.update(TrayUpdate::Status(Status::Passive)).await.unwrap();

        let signal = changes.next().await.unwrap();
        let args = signal.args().unwrap();
        assert_eq!(args.status(), "Passive");
        assert_eq!(proxy.status().await.unwrap(), "Passive");
        assert_eq!(tray.state().await.status, Status::Passive);
    }

    #[tokio::test]
    async fn title_is_current_when_signal_arrives() {
        let (service, shell) = peers().await;
        let tray = TrayIcon::export(&service, TrayConfig::default()).await.unwrap();
        let proxy = item_proxy(&shell).await;
        let mut changes = proxy.receive_new_title().await.unwrap();

        tray.update(TrayUpdate::Title("Volumes".into())).await.unwrap();

        changes.next().await.unwrap();
        assert_eq!(proxy.title().await.unwrap(), "Volumes");
    }

    #[tokio::test]
    async fn shell_calls_become_events() {
        let (service, shell) = peers().await;
        let mut tray = TrayIcon::export(&service, TrayConfig::default()).await.unwrap();
        let mut events = tray.take_events().unwrap();
        assert!(tray.take_events().is_none());

        item_proxy(&shell).await.activate(3, 4).await.unwrap();
        assert_eq!(events.recv().await, Some(TrayEvent::Activate { x: 3, y: 4 }));
    }

    #[tokio::test]
    async fn second_export_at_same_path_fails() {
        let (service, _shell) = peers().await;
        let _first = TrayIcon::export(&service, TrayConfig::default()).await.unwrap();
        let second = TrayIcon::export(&service, TrayConfig::default()).await;
        assert!(matches!(second, Err(TrayError::AlreadyExported(p)) if p == "/SNIMenu"));
    }

    #[tokio::test]
    async fn register_reaches_the_watcher() {
        let (service, shell) = peers().await;
        let (tx, mut registered) = mpsc::unbounded_channel();
        shell
            .object_server()
            .at("/StatusNotifierWatcher", Watcher { registered: tx })
            .await
            .unwrap();

        let tray = TrayIcon::publish(&service, TrayConfig::default()).await.unwrap();
        assert_eq!(registered.recv().await.as_deref(), Some(tray.object_path()));
    }

    #[tokio::test]
    async fn register_without_watcher_fails() {
        let (service, _shell) = peers().await;
        let tray = TrayIcon::export(&service, TrayConfig::default()).await.unwrap();
        assert!(matches!(tray.register().await, Err(TrayError::Registration(_))));
    }

    #[tokio::test]
    async fn watcher_changes_report_new_owners() {
        let (service, shell) = peers().await;
        let tray = TrayIcon::export(&service, TrayConfig::default()).await.unwrap();
        let mut changes = tray.watcher_changes().await.unwrap();
        assert_eq!(changes.name().as_str(), "org.kde.StatusNotifierWatcher");

        shell
            .emit_signal(
                None::<&str>,
                "/org/freedesktop/DBus",
                "org.freedesktop.DBus",
                "NameOwnerChanged",
                &("org.kde.StatusNotifierWatcher", "", ":1.7"),
            )
            .await
            .unwrap();

        let owner = changes.next().await.unwrap();
        assert_eq!(owner.as_ref().map(|o| o.as_str()), Some(":1.7"));
    }
}
