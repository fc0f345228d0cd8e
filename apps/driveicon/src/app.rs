//! Application orchestrator: wires the volume menu, the dbusmenu service and
//! the tray icon together.

use std::pin::pin;
use std::rc::Rc;
use std::time::Duration;

use driveicon_dbusmenu::{FirstName, MenuService, Projector};
use driveicon_model::{Menu, MenuModel, Subscription};
use driveicon_sni::{Status, TrayEvent, TrayIcon, TrayUpdate};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use zbus::Connection;

use crate::config::Config;
use crate::volumes::VolumeMenu;

/// Tray status for a root menu: nothing to show means passive.
pub fn status_for(menu: &dyn MenuModel) -> Status {
    if menu.n_items() == 0 {
        Status::Passive
    } else {
        Status::Active
    }
}

/// Sends the menu's status on `tx` after every structural change.
fn follow_status(menu: &Rc<Menu>, tx: mpsc::UnboundedSender<Status>) -> Subscription {
    let weak = Rc::downgrade(menu);
    menu.connect_items_changed(Box::new(move |_| {
        if let Some(menu) = weak.upgrade()
            && tx.send(status_for(&*menu)).is_err()
        {
            tracing::debug!("status change dropped: event loop stopped");
        }
    }))
}

/// Runs the tray bridge until interrupted.
///
/// Must be driven inside a `LocalSet`: the menu, its projection and the
/// volume commands live on this thread.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let connection = Connection::session().await?;

    // -- Volume menu --
    let volumes = VolumeMenu::new(&config);
    if let Err(e) = volumes.refresh() {
        tracing::warn!(error = %e, "failed to read the mount table");
    }
    let menu = volumes.menu();

    // -- dbusmenu --
    let projector = Projector::new(menu.clone(), volumes.actions(), FirstName)?;
    let service = MenuService::publish(&connection, &config.object_path, projector).await?;
    tokio::task::spawn_local(async move {
        if let Err(e) = service.run().await {
            tracing::error!("dbusmenu service error: {e}");
        }
    });

    // -- Tray --
    let mut tray_config = config.tray_config();
    tray_config.status = status_for(&*menu);
    let mut status = tray_config.status;
    let mut tray = TrayIcon::export(&connection, tray_config).await?;
    let Some(mut events) = tray.take_events() else {
        anyhow::bail!("tray events already taken");
    };
    let mut watcher_changes = pin!(tray.watcher_changes().await?);
    if let Err(e) = tray.register().await {
        tracing::warn!("no status notifier watcher yet, waiting for one: {e}");
    }

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let _status_subscription = follow_status(&menu, status_tx);

    let mut rescan = tokio::time::interval(Duration::from_secs(config.refresh_interval.max(1)));
    rescan.tick().await;

    tracing::info!("DriveIcon ready");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
            Some(mut next) = status_rx.recv() => {
                // Only the latest of a burst of changes is announced.
                while let Ok(later) = status_rx.try_recv() {
                    next = later;
                }
                if next != status {
                    status = next;
                    tracing::debug!(status = next.as_str(), "tray status changed");
                    tray.update(TrayUpdate::Status(next)).await?;
                }
            }
            Some(event) = events.recv() => handle_event(&volumes, event),
            Some(owner) = watcher_changes.next() => match owner {
                Some(owner) => {
                    tracing::info!(%owner, "status notifier watcher appeared");
                    if let Err(e) = tray.register().await {
                        tracing::warn!("re-registration failed: {e}");
                    }
                }
                None => tracing::info!("status notifier watcher went away"),
            },
            _ = rescan.tick() => {
                if let Err(e) = volumes.refresh() {
                    tracing::warn!(error = %e, "failed to rescan mounts");
                }
            }
        }
    }

    Ok(())
}

/// Clicks rescan the mount table so the menu about to open is current.
fn handle_event(volumes: &VolumeMenu, event: TrayEvent) {
    match event {
        TrayEvent::Scroll { .. } => tracing::trace!(?event, "ignoring scroll"),
        _ => {
            tracing::debug!(?event, "tray clicked, rescanning mounts");
            if let Err(e) = volumes.refresh() {
                tracing::warn!(error = %e, "failed to rescan mounts");
            }
        }
    }
}
