//! The volume menu: a submenu per configured volume, with Open, Mount,
//! Unmount and Eject items bound to string-parameter actions.
//!
//! Items address their volume through a [`TargetId`] issued on every
//! rebuild, so ids from a previous menu stop resolving.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use driveicon_model::{
    Icon, Menu, MenuItem, ModelError, SimpleAction, SimpleActionGroup, TargetId,
    TargetRegistry, ThemedIcon, Variant, VariantType,
};
use tracing::{debug, info, warn};

use crate::command::{CommandArgs, CommandRunner};
use crate::config::{Config, VolumeConfig};
use crate::mounts::MountTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Open,
    Mount,
    Unmount,
    Eject,
}

impl Operation {
    const ALL: [Operation; 4] = [
        Operation::Open,
        Operation::Mount,
        Operation::Unmount,
        Operation::Eject,
    ];

    fn action_name(self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Mount => "mount",
            Operation::Unmount => "unmount",
            Operation::Eject => "eject",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Operation::Open => "Open",
            Operation::Mount => "Mount",
            Operation::Unmount => "Unmount",
            Operation::Eject => "Eject",
        }
    }

    fn icon_names(self) -> &'static [&'static str] {
        match self {
            Operation::Open => &["document-open-folder", "document-open"],
            Operation::Mount => &["media-mount"],
            Operation::Unmount | Operation::Eject => &["media-eject"],
        }
    }

    fn item(self, target: TargetId) -> MenuItem {
        let detailed = format!("{}::{target}", self.action_name());
        let mut item = MenuItem::new(Some(self.label()), Some(&detailed));
        if let Some(icon) = ThemedIcon::from_names(self.icon_names().iter().copied()) {
            item.set_icon(Some(&Icon::Themed(icon)));
        }
        item
    }
}

/// A volume as of the last mount table scan.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    device: String,
    mount_point: Option<PathBuf>,
}

struct Commands {
    open: Vec<String>,
    mount: Vec<String>,
    unmount: Vec<String>,
    eject: Vec<String>,
}

struct Inner {
    menu: Rc<Menu>,
    actions: Rc<SimpleActionGroup>,
    volumes: Vec<VolumeConfig>,
    commands: Commands,
    runner: CommandRunner,
    targets: RefCell<TargetRegistry<Entry>>,
    mounts: RefCell<Option<MountTable>>,
}

/// Owns the root menu and the actions its items activate.
pub struct VolumeMenu {
    inner: Rc<Inner>,
}

impl VolumeMenu {
    /// Creates the actions. The menu stays empty until the first
    /// [`VolumeMenu::refresh`] or [`VolumeMenu::apply_mounts`].
    pub fn new(config: &Config) -> Self {
        let inner = Rc::new(Inner {
            menu: Menu::new(),
            actions: SimpleActionGroup::new(),
            volumes: config.volumes.clone(),
            commands: Commands {
                open: config.open_command.clone(),
                mount: config.mount_command.clone(),
                unmount: config.unmount_command.clone(),
                eject: config.eject_command.clone(),
            },
            runner: CommandRunner::new(),
            targets: RefCell::new(TargetRegistry::new()),
            mounts: RefCell::new(None),
        });

        for op in Operation::ALL {
            let action = SimpleAction::new(op.action_name(), Some(VariantType::Str));
            let weak = Rc::downgrade(&inner);
            action.connect_activate(move |_, parameter| match weak.upgrade() {
                Some(inner) => inner.start(op, parameter),
                None => Ok(()),
            });
            inner.actions.add_action(action);
        }

        Self { inner }
    }

    pub fn menu(&self) -> Rc<Menu> {
        Rc::clone(&self.inner.menu)
    }

    pub fn actions(&self) -> Rc<SimpleActionGroup> {
        Rc::clone(&self.inner.actions)
    }

    /// Rescans the mount table. Returns whether the menu was rebuilt.
    pub fn refresh(&self) -> io::Result<bool> {
        self.inner.refresh()
    }

    /// Rebuilds the menu if `table` differs from the last scan.
    pub fn apply_mounts(&self, table: MountTable) -> bool {
        self.inner.apply_mounts(table)
    }
}

impl Inner {
    fn refresh(&self) -> io::Result<bool> {
        Ok(self.apply_mounts(MountTable::read()?))
    }

    fn apply_mounts(&self, table: MountTable) -> bool {
        if self.mounts.borrow().as_ref() == Some(&table) {
            return false;
        }
        *self.mounts.borrow_mut() = Some(table);
        self.rebuild();
        true
    }

    fn rebuild(&self) {
        let items: Vec<MenuItem> = {
            let mounts = self.mounts.borrow();
            let mut targets = self.targets.borrow_mut();
            targets.clear();

            self.volumes
                .iter()
                .map(|volume| {
                    let expected = volume.mount_point.as_deref().map(Path::new);
                    let mount_point = mounts
                        .as_ref()
                        .and_then(|table| table.mount_point(&volume.device, expected));
                    let mounted = mount_point.is_some();
                    let target = targets.insert(Entry {
                        name: volume.name.clone(),
                        device: volume.device.clone(),
                        mount_point,
                    });
                    volume_item(volume, target, mounted)
                })
                .collect()
        };

        debug!(volumes = items.len(), "rebuilding volume menu");
        self.menu.splice(0, usize::MAX, items);
    }

    /// Runs the command behind `op` for the volume named by `parameter`.
    fn start(self: Rc<Self>, op: Operation, parameter: Option<&Variant>) -> Result<(), ModelError> {
        let (entry, args) = {
            let targets = self.targets.borrow();
            let entry = targets.resolve(parameter)?.clone();
            let args = match op {
                Operation::Open => match &entry.mount_point {
                    Some(path) => CommandArgs::new(&self.commands.open, &path.to_string_lossy()),
                    None => {
                        warn!(volume = %entry.name, "cannot open a volume that is not mounted");
                        return Ok(());
                    }
                },
                Operation::Mount => CommandArgs::new(&self.commands.mount, &entry.device),
                Operation::Unmount => CommandArgs::new(&self.commands.unmount, &entry.device),
                Operation::Eject => CommandArgs::new(&self.commands.eject, &entry.device),
            };
            (entry, args)
        };

        let action = op.action_name();
        info!(volume = %entry.name, action, "starting volume command");
        let pending = self.runner.run(args);
        let weak: Weak<Inner> = Rc::downgrade(&self);
        tokio::task::spawn_local(async move {
            match pending.await {
                Ok(output) => info!(volume = %entry.name, action, %output, "volume command finished"),
                Err(e) => warn!(volume = %entry.name, action, error = %e, "volume command failed"),
            }
            if let Some(inner) = weak.upgrade() {
                if let Err(e) = inner.refresh() {
                    warn!(error = %e, "failed to rescan mounts");
                }
            }
        });
        Ok(())
    }
}

fn volume_item(volume: &VolumeConfig, target: TargetId, mounted: bool) -> MenuItem {
    let submenu = Menu::new();
    if volume.can_eject {
        submenu.append_item(Operation::Eject.item(target));
    }

    let section = Menu::new();
    if mounted {
        section.append_item(Operation::Open.item(target));
        section.append_item(Operation::Unmount.item(target));
    } else {
        section.append_item(Operation::Mount.item(target));
    }
    submenu.append_section(Some(&volume.name), section);

    let mut item = MenuItem::submenu(Some(&volume.name), submenu);
    item.set_icon(Some(&Icon::themed(volume.icon.clone())));
    item
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use driveicon_dbusmenu::{
        FirstName, LayoutNode, NodeId, PROP_ENABLED, PROP_LABEL, PROP_TYPE, PropValue, Projector,
    };
    use driveicon_model::{ATTRIBUTE_ACTION, ATTRIBUTE_TARGET, ActionGroup, LinkKind, MenuModel};
    use tokio::task::LocalSet;

    use super::*;

    fn volume(name: &str, device: &str, can_eject: bool) -> VolumeConfig {
        VolumeConfig {
            name: name.into(),
            device: device.into(),
            icon: "drive-harddisk".into(),
            mount_point: None,
            can_eject,
        }
    }

    fn config() -> Config {
        Config {
            volumes: vec![
                volume("Stick", "/dev/sdb1", true),
                volume("Backup", "/dev/sdc1", false),
            ],
            ..Config::default()
        }
    }

    fn stick_mounted() -> MountTable {
        MountTable::parse("/dev/sdb1 /media/stick vfat rw 0 0\n")
    }

    fn submenu(menu: &Menu, index: usize) -> Rc<dyn MenuModel> {
        menu.item_link(index, LinkKind::Submenu).unwrap()
    }

    fn section(model: &Rc<dyn MenuModel>, index: usize) -> Rc<dyn MenuModel> {
        model.item_link(index, LinkKind::Section).unwrap()
    }

    fn actions_of(model: &Rc<dyn MenuModel>) -> Vec<String> {
        (0..model.n_items())
            .filter_map(|i| model.item_attribute(i, ATTRIBUTE_ACTION))
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    fn label(node: &LayoutNode) -> Option<&str> {
        node.properties.iter().find_map(|(name, value)| match value {
            PropValue::Str(s) if name == PROP_LABEL => Some(s.as_str()),
            _ => None,
        })
    }

    fn prop<'a>(node: &'a LayoutNode, wanted: &str) -> Option<&'a PropValue> {
        node.properties
            .iter()
            .find(|(name, _)| name == wanted)
            .map(|(_, value)| value)
    }

    #[test]
    fn menu_follows_mount_state() {
        let volumes = VolumeMenu::new(&config());
        let menu = volumes.menu();
        assert_eq!(menu.n_items(), 0);

        assert!(volumes.apply_mounts(stick_mounted()));
        assert_eq!(menu.n_items(), 2);
        assert_eq!(menu.item_attributes(0).label(), Some("Stick"));
        assert_eq!(menu.item_attributes(1).label(), Some("Backup"));

        let stick = submenu(&menu, 0);
        assert_eq!(stick.item_attribute(0, ATTRIBUTE_ACTION), Some(Variant::from("eject")));
        assert_eq!(actions_of(&section(&stick, 1)), ["open", "unmount"]);

        let backup = submenu(&menu, 1);
        assert_eq!(backup.n_items(), 1);
        assert_eq!(actions_of(&section(&backup, 0)), ["mount"]);
    }

    #[test]
    fn unchanged_mount_table_keeps_menu() {
        let volumes = VolumeMenu::new(&config());
        assert!(volumes.apply_mounts(stick_mounted()));
        assert!(!volumes.apply_mounts(stick_mounted()));
        assert!(volumes.apply_mounts(MountTable::default()));

        let stick = submenu(&volumes.menu(), 0);
        assert_eq!(actions_of(&section(&stick, 1)), ["mount"]);
    }

    #[test]
    fn expected_mount_point_counts_as_mounted() {
        let mut cfg = config();
        cfg.volumes[1].mount_point = Some("/media/backup".into());
        let volumes = VolumeMenu::new(&cfg);
        volumes.apply_mounts(MountTable::parse("/dev/mapper/x /media/backup ext4 rw 0 0\n"));

        let backup = submenu(&volumes.menu(), 1);
        assert_eq!(actions_of(&section(&backup, 0)), ["open", "unmount"]);
    }

    #[test]
    fn targets_from_an_old_menu_stop_resolving() {
        let volumes = VolumeMenu::new(&config());
        volumes.apply_mounts(MountTable::default());
        let old = section(&submenu(&volumes.menu(), 1), 0)
            .item_attribute(0, ATTRIBUTE_TARGET)
            .unwrap();

        volumes.apply_mounts(stick_mounted());
        let err = volumes.actions().activate_action("mount", Some(old)).unwrap_err();
        assert!(matches!(err, ModelError::UnknownTarget(_)));
    }

    #[test]
    fn open_without_mount_point_does_nothing() {
        let volumes = VolumeMenu::new(&config());
        volumes.apply_mounts(MountTable::default());
        let target = section(&submenu(&volumes.menu(), 1), 0)
            .item_attribute(0, ATTRIBUTE_TARGET)
            .unwrap();

        // No LocalSet: reaching spawn_local would panic.
        assert_eq!(volumes.actions().activate_action("open", Some(target)), Ok(()));
    }

    #[test]
    fn projection_of_volume_menu() {
        let volumes = VolumeMenu::new(&config());
        volumes.apply_mounts(stick_mounted());
        let projector = Projector::new(volumes.menu(), volumes.actions(), FirstName).unwrap();

        let root = projector.project().unwrap();
        assert_eq!(root.children.len(), 2);

        let stick = &root.children[0];
        assert_eq!(label(stick), Some("Stick"));
        let rows: Vec<_> = stick.children.iter().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(label(rows[0]), Some("Eject"));
        assert_eq!(prop(rows[1], PROP_TYPE), Some(&PropValue::Str("separator".into())));
        assert_eq!(label(rows[2]), Some("Stick"));
        assert_eq!(prop(rows[2], PROP_ENABLED), Some(&PropValue::Bool(false)));
        assert_eq!(label(rows[3]), Some("Open"));
        assert_eq!(label(rows[4]), Some("Unmount"));

        let backup = &root.children[1];
        assert_eq!(backup.children.len(), 2);
        assert_eq!(label(&backup.children[1]), Some("Mount"));

        // A rescan replaces the layout in a single rebuild.
        let revision = projector.revision();
        volumes.apply_mounts(MountTable::default());
        assert_eq!(projector.revision(), revision + 1);
        assert_ne!(projector.layout(NodeId::ROOT, -1, &[]).unwrap().1.children[0].id, stick.id);
    }

    #[tokio::test]
    async fn clicking_mount_runs_the_command() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("mounted");
        let mut cfg = config();
        cfg.mount_command = vec![
            "sh".into(),
            "-c".into(),
            format!("printf %s \"$0\" > '{}'", out.display()),
        ];
        let volumes = VolumeMenu::new(&cfg);
        volumes.apply_mounts(MountTable::default());
        let projector = Projector::new(volumes.menu(), volumes.actions(), FirstName).unwrap();

        let root = projector.project().unwrap();
        let mount = &root.children[1].children[1];
        assert_eq!(label(mount), Some("Mount"));

        LocalSet::new()
            .run_until(async {
                projector.activate(mount.id, 0).unwrap();
                for _ in 0..200 {
                    if std::fs::read_to_string(&out).is_ok_and(|s| !s.is_empty()) {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await;

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "/dev/sdc1");
    }
}
