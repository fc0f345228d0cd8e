//! DriveIcon configuration.
//!
//! Stored as TOML at `$XDG_CONFIG_HOME/driveicon/config.toml`
//! (`~/.config/driveicon/config.toml` when the variable is unset). A file
//! with defaults is written on first start.

use std::path::{Path, PathBuf};

use driveicon_model::Icon;
use driveicon_sni::{Category, TrayConfig};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identifier advertised in the item's `Id` property.
    #[serde(default = "default_id")]
    pub id: String,

    #[serde(default = "default_title")]
    pub title: String,

    /// Advertised in the item's `Category` property.
    #[serde(default = "default_category")]
    pub category: Category,

    /// Themed icon name for the tray icon.
    #[serde(default = "default_icon")]
    pub icon: String,

    /// Object path shared by the item and its menu.
    #[serde(default = "default_object_path")]
    pub object_path: String,

    /// Show the menu on primary click instead of reporting an activation.
    #[serde(default = "default_true")]
    pub item_is_menu: bool,

    /// Seconds between mount table rescans.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Command line for mounting; the device path is appended.
    #[serde(default = "default_mount_command")]
    pub mount_command: Vec<String>,

    #[serde(default = "default_unmount_command")]
    pub unmount_command: Vec<String>,

    #[serde(default = "default_eject_command")]
    pub eject_command: Vec<String>,

    /// Command line for opening; the mount point is appended.
    #[serde(default = "default_open_command")]
    pub open_command: Vec<String>,

    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeConfig>,
}

/// A volume shown in the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,

    /// Block device, e.g. `/dev/sdb1`.
    pub device: String,

    #[serde(default = "default_volume_icon")]
    pub icon: String,

    /// Where the volume is expected to be mounted, if the mount table lists
    /// it under a different source.
    #[serde(default)]
    pub mount_point: Option<String>,

    #[serde(default)]
    pub can_eject: bool,
}

fn default_id() -> String {
    "one.markle.DriveIcon".into()
}

fn default_title() -> String {
    "Drives".into()
}

fn default_category() -> Category {
    Category::Hardware
}

fn default_icon() -> String {
    "drive-removable-media".into()
}

fn default_volume_icon() -> String {
    "drive-harddisk".into()
}

fn default_object_path() -> String {
    "/SNIMenu".into()
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_mount_command() -> Vec<String> {
    vec!["udisksctl".into(), "mount".into(), "-b".into()]
}

fn default_unmount_command() -> Vec<String> {
    vec!["udisksctl".into(), "unmount".into(), "-b".into()]
}

fn default_eject_command() -> Vec<String> {
    vec!["udisksctl".into(), "power-off".into(), "-b".into()]
}

fn default_open_command() -> Vec<String> {
    vec!["xdg-open".into()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: default_id(),
            title: default_title(),
            category: default_category(),
            icon: default_icon(),
            object_path: default_object_path(),
            item_is_menu: default_true(),
            refresh_interval: default_refresh_interval(),
            mount_command: default_mount_command(),
            unmount_command: default_unmount_command(),
            eject_command: default_eject_command(),
            open_command: default_open_command(),
            volumes: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Tray icon settings derived from this configuration.
    pub fn tray_config(&self) -> TrayConfig {
        TrayConfig {
            category: self.category,
            id: self.id.clone(),
            title: self.title.clone(),
            icon: Some(Icon::themed(self.icon.clone())),
            item_is_menu: self.item_is_menu,
            object_path: self.object_path.clone(),
            ..TrayConfig::default()
        }
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = std::env::var_os("HOME").unwrap_or_else(|| "/tmp".into());
            PathBuf::from(home).join(".config")
        });
    base.join("driveicon").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.id, "one.markle.DriveIcon");
        assert_eq!(config.object_path, "/SNIMenu");
        assert!(config.item_is_menu);
        assert_eq!(config.refresh_interval, 5);
        assert_eq!(config.open_command, vec!["xdg-open".to_string()]);
        assert!(config.volumes.is_empty());
    }

    #[test]
    fn config_partial_toml() {
        let toml_str = r#"
            title = "Volumes"

            [[volume]]
            name = "Backup"
            device = "/dev/sdb1"
            can_eject = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.title, "Volumes");
        assert_eq!(config.category, Category::Hardware);
        assert_eq!(config.icon, "drive-removable-media");
        assert_eq!(config.mount_command[0], "udisksctl");

        assert_eq!(config.volumes.len(), 1);
        let volume = &config.volumes[0];
        assert_eq!(volume.name, "Backup");
        assert_eq!(volume.icon, "drive-harddisk");
        assert!(volume.mount_point.is_none());
        assert!(volume.can_eject);
    }

    #[test]
    fn category_uses_wire_names() {
        let config: Config = toml::from_str(r#"category = "SystemServices""#).unwrap();
        assert_eq!(config.category, Category::SystemServices);
        assert_eq!(config.tray_config().category, Category::SystemServices);

        let saved = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(saved.contains(r#"category = "Hardware""#));

        assert!(toml::from_str::<Config>(r#"category = "Games""#).is_err());
    }

    #[test]
    fn volume_requires_device() {
        let toml_str = r#"
            [[volume]]
            name = "Backup"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn config_path_ends_in_driveicon() {
        let path = config_path();
        assert!(path.ends_with("driveicon/config.toml"));
    }

    #[test]
    fn config_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("driveicon").join("config.toml");

        let config = Config {
            title: "SaveTest".into(),
            volumes: vec![VolumeConfig {
                name: "Stick".into(),
                device: "/dev/sdc1".into(),
                icon: "drive-removable-media".into(),
                mount_point: Some("/media/stick".into()),
                can_eject: true,
            }],
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn tray_config_follows_settings() {
        let config = Config {
            title: "Volumes".into(),
            item_is_menu: false,
            ..Config::default()
        };
        let tray = config.tray_config();
        assert_eq!(tray.title, "Volumes");
        assert_eq!(tray.category, Category::Hardware);
        assert_eq!(tray.icon, Some(Icon::themed("drive-removable-media")));
        assert!(!tray.item_is_menu);
    }
}
