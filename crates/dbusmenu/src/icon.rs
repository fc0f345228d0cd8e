//! Icon theme lookup used while projecting item icons.

use driveicon_model::{Icon, ThemedIcon, Variant};

use crate::ProjectorError;

/// Resolves a themed icon to the name exported in `icon-name`.
///
/// Returning `None` means the theme has no such icon; the item is then
/// exported without one.
pub trait IconLookup {
    fn lookup(&self, icon: &ThemedIcon) -> Option<String>;
}

/// Exports the preferred name without consulting a theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstName;

impl IconLookup for FirstName {
    fn lookup(&self, icon: &ThemedIcon) -> Option<String> {
        Some(icon.primary_name().to_string())
    }
}

impl<F> IconLookup for F
where
    F: Fn(&ThemedIcon) -> Option<String>,
{
    fn lookup(&self, icon: &ThemedIcon) -> Option<String> {
        self(icon)
    }
}

/// Decodes an `icon` attribute and resolves it to an exportable name.
pub(crate) fn resolve(
    lookup: &dyn IconLookup,
    value: &Variant,
) -> Result<Option<String>, ProjectorError> {
    match Icon::deserialize(value) {
        Some(Icon::Themed(themed)) => Ok(lookup.lookup(&themed)),
        Some(other) => Err(ProjectorError::UnsupportedIconKind(other.kind().to_string())),
        None => Err(ProjectorError::UnsupportedIconKind(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn themed_icons_resolve() {
        let names = ["drive-harddisk-usb", "drive-harddisk"];
        let icon = Icon::Themed(ThemedIcon::from_names(names).unwrap());
        assert_eq!(
            resolve(&FirstName, &icon.serialize()),
            Ok(Some("drive-harddisk-usb".to_string()))
        );
    }

    #[test]
    fn theme_miss_is_not_an_error() {
        let missing = |_: &ThemedIcon| -> Option<String> { None };
        assert_eq!(resolve(&missing, &Icon::themed("nope").serialize()), Ok(None));
    }

    #[test]
    fn file_icons_are_unsupported() {
        let icon = Icon::File(PathBuf::from("/tmp/disk.png"));
        assert_eq!(
            resolve(&FirstName, &icon.serialize()),
            Err(ProjectorError::UnsupportedIconKind("file".into()))
        );
    }

    #[test]
    fn garbage_is_unsupported() {
        assert!(matches!(
            resolve(&FirstName, &Variant::from(12)),
            Err(ProjectorError::UnsupportedIconKind(_))
        ));
    }
}
