//! Icon references attached to menu items and to the tray icon itself.
//!
//! Menu attributes carry icons in serialized form (a `(kind, payload)`
//! tuple); [`Icon::serialize`] and [`Icon::deserialize`] convert between the
//! two. Only [`Icon::Themed`] can be exported by name.

use std::path::PathBuf;

use crate::variant::Variant;

/// An icon looked up by name in the desktop icon theme.
///
/// Holds at least one name; later names are fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemedIcon {
    names: Vec<String>,
}

impl ThemedIcon {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    /// Builds a themed icon from a fallback list. Returns `None` if empty.
    pub fn from_names<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The first (preferred) name.
    pub fn primary_name(&self) -> &str {
        &self.names[0]
    }
}

/// An icon reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Themed(ThemedIcon),
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl Icon {
    /// Shorthand for a single-name themed icon.
    pub fn themed(name: impl Into<String>) -> Self {
        Icon::Themed(ThemedIcon::new(name))
    }

    pub fn as_themed(&self) -> Option<&ThemedIcon> {
        match self {
            Icon::Themed(t) => Some(t),
            _ => None,
        }
    }

    /// Short name of the representation, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Icon::Themed(_) => "themed",
            Icon::File(_) => "file",
            Icon::Bytes(_) => "bytes",
        }
    }

    /// Serializes into the `(kind, payload)` form stored in menu attributes.
    pub fn serialize(&self) -> Variant {
        let payload = match self {
            Icon::Themed(t) => Variant::Array(t.names.iter().map(|n| n.as_str().into()).collect()),
            Icon::File(path) => Variant::Str(path.to_string_lossy().into_owned()),
            Icon::Bytes(bytes) => {
                Variant::Array(bytes.iter().map(|b| Variant::UInt32(u32::from(*b))).collect())
            }
        };
        Variant::Tuple(vec![Variant::from(self.kind()), payload])
    }

    /// Parses a serialized icon.
    ///
    /// A bare string is accepted too: absolute paths become [`Icon::File`],
    /// anything else a themed icon name.
    pub fn deserialize(value: &Variant) -> Option<Icon> {
        match value {
            Variant::Str(s) if s.starts_with('/') => Some(Icon::File(PathBuf::from(s))),
            Variant::Str(s) => Some(Icon::themed(s.as_str())),
            Variant::Tuple(fields) if fields.len() == 2 => {
                let kind = fields[0].as_str()?;
                let payload = &fields[1];
                match kind {
                    "themed" => {
                        let names = payload
                            .as_slice()?
                            .iter()
                            .map(|n| n.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()?;
                        ThemedIcon::from_names(names).map(Icon::Themed)
                    }
                    "file" => payload.as_str().map(|p| Icon::File(PathBuf::from(p))),
                    "bytes" => payload
                        .as_slice()?
                        .iter()
                        .map(|b| match b {
                            Variant::UInt32(n) => u8::try_from(*n).ok(),
                            _ => None,
                        })
                        .collect::<Option<Vec<u8>>>()
                        .map(Icon::Bytes),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn themed_requires_a_name() {
        assert!(ThemedIcon::from_names(Vec::<String>::new()).is_none());
        let icon = ThemedIcon::from_names(["document-open-folder", "document-open"]).unwrap();
        assert_eq!(icon.primary_name(), "document-open-folder");
        assert_eq!(icon.names().len(), 2);
    }

    #[test]
    fn serialized_forms_parse_back() {
        for icon in [
            Icon::themed("drive-removable-media"),
            Icon::File(PathBuf::from("/usr/share/icons/disk.png")),
            Icon::Bytes(vec![0, 1, 255]),
        ] {
            assert_eq!(Icon::deserialize(&icon.serialize()), Some(icon));
        }
    }

    #[test]
    fn bare_strings() {
        assert_eq!(
            Icon::deserialize(&Variant::from("media-eject")),
            Some(Icon::themed("media-eject"))
        );
        assert!(matches!(
            Icon::deserialize(&Variant::from("/tmp/x.png")),
            Some(Icon::File(_))
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let v = Variant::Tuple(vec![Variant::from("emblem"), Variant::from("x")]);
        assert_eq!(Icon::deserialize(&v), None);
        assert_eq!(Icon::deserialize(&Variant::from(3)), None);
    }
}
