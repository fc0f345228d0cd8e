//! Protocol-level menu nodes and their dbusmenu properties.

use std::fmt;

use driveicon_model::Variant;

pub const PROP_TYPE: &str = "type";
pub const PROP_LABEL: &str = "label";
pub const PROP_ENABLED: &str = "enabled";
pub const PROP_VISIBLE: &str = "visible";
pub const PROP_ICON_NAME: &str = "icon-name";
pub const PROP_ICON_DATA: &str = "icon-data";
pub const PROP_SHORTCUT: &str = "shortcut";
pub const PROP_TOGGLE_TYPE: &str = "toggle-type";
pub const PROP_TOGGLE_STATE: &str = "toggle-state";
pub const PROP_CHILDREN_DISPLAY: &str = "children-display";

/// Every property name a node answers for.
pub const ALL_PROPERTIES: [&str; 10] = [
    PROP_TYPE,
    PROP_LABEL,
    PROP_ENABLED,
    PROP_VISIBLE,
    PROP_ICON_NAME,
    PROP_ICON_DATA,
    PROP_SHORTCUT,
    PROP_TOGGLE_TYPE,
    PROP_TOGGLE_STATE,
    PROP_CHILDREN_DISPLAY,
];

/// Identifier of a node on the wire. The root is always `0`; other ids are
/// never reused, even across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    Standard,
    Separator,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Standard => "standard",
            NodeKind::Separator => "separator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleType {
    #[default]
    None,
    Checkmark,
    Radio,
}

impl ToggleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ToggleType::None => "",
            ToggleType::Checkmark => "checkmark",
            ToggleType::Radio => "radio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleState {
    Off,
    On,
    #[default]
    Indeterminate,
}

impl ToggleState {
    /// `on` iff the expected value is present and equals the current state.
    pub fn matching(expected: Option<&Variant>, current: Option<&Variant>) -> Self {
        match (expected, current) {
            (Some(e), Some(c)) if e == c => ToggleState::On,
            _ => ToggleState::Off,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            ToggleState::Off => 0,
            ToggleState::On => 1,
            ToggleState::Indeterminate => -1,
        }
    }
}

/// A property value as carried in dbusmenu property maps.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Bool(bool),
    Int(i32),
    Bytes(Vec<u8>),
    Shortcut(Vec<Vec<String>>),
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v)
    }
}

/// Named property/value pairs of one node.
pub type PropertyMap = Vec<(String, PropValue)>;

/// Display properties of one node.
///
/// Only values that differ from the protocol defaults are exported; see
/// [`NodeProperties::exported`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProperties {
    pub kind: NodeKind,
    pub label: Option<String>,
    pub enabled: bool,
    pub visible: bool,
    pub icon_name: Option<String>,
    pub toggle_type: ToggleType,
    pub toggle_state: ToggleState,
    pub submenu: bool,
}

impl Default for NodeProperties {
    fn default() -> Self {
        Self {
            kind: NodeKind::Standard,
            label: None,
            enabled: true,
            visible: true,
            icon_name: None,
            toggle_type: ToggleType::None,
            toggle_state: ToggleState::Indeterminate,
            submenu: false,
        }
    }
}

impl NodeProperties {
    pub fn separator() -> Self {
        Self {
            kind: NodeKind::Separator,
            ..Self::default()
        }
    }

    /// Value of a property, defaults included. `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<PropValue> {
        let value = match name {
            PROP_TYPE => self.kind.as_str().into(),
            PROP_LABEL => self.label.as_deref().unwrap_or_default().into(),
            PROP_ENABLED => self.enabled.into(),
            PROP_VISIBLE => self.visible.into(),
            PROP_ICON_NAME => self.icon_name.as_deref().unwrap_or_default().into(),
            PROP_ICON_DATA => PropValue::Bytes(Vec::new()),
            PROP_SHORTCUT => PropValue::Shortcut(Vec::new()),
            PROP_TOGGLE_TYPE => self.toggle_type.as_str().into(),
            PROP_TOGGLE_STATE => self.toggle_state.as_i32().into(),
            PROP_CHILDREN_DISPLAY => (if self.submenu { "submenu" } else { "" }).into(),
            _ => return None,
        };
        Some(value)
    }

    /// Non-default properties, optionally restricted to `filter` (an empty
    /// filter means all).
    pub fn exported(&self, filter: &[String]) -> PropertyMap {
        let mut out = Vec::new();
        let mut push = |name: &str, value: PropValue| {
            if filter.is_empty() || filter.iter().any(|f| f == name) {
                out.push((name.to_string(), value));
            }
        };

        if self.kind != NodeKind::Standard {
            push(PROP_TYPE, self.kind.as_str().into());
        }
        if let Some(label) = &self.label {
            push(PROP_LABEL, label.as_str().into());
        }
        if !self.enabled {
            push(PROP_ENABLED, false.into());
        }
        if !self.visible {
            push(PROP_VISIBLE, false.into());
        }
        if let Some(icon) = &self.icon_name {
            push(PROP_ICON_NAME, icon.as_str().into());
        }
        if self.toggle_type != ToggleType::None {
            push(PROP_TOGGLE_TYPE, self.toggle_type.as_str().into());
        }
        if self.toggle_state != ToggleState::Indeterminate {
            push(PROP_TOGGLE_STATE, self.toggle_state.as_i32().into());
        }
        if self.submenu {
            push(PROP_CHILDREN_DISPLAY, "submenu".into());
        }
        out
    }
}

/// Action a node activates, with its optional target.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBinding {
    pub action: String,
    pub target: Option<Variant>,
}

/// One node of the protocol menu tree.
#[derive(Debug, Clone)]
pub struct ProtocolNode {
    pub id: NodeId,
    pub properties: NodeProperties,
    pub children: Vec<NodeId>,
    pub binding: Option<ActionBinding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_node_exports_nothing() {
        assert!(NodeProperties::default().exported(&[]).is_empty());
    }

    #[test]
    fn separator_exports_type() {
        assert_eq!(
            NodeProperties::separator().exported(&[]),
            vec![(PROP_TYPE.to_string(), PropValue::from("separator"))]
        );
    }

    #[test]
    fn exported_respects_filter() {
        let props = NodeProperties {
            label: Some("Eject".into()),
            enabled: false,
            icon_name: Some("media-eject".into()),
            ..NodeProperties::default()
        };
        let all = props.exported(&[]);
        assert_eq!(all.len(), 3);

        let only_label = props.exported(&["label".to_string()]);
        assert_eq!(only_label, vec![("label".to_string(), PropValue::from("Eject"))]);
    }

    #[test]
    fn get_includes_defaults() {
        let props = NodeProperties::default();
        assert_eq!(props.get(PROP_ENABLED), Some(PropValue::Bool(true)));
        assert_eq!(props.get(PROP_TOGGLE_STATE), Some(PropValue::Int(-1)));
        assert_eq!(props.get(PROP_CHILDREN_DISPLAY), Some(PropValue::from("")));
        assert_eq!(props.get("accessible-desc"), None);
        for name in ALL_PROPERTIES {
            assert!(props.get(name).is_some(), "{name}");
        }
    }

    #[test]
    fn toggle_state_matching() {
        let a = Variant::from("a");
        let b = Variant::from("b");
        assert_eq!(ToggleState::matching(Some(&a), Some(&a)), ToggleState::On);
        assert_eq!(ToggleState::matching(Some(&a), Some(&b)), ToggleState::Off);
        assert_eq!(ToggleState::matching(None, Some(&b)), ToggleState::Off);
        assert_eq!(ToggleState::matching(Some(&a), None), ToggleState::Off);
    }
}
