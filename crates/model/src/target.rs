//! Surrogate identifiers for entities bound into menu actions.
//!
//! Menu items address the entity they act on through a string target. The
//! registry hands out a random UUID when an entity enters the menu and
//! resolves it back on activation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::ModelError;
use crate::variant::Variant;

/// Opaque identifier of an entity in a [`TargetRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(Uuid);

impl TargetId {
    /// The action target value that addresses this entity.
    pub fn to_variant(self) -> Variant {
        Variant::Str(self.to_string())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TargetId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(TargetId)
            .map_err(|_| ModelError::UnknownTarget(s.to_string()))
    }
}

/// Maps surrogate ids to the entities currently present in a menu.
#[derive(Debug)]
pub struct TargetRegistry<T> {
    entries: HashMap<TargetId, T>,
}

impl<T> Default for TargetRegistry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> TargetRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity and returns its fresh id.
    pub fn insert(&mut self, value: T) -> TargetId {
        let id = TargetId(Uuid::new_v4());
        self.entries.insert(id, value);
        id
    }

    pub fn get(&self, id: TargetId) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Resolves an action parameter (a string id) to its entity.
    pub fn resolve(&self, parameter: Option<&Variant>) -> Result<&T, ModelError> {
        let raw = parameter
            .and_then(Variant::as_str)
            .ok_or_else(|| ModelError::UnknownTarget(format!("{parameter:?}")))?;
        let id: TargetId = raw.parse()?;
        self.get(id)
            .ok_or_else(|| ModelError::UnknownTarget(raw.to_string()))
    }

    /// Forgets all entities; previously issued ids stop resolving.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_resolve_while_registered() {
        let mut reg = TargetRegistry::new();
        let a = reg.insert("sda1");
        let b = reg.insert("sdb1");
        assert_ne!(a, b);

        assert_eq!(reg.resolve(Some(&a.to_variant())), Ok(&"sda1"));
        assert_eq!(reg.get(b), Some(&"sdb1"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn cleared_ids_are_unknown() {
        let mut reg = TargetRegistry::new();
        let a = reg.insert(1);
        reg.clear();
        assert!(reg.is_empty());
        assert_eq!(
            reg.resolve(Some(&a.to_variant())),
            Err(ModelError::UnknownTarget(a.to_string()))
        );
    }

    #[test]
    fn malformed_parameters() {
        let reg: TargetRegistry<u8> = TargetRegistry::new();
        assert!(matches!(
            reg.resolve(Some(&Variant::from("not-a-uuid"))),
            Err(ModelError::UnknownTarget(_))
        ));
        assert!(reg.resolve(Some(&Variant::from(7))).is_err());
        assert!(reg.resolve(None).is_err());
    }

    #[test]
    fn display_parses_back() {
        let mut reg = TargetRegistry::new();
        let id = reg.insert(());
        assert_eq!(id.to_string().parse::<TargetId>(), Ok(id));
    }
}
