//! Merging per-call arguments over an operation's fixed defaults.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Argument types that can be layered over a set of defaults.
///
/// Values supplied by the call win; anything the call leaves unset falls
/// back to the default.
pub trait MergeDefaults: Sized {
    fn merge_over(self, defaults: &Self) -> Self;
}

impl MergeDefaults for () {
    fn merge_over(self, _defaults: &Self) -> Self {}
}

impl<T: Clone> MergeDefaults for Option<T> {
    fn merge_over(self, defaults: &Self) -> Self {
        self.or_else(|| defaults.clone())
    }
}

impl<K: Ord + Clone, V: Clone> MergeDefaults for BTreeMap<K, V> {
    fn merge_over(self, defaults: &Self) -> Self {
        let mut merged = defaults.clone();
        merged.extend(self);
        merged
    }
}

impl<K: Eq + Hash + Clone, V: Clone> MergeDefaults for HashMap<K, V> {
    fn merge_over(self, defaults: &Self) -> Self {
        let mut merged = defaults.clone();
        merged.extend(self);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_values_win() {
        let defaults = BTreeMap::from([("io_priority", 0), ("flags", 0)]);
        let call = BTreeMap::from([("flags", 4)]);
        let merged = call.merge_over(&defaults);
        assert_eq!(merged, BTreeMap::from([("io_priority", 0), ("flags", 4)]));
    }

    #[test]
    fn defaults_are_untouched() {
        let defaults = HashMap::from([("a", 1)]);
        let _ = HashMap::from([("a", 2)]).merge_over(&defaults);
        assert_eq!(defaults["a"], 1);
    }

    #[test]
    fn option_falls_back() {
        assert_eq!(None::<i32>.merge_over(&Some(3)), Some(3));
        assert_eq!(Some(1).merge_over(&Some(3)), Some(1));
        assert_eq!(None::<u8>.merge_over(&None), None);
    }
}
