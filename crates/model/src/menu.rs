//! The abstract menu model.
//!
//! A [`MenuModel`] is an ordered list of positions. Each position carries a
//! [`MenuAttributes`] set and at most one [`MenuLink`] to a nested model,
//! either a section (rendered inline) or a submenu.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::icon::Icon;
use crate::signal::{Handlers, Subscription};
use crate::variant::Variant;

pub const ATTRIBUTE_LABEL: &str = "label";
pub const ATTRIBUTE_ICON: &str = "icon";
pub const ATTRIBUTE_ACTION: &str = "action";
pub const ATTRIBUTE_TARGET: &str = "target";

static NEXT_MENU_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a menu model instance.
///
/// Observers key their subscriptions on this rather than on the address of
/// the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(u64);

impl MenuId {
    /// Allocates a fresh id. Every [`MenuModel`] implementation should call
    /// this once at construction.
    pub fn next() -> Self {
        MenuId(NEXT_MENU_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "menu#{}", self.0)
    }
}

/// Kind of link a position may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Section,
    Submenu,
}

/// Link from a position to a nested model.
#[derive(Clone)]
pub enum MenuLink {
    Section(Rc<dyn MenuModel>),
    Submenu(Rc<dyn MenuModel>),
}

impl MenuLink {
    pub fn kind(&self) -> LinkKind {
        match self {
            MenuLink::Section(_) => LinkKind::Section,
            MenuLink::Submenu(_) => LinkKind::Submenu,
        }
    }

    pub fn model(&self) -> &Rc<dyn MenuModel> {
        match self {
            MenuLink::Section(m) | MenuLink::Submenu(m) => m,
        }
    }
}

impl fmt::Debug for MenuLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.model().id())
    }
}

/// Structural change notification: `removed` positions starting at
/// `position` were replaced by `added` new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemsChanged {
    pub position: usize,
    pub removed: usize,
    pub added: usize,
}

/// Read side of a menu model, as consumed by the projector.
pub trait MenuModel {
    fn id(&self) -> MenuId;

    fn n_items(&self) -> usize;

    /// Snapshot of the attributes at `index` (empty when out of range).
    fn item_attributes(&self, index: usize) -> MenuAttributes;

    fn item_attribute(&self, index: usize, name: &str) -> Option<Variant> {
        self.item_attributes(index).get(name).cloned()
    }

    fn item_link(&self, index: usize, kind: LinkKind) -> Option<Rc<dyn MenuModel>>;

    /// Connects a structural-change handler.
    fn connect_items_changed(&self, handler: Box<dyn Fn(&ItemsChanged)>) -> Subscription;
}

/// Ordered attribute set of one menu position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuAttributes(Vec<(String, Variant)>);

impl MenuAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set(&mut self, name: &str, value: Variant) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Variant> {
        let pos = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn label(&self) -> Option<&str> {
        self.get(ATTRIBUTE_LABEL).and_then(Variant::as_str)
    }

    pub fn action(&self) -> Option<&str> {
        self.get(ATTRIBUTE_ACTION).and_then(Variant::as_str)
    }

    pub fn target(&self) -> Option<&Variant> {
        self.get(ATTRIBUTE_TARGET)
    }
}

/// One position under construction, appended to a [`Menu`].
#[derive(Debug, Clone, Default)]
pub struct MenuItem {
    attributes: MenuAttributes,
    link: Option<MenuLink>,
}

impl MenuItem {
    /// Creates an item with an optional label and detailed action
    /// (see [`MenuItem::set_detailed_action`]).
    pub fn new(label: Option<&str>, detailed_action: Option<&str>) -> Self {
        let mut item = Self::default();
        item.set_label(label);
        if let Some(action) = detailed_action {
            item.set_detailed_action(action);
        }
        item
    }

    pub fn section(label: Option<&str>, section: Rc<dyn MenuModel>) -> Self {
        let mut item = Self::new(label, None);
        item.set_section(Some(section));
        item
    }

    pub fn submenu(label: Option<&str>, submenu: Rc<dyn MenuModel>) -> Self {
        let mut item = Self::new(label, None);
        item.set_submenu(Some(submenu));
        item
    }

    pub fn set_attribute(&mut self, name: &str, value: Option<Variant>) {
        match value {
            Some(v) => self.attributes.set(name, v),
            None => {
                self.attributes.remove(name);
            }
        }
    }

    pub fn set_label(&mut self, label: Option<&str>) {
        self.set_attribute(ATTRIBUTE_LABEL, label.map(Variant::from));
    }

    pub fn set_icon(&mut self, icon: Option<&Icon>) {
        self.set_attribute(ATTRIBUTE_ICON, icon.map(Icon::serialize));
    }

    pub fn set_action_and_target(&mut self, action: Option<&str>, target: Option<Variant>) {
        self.set_attribute(ATTRIBUTE_ACTION, action.map(Variant::from));
        self.set_attribute(ATTRIBUTE_TARGET, target);
    }

    /// Sets action and target from `name` or `name::string-target`.
    pub fn set_detailed_action(&mut self, detailed: &str) {
        match detailed.split_once("::") {
            Some((name, target)) => {
                self.set_action_and_target(Some(name), Some(Variant::from(target)))
            }
            None => self.set_action_and_target(Some(detailed), None),
        }
    }

    /// Sets or clears the submenu link. Replaces any section link.
    pub fn set_submenu(&mut self, submenu: Option<Rc<dyn MenuModel>>) {
        self.link = submenu.map(MenuLink::Submenu);
    }

    /// Sets or clears the section link. Replaces any submenu link.
    pub fn set_section(&mut self, section: Option<Rc<dyn MenuModel>>) {
        self.link = section.map(MenuLink::Section);
    }

    pub fn attributes(&self) -> &MenuAttributes {
        &self.attributes
    }

    pub fn link(&self) -> Option<&MenuLink> {
        self.link.as_ref()
    }
}

/// Mutable in-memory menu model.
pub struct Menu {
    id: MenuId,
    items: RefCell<Vec<MenuItem>>,
    items_changed: Rc<Handlers<ItemsChanged>>,
}

impl Menu {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: MenuId::next(),
            items: RefCell::new(Vec::new()),
            items_changed: Handlers::new(),
        })
    }

    pub fn append_item(&self, item: MenuItem) {
        let position = self.items.borrow().len();
        self.insert_item(position, item);
    }

    /// Inserts at `position`, clamped to the end of the menu.
    pub fn insert_item(&self, position: usize, item: MenuItem) {
        let position = {
            let mut items = self.items.borrow_mut();
            let position = position.min(items.len());
            items.insert(position, item);
            position
        };
        self.emit(position, 0, 1);
    }

    pub fn append(&self, label: Option<&str>, detailed_action: Option<&str>) {
        self.append_item(MenuItem::new(label, detailed_action));
    }

    pub fn append_section(&self, label: Option<&str>, section: Rc<dyn MenuModel>) {
        self.append_item(MenuItem::section(label, section));
    }

    pub fn append_submenu(&self, label: Option<&str>, submenu: Rc<dyn MenuModel>) {
        self.append_item(MenuItem::submenu(label, submenu));
    }

    /// Removes the position at `index`; out-of-range indices are ignored.
    pub fn remove(&self, index: usize) {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index < items.len() {
                items.remove(index);
                true
            } else {
                false
            }
        };
        if removed {
            self.emit(index, 1, 0);
        }
    }

    pub fn remove_all(&self) {
        self.splice(0, usize::MAX, []);
    }

    /// Replaces `removed` positions starting at `position` with `items`,
    /// notifying observers once. Both bounds are clamped to the menu.
    pub fn splice(&self, position: usize, removed: usize, items: impl IntoIterator<Item = MenuItem>) {
        let (position, removed, added) = {
            let mut current = self.items.borrow_mut();
            let position = position.min(current.len());
            let end = position.saturating_add(removed).min(current.len());
            let kept = current.len() - (end - position);
            let removed = current.splice(position..end, items).count();
            (position, removed, current.len() - kept)
        };
        if removed > 0 || added > 0 {
            self.emit(position, removed, added);
        }
    }

    /// Number of connected items-changed handlers.
    pub fn observer_count(&self) -> usize {
        self.items_changed.len()
    }

    fn emit(&self, position: usize, removed: usize, added: usize) {
        self.items_changed.emit(&ItemsChanged {
            position,
            removed,
            added,
        });
    }
}

impl MenuModel for Menu {
    fn id(&self) -> MenuId {
        self.id
    }

    fn n_items(&self) -> usize {
        self.items.borrow().len()
    }

    fn item_attributes(&self, index: usize) -> MenuAttributes {
        self.items
            .borrow()
            .get(index)
            .map(|item| item.attributes.clone())
            .unwrap_or_default()
    }

    fn item_link(&self, index: usize, kind: LinkKind) -> Option<Rc<dyn MenuModel>> {
        let items = self.items.borrow();
        let link = items.get(index)?.link.as_ref()?;
        (link.kind() == kind).then(|| Rc::clone(link.model()))
    }

    fn connect_items_changed(&self, handler: Box<dyn Fn(&ItemsChanged)>) -> Subscription {
        self.items_changed.connect(handler)
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("id", &self.id)
            .field("items", &self.items.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn detailed_action_with_target() {
        let item = MenuItem::new(Some("Eject"), Some("eject::42"));
        assert_eq!(item.attributes().label(), Some("Eject"));
        assert_eq!(item.attributes().action(), Some("eject"));
        assert_eq!(item.attributes().target(), Some(&Variant::from("42")));
    }

    #[test]
    fn detailed_action_without_target() {
        let item = MenuItem::new(None, Some("quit"));
        assert_eq!(item.attributes().action(), Some("quit"));
        assert!(item.attributes().target().is_none());
        assert!(item.attributes().label().is_none());
    }

    #[test]
    fn attribute_order_is_stable() {
        let mut attrs = MenuAttributes::new();
        attrs.set("label", "a".into());
        attrs.set("action", "b".into());
        attrs.set("label", "c".into());
        let names: Vec<_> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["label", "action"]);
        assert_eq!(attrs.label(), Some("c"));
    }

    #[test]
    fn links_are_exclusive() {
        let inner: Rc<dyn MenuModel> = Menu::new();
        let mut item = MenuItem::submenu(Some("Drive"), Rc::clone(&inner));
        item.set_section(Some(inner));
        assert_eq!(item.link().map(MenuLink::kind), Some(LinkKind::Section));
    }

    #[test]
    fn item_link_filters_by_kind() {
        let menu = Menu::new();
        let sub: Rc<dyn MenuModel> = Menu::new();
        let sub_id = sub.id();
        menu.append_submenu(Some("Drive"), sub);

        assert_eq!(menu.item_link(0, LinkKind::Submenu).map(|m| m.id()), Some(sub_id));
        assert!(menu.item_link(0, LinkKind::Section).is_none());
        assert!(menu.item_link(1, LinkKind::Submenu).is_none());
    }

    #[test]
    fn splice_notifies_once() {
        let menu = Menu::new();
        menu.append(Some("One"), None);
        menu.append(Some("Two"), None);
        menu.append(Some("Three"), None);
        let log: Rc<RefCell<Vec<ItemsChanged>>> = Rc::default();
        let l = Rc::clone(&log);
        let _sub = menu.connect_items_changed(Box::new(move |c| l.borrow_mut().push(*c)));

        menu.splice(
            1,
            1,
            [MenuItem::new(Some("A"), None), MenuItem::new(Some("B"), None)],
        );
        let labels: Vec<_> = (0..menu.n_items())
            .map(|i| menu.item_attributes(i).label().map(str::to_string))
            .collect();
        assert_eq!(
            labels,
            [Some("One"), Some("A"), Some("B"), Some("Three")].map(|l| l.map(str::to_string))
        );

        menu.splice(3, 10, []);
        menu.splice(9, 0, []);
        assert_eq!(menu.n_items(), 3);

        assert_eq!(
            *log.borrow(),
            [
                ItemsChanged { position: 1, removed: 1, added: 2 },
                ItemsChanged { position: 3, removed: 1, added: 0 },
            ]
        );
    }

    #[test]
    fn mutations_notify() {
        let menu = Menu::new();
        let log: Rc<RefCell<Vec<ItemsChanged>>> = Rc::default();

        let l = Rc::clone(&log);
        let _sub = menu.connect_items_changed(Box::new(move |c| l.borrow_mut().push(*c)));

        menu.append(Some("One"), None);
        menu.append(Some("Two"), None);
        menu.remove(0);
        menu.remove(9);
        menu.remove_all();
        menu.remove_all();

        let log = log.borrow();
        assert_eq!(log.len(), 4);
        assert_eq!(log[1], ItemsChanged { position: 1, removed: 0, added: 1 });
        assert_eq!(log[2], ItemsChanged { position: 0, removed: 1, added: 0 });
        assert_eq!(log[3], ItemsChanged { position: 0, removed: 1, added: 0 });
    }

    #[test]
    fn handler_can_read_menu() {
        let menu = Menu::new();
        let seen = Rc::new(Cell::new(0));

        let m = Rc::clone(&menu);
        let s = Rc::clone(&seen);
        let _sub = menu.connect_items_changed(Box::new(move |_| s.set(m.n_items())));
        menu.append(Some("One"), None);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn menu_ids_are_unique() {
        assert_ne!(Menu::new().id(), Menu::new().id());
    }

    #[test]
    fn out_of_range_attributes_are_empty() {
        let menu = Menu::new();
        assert!(menu.item_attributes(3).is_empty());
        assert!(menu.item_attribute(3, ATTRIBUTE_LABEL).is_none());
    }
}
