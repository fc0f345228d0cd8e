//! The menu projector: model traversal, reactive patching and activation.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::{Rc, Weak};

use driveicon_model::{
    ActionEnabledChanged, ActionGroup, ActionStateChanged, LinkKind, MenuAttributes, MenuId,
    MenuModel, Subscription, Variant, VariantType,
};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::ProjectorError;
use crate::binding::BindingIndex;
use crate::icon::{self, IconLookup};
use crate::node::{
    ActionBinding, NodeId, NodeProperties, PROP_ENABLED, PROP_TOGGLE_STATE, PropValue,
    PropertyMap, ProtocolNode, ToggleState, ToggleType,
};
use crate::tree::{LayoutNode, ProtocolTree};

/// Change notifications for the bus side.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuUpdate {
    /// The tree was rebuilt below `parent`.
    LayoutUpdated { revision: u32, parent: NodeId },
    /// Properties of existing nodes changed; only changed values are listed.
    PropertiesUpdated(Vec<(NodeId, PropertyMap)>),
}

/// Tree, index and model subscriptions built by one traversal.
#[derive(Default)]
struct Generation {
    tree: ProtocolTree,
    bindings: BindingIndex,
    subscriptions: HashMap<MenuId, Subscription>,
}

struct Inner {
    root: Rc<dyn MenuModel>,
    actions: Rc<dyn ActionGroup>,
    icons: Box<dyn IconLookup>,
    current: RefCell<Generation>,
    revision: Cell<u32>,
    next_id: Cell<i32>,
    rebuilding: Cell<bool>,
    rebuild_pending: Cell<bool>,
    updates: mpsc::UnboundedSender<MenuUpdate>,
    updates_rx: RefCell<Option<mpsc::UnboundedReceiver<MenuUpdate>>>,
    action_subscriptions: RefCell<Vec<Subscription>>,
}

/// Live projection of a menu model and its action group.
///
/// Cloning yields another handle to the same projection. Dropping the last
/// handle releases every model and action subscription.
#[derive(Clone)]
pub struct Projector {
    inner: Rc<Inner>,
}

impl Projector {
    /// Projects `root` and starts following model and action changes.
    pub fn new(
        root: Rc<dyn MenuModel>,
        actions: Rc<dyn ActionGroup>,
        icons: impl IconLookup + 'static,
    ) -> Result<Self, ProjectorError> {
        let (updates, updates_rx) = mpsc::unbounded_channel();
        let inner = Rc::new(Inner {
            root,
            actions,
            icons: Box::new(icons),
            current: RefCell::new(Generation::default()),
            revision: Cell::new(0),
            next_id: Cell::new(1),
            rebuilding: Cell::new(false),
            rebuild_pending: Cell::new(false),
            updates,
            updates_rx: RefCell::new(Some(updates_rx)),
            action_subscriptions: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&inner);
        let on_enabled = inner
            .actions
            .connect_action_enabled_changed(Box::new(move |change: &ActionEnabledChanged| {
                if let Some(inner) = weak.upgrade() {
                    inner.patch_enabled(&change.name, change.enabled);
                }
            }));
        let weak = Rc::downgrade(&inner);
        let on_state = inner
            .actions
            .connect_action_state_changed(Box::new(move |change: &ActionStateChanged| {
                if let Some(inner) = weak.upgrade() {
                    inner.patch_state(&change.name, &change.state);
                }
            }));
        inner
            .action_subscriptions
            .borrow_mut()
            .extend([on_enabled, on_state]);

        inner.rebuild()?;
        Ok(Self { inner })
    }

    /// Rebuilds the whole tree from the root model and returns its layout.
    ///
    /// Called while a traversal is running, the rebuild is deferred until the
    /// running one finishes and the current layout is returned.
    pub fn project(&self) -> Result<LayoutNode, ProjectorError> {
        self.inner.rebuild()?;
        self.layout(NodeId::ROOT, -1, &[]).map(|(_, layout)| layout)
    }

    /// Sets `enabled` on every node bound to `action`.
    pub fn patch_enabled(&self, action: &str, enabled: bool) {
        self.inner.patch_enabled(action, enabled);
    }

    /// Recomputes the toggle state of every node bound to `action`.
    pub fn patch_state(&self, action: &str, value: &Variant) {
        self.inner.patch_state(action, value);
    }

    /// Forwards a click on node `id` to the action registry.
    pub fn activate(&self, id: NodeId, timestamp: u32) -> Result<(), ProjectorError> {
        let binding = {
            let current = self.inner.current.borrow();
            let node = current
                .tree
                .get(id)
                .ok_or(ProjectorError::UnknownActionTarget(id.0))?;
            node.binding.clone()
        };

        let Some(ActionBinding { action, target }) = binding else {
            trace!(node = %id, "activated node has no action");
            return Ok(());
        };
        debug!(node = %id, action = %action, timestamp, "menu item activated");
        self.inner.actions.activate_action(&action, target)?;
        Ok(())
    }

    /// Layout below `parent` together with the current revision.
    pub fn layout(
        &self,
        parent: NodeId,
        depth: i32,
        filter: &[String],
    ) -> Result<(u32, LayoutNode), ProjectorError> {
        let current = self.inner.current.borrow();
        let layout = current
            .tree
            .layout(parent, depth, filter)
            .ok_or(ProjectorError::UnknownNode(parent.0))?;
        Ok((self.inner.revision.get(), layout))
    }

    /// Exported properties of several nodes. Unknown ids are skipped; an
    /// empty `ids` list selects every node.
    pub fn group_properties(&self, ids: &[NodeId], filter: &[String]) -> Vec<(NodeId, PropertyMap)> {
        let current = self.inner.current.borrow();
        let tree = &current.tree;
        let selected: Vec<NodeId> = if ids.is_empty() {
            std::iter::once(NodeId::ROOT).chain(tree.walk()).collect()
        } else {
            ids.to_vec()
        };
        selected
            .into_iter()
            .filter_map(|id| Some((id, tree.get(id)?.properties.exported(filter))))
            .collect()
    }

    /// One property of one node, protocol defaults included.
    pub fn property(&self, id: NodeId, name: &str) -> Result<PropValue, ProjectorError> {
        let current = self.inner.current.borrow();
        let node = current
            .tree
            .get(id)
            .ok_or(ProjectorError::UnknownNode(id.0))?;
        node.properties
            .get(name)
            .ok_or_else(|| ProjectorError::UnknownProperty(name.to_string()))
    }

    /// Layout revision, bumped by every successful rebuild.
    pub fn revision(&self) -> u32 {
        self.inner.revision.get()
    }

    /// Borrows the current tree. The borrow must end before the model or the
    /// action group is touched again.
    pub fn tree(&self) -> Ref<'_, ProtocolTree> {
        Ref::map(self.inner.current.borrow(), |g| &g.tree)
    }

    /// Borrows the current binding index; same rules as [`Projector::tree`].
    pub fn bindings(&self) -> Ref<'_, BindingIndex> {
        Ref::map(self.inner.current.borrow(), |g| &g.bindings)
    }

    /// Number of menu models the current generation follows.
    pub fn subscribed_models(&self) -> usize {
        self.inner.current.borrow().subscriptions.len()
    }

    /// Takes the update stream. Returns `None` after the first call.
    pub fn take_updates(&self) -> Option<mpsc::UnboundedReceiver<MenuUpdate>> {
        self.inner.updates_rx.borrow_mut().take()
    }
}

impl Inner {
    /// Runs a full rebuild, or defers it when a traversal is already running.
    fn rebuild(self: &Rc<Self>) -> Result<(), ProjectorError> {
        if self.rebuilding.get() {
            trace!("rebuild requested during traversal, deferring");
            self.rebuild_pending.set(true);
            return Ok(());
        }

        loop {
            self.rebuild_pending.set(false);
            self.rebuilding.set(true);
            let built = self.build();
            self.rebuilding.set(false);

            let result = built.map(|generation| self.install(generation));
            if !self.rebuild_pending.get() {
                return result;
            }
            if let Err(e) = result {
                warn!(error = %e, "menu rebuild failed, retrying deferred rebuild");
            }
            debug!("running deferred menu rebuild");
        }
    }

    fn on_items_changed(self: &Rc<Self>, menu: MenuId) {
        debug!(%menu, "menu structure changed");
        if let Err(e) = self.rebuild() {
            error!(error = %e, "menu rebuild failed, keeping previous layout");
        }
    }

    fn build(self: &Rc<Self>) -> Result<Generation, ProjectorError> {
        let mut builder = Builder {
            inner: self,
            generation: Generation::default(),
        };
        let root = Rc::clone(&self.root);
        let children = builder.populate(&root)?;
        builder.generation.tree.set_children(NodeId::ROOT, children);
        Ok(builder.generation)
    }

    fn install(&self, generation: Generation) {
        let nodes = generation.tree.len();
        let previous = self.current.replace(generation);
        drop(previous);

        let revision = self.revision.get().wrapping_add(1);
        self.revision.set(revision);
        debug!(revision, nodes, "menu layout rebuilt");
        self.send(MenuUpdate::LayoutUpdated {
            revision,
            parent: NodeId::ROOT,
        });
    }

    fn patch_enabled(&self, action: &str, enabled: bool) {
        if self.rebuilding.get() {
            self.rebuild_pending.set(true);
            return;
        }

        let mut changed = Vec::new();
        {
            let mut current = self.current.borrow_mut();
            let Generation { tree, bindings, .. } = &mut *current;
            for &id in bindings.enabled_nodes(action) {
                if tree.set_enabled(id, enabled) {
                    changed.push((id, vec![(PROP_ENABLED.to_string(), PropValue::Bool(enabled))]));
                }
            }
        }
        trace!(action, enabled, nodes = changed.len(), "patched enabled");
        self.send_properties(changed);
    }

    fn patch_state(&self, action: &str, value: &Variant) {
        if self.rebuilding.get() {
            self.rebuild_pending.set(true);
            return;
        }

        let mut changed = Vec::new();
        {
            let mut current = self.current.borrow_mut();
            let Generation { tree, bindings, .. } = &mut *current;
            for (id, expected) in bindings.state_nodes(action) {
                let state = ToggleState::matching(expected.as_ref(), Some(value));
                if tree.set_toggle_state(*id, state) {
                    changed.push((
                        *id,
                        vec![(PROP_TOGGLE_STATE.to_string(), PropValue::Int(state.as_i32()))],
                    ));
                }
            }
        }
        trace!(action, %value, nodes = changed.len(), "patched toggle state");
        self.send_properties(changed);
    }

    fn send_properties(&self, changed: Vec<(NodeId, PropertyMap)>) {
        if !changed.is_empty() {
            self.send(MenuUpdate::PropertiesUpdated(changed));
        }
    }

    fn send(&self, update: MenuUpdate) {
        if self.updates.send(update).is_err() {
            trace!("menu update dropped: no listener");
        }
    }

    fn allocate_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1).max(1));
        NodeId(id)
    }
}

/// State of one traversal.
struct Builder<'a> {
    inner: &'a Rc<Inner>,
    generation: Generation,
}

impl Builder<'_> {
    fn subscribe(&mut self, model: &Rc<dyn MenuModel>) {
        let menu = model.id();
        if let Entry::Vacant(slot) = self.generation.subscriptions.entry(menu) {
            let weak: Weak<Inner> = Rc::downgrade(self.inner);
            slot.insert(model.connect_items_changed(Box::new(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_items_changed(menu);
                }
            })));
        }
    }

    /// Projects the positions of `model` and returns the ids to attach to
    /// the enclosing node. Sections are flattened into the result.
    fn populate(&mut self, model: &Rc<dyn MenuModel>) -> Result<Vec<NodeId>, ProjectorError> {
        self.subscribe(model);

        let mut out = Vec::new();
        let mut section_closed = false;
        for index in 0..model.n_items() {
            let attributes = model.item_attributes(index);

            if let Some(section) = model.item_link(index, LinkKind::Section) {
                if index > 0 {
                    out.push(self.separator());
                }
                if attributes.label().is_some() {
                    out.push(self.header(&attributes)?);
                }
                out.extend(self.populate(&section)?);
                section_closed = true;
            } else {
                if section_closed {
                    out.push(self.separator());
                    section_closed = false;
                }
                let submenu = model.item_link(index, LinkKind::Submenu);
                out.push(self.item(&attributes, submenu.as_ref())?);
            }
        }
        Ok(out)
    }

    fn separator(&mut self) -> NodeId {
        self.add(NodeProperties::separator(), None)
    }

    /// Disabled label row introducing a section. Never bound to an action.
    fn header(&mut self, attributes: &MenuAttributes) -> Result<NodeId, ProjectorError> {
        let mut properties = self.display_properties(attributes)?;
        properties.enabled = false;
        Ok(self.add(properties, None))
    }

    fn item(
        &mut self,
        attributes: &MenuAttributes,
        submenu: Option<&Rc<dyn MenuModel>>,
    ) -> Result<NodeId, ProjectorError> {
        let mut properties = self.display_properties(attributes)?;
        let binding = attributes.action().map(|action| ActionBinding {
            action: action.to_string(),
            target: attributes.target().cloned(),
        });

        let id = self.inner.allocate_id();
        if let Some(binding) = &binding {
            let actions = &self.inner.actions;
            let action = binding.action.as_str();

            properties.enabled = actions.action_enabled(action);
            self.generation.bindings.bind_enabled(action, id);

            let toggle = match actions.action_state_type(action) {
                Some(VariantType::Str) => Some((ToggleType::Radio, binding.target.clone())),
                Some(VariantType::Bool) => Some((ToggleType::Checkmark, Some(Variant::Bool(true)))),
                _ => None,
            };
            if let Some((toggle_type, expected)) = toggle {
                let current = actions.action_state(action);
                properties.toggle_type = toggle_type;
                properties.toggle_state = ToggleState::matching(expected.as_ref(), current.as_ref());
                self.generation.bindings.bind_state(action, id, expected);
            }
        }

        let children = match submenu {
            Some(model) => self.populate(model)?,
            None => Vec::new(),
        };
        properties.submenu = !children.is_empty();

        self.generation.tree.insert(ProtocolNode {
            id,
            properties,
            children,
            binding,
        });
        Ok(id)
    }

    fn display_properties(&self, attributes: &MenuAttributes) -> Result<NodeProperties, ProjectorError> {
        let mut properties = NodeProperties {
            label: attributes.label().map(str::to_string),
            ..NodeProperties::default()
        };
        if let Some(value) = attributes.get(driveicon_model::ATTRIBUTE_ICON) {
            properties.icon_name = icon::resolve(self.inner.icons.as_ref(), value)?;
        }
        Ok(properties)
    }

    fn add(&mut self, properties: NodeProperties, binding: Option<ActionBinding>) -> NodeId {
        let id = self.inner.allocate_id();
        self.generation.tree.insert(ProtocolNode {
            id,
            properties,
            children: Vec::new(),
            binding,
        });
        id
    }
}
