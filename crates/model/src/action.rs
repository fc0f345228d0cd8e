//! The action registry: named actions with enabled flags, optional typed
//! state and activation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::ModelError;
use crate::signal::{Handlers, Subscription};
use crate::variant::{Variant, VariantType};

/// Emitted when an action's enabled flag changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEnabledChanged {
    pub name: String,
    pub enabled: bool,
}

/// Emitted when an action's state changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStateChanged {
    pub name: String,
    pub state: Variant,
}

/// Read/activate side of an action registry.
///
/// Queries about unknown actions answer "disabled, stateless".
pub trait ActionGroup {
    fn has_action(&self, name: &str) -> bool;

    fn list_actions(&self) -> Vec<String>;

    fn action_enabled(&self, name: &str) -> bool;

    fn action_parameter_type(&self, name: &str) -> Option<VariantType>;

    fn action_state_type(&self, name: &str) -> Option<VariantType>;

    fn action_state(&self, name: &str) -> Option<Variant>;

    fn activate_action(&self, name: &str, parameter: Option<Variant>) -> Result<(), ModelError>;

    fn change_action_state(&self, name: &str, value: Variant) -> Result<(), ModelError>;

    fn connect_action_enabled_changed(
        &self,
        handler: Box<dyn Fn(&ActionEnabledChanged)>,
    ) -> Subscription;

    fn connect_action_state_changed(
        &self,
        handler: Box<dyn Fn(&ActionStateChanged)>,
    ) -> Subscription;
}

type ActivateHandler = Rc<dyn Fn(&SimpleAction, Option<&Variant>) -> Result<(), ModelError>>;

/// A single action with an optional activation handler.
///
/// Without a handler, activating a stateful action changes its state: boolean
/// actions toggle when activated without a parameter, otherwise the
/// parameter becomes the new state.
pub struct SimpleAction {
    name: String,
    parameter_type: Option<VariantType>,
    enabled: Cell<bool>,
    state: RefCell<Option<Variant>>,
    on_activate: RefCell<Option<ActivateHandler>>,
    enabled_changed: Rc<Handlers<ActionEnabledChanged>>,
    state_changed: Rc<Handlers<ActionStateChanged>>,
}

impl SimpleAction {
    /// Creates a stateless, enabled action.
    pub fn new(name: impl Into<String>, parameter_type: Option<VariantType>) -> Rc<Self> {
        Self::build(name.into(), parameter_type, None)
    }

    /// Creates a stateful, enabled action.
    pub fn new_stateful(
        name: impl Into<String>,
        parameter_type: Option<VariantType>,
        state: Variant,
    ) -> Rc<Self> {
        Self::build(name.into(), parameter_type, Some(state))
    }

    fn build(name: String, parameter_type: Option<VariantType>, state: Option<Variant>) -> Rc<Self> {
        Rc::new(Self {
            name,
            parameter_type,
            enabled: Cell::new(true),
            state: RefCell::new(state),
            on_activate: RefCell::new(None),
            enabled_changed: Handlers::new(),
            state_changed: Handlers::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> Option<VariantType> {
        self.parameter_type
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn state(&self) -> Option<Variant> {
        self.state.borrow().clone()
    }

    pub fn state_type(&self) -> Option<VariantType> {
        self.state.borrow().as_ref().map(Variant::variant_type)
    }

    /// Installs the activation handler, replacing any previous one. Errors it
    /// returns are passed back to whoever activated the action.
    pub fn connect_activate(
        &self,
        handler: impl Fn(&SimpleAction, Option<&Variant>) -> Result<(), ModelError> + 'static,
    ) {
        *self.on_activate.borrow_mut() = Some(Rc::new(handler));
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.replace(enabled) != enabled {
            self.enabled_changed.emit(&ActionEnabledChanged {
                name: self.name.clone(),
                enabled,
            });
        }
    }

    /// Replaces the state. The new value must have the type of the current
    /// state; stateless actions reject every value.
    pub fn set_state(&self, value: Variant) -> Result<(), ModelError> {
        let expected = self.state_type();
        if expected != Some(value.variant_type()) {
            return Err(ModelError::StateMismatch {
                action: self.name.clone(),
                expected,
                got: value.variant_type(),
            });
        }

        let changed = {
            let mut state = self.state.borrow_mut();
            if state.as_ref() == Some(&value) {
                false
            } else {
                *state = Some(value.clone());
                true
            }
        };
        if changed {
            self.state_changed.emit(&ActionStateChanged {
                name: self.name.clone(),
                state: value,
            });
        }
        Ok(())
    }

    /// Activates the action with a parameter of its declared type.
    pub fn activate(&self, parameter: Option<Variant>) -> Result<(), ModelError> {
        let got = parameter.as_ref().map(Variant::variant_type);
        if got != self.parameter_type {
            return Err(ModelError::ParameterMismatch {
                action: self.name.clone(),
                expected: self.parameter_type,
                got,
            });
        }
        if !self.enabled() {
            return Err(ModelError::ActionDisabled(self.name.clone()));
        }

        let handler = self.on_activate.borrow().clone();
        if let Some(handler) = handler {
            return handler(self, parameter.as_ref());
        }

        match (self.state(), parameter) {
            (Some(Variant::Bool(current)), None) => self.set_state(Variant::Bool(!current)),
            (Some(_), Some(value)) => self.set_state(value),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for SimpleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleAction")
            .field("name", &self.name)
            .field("parameter_type", &self.parameter_type)
            .field("enabled", &self.enabled.get())
            .field("state", &self.state.borrow())
            .finish()
    }
}

struct Entry {
    action: Rc<SimpleAction>,
    _forwards: [Subscription; 2],
}

/// In-memory [`ActionGroup`] that forwards its actions' notifications.
pub struct SimpleActionGroup {
    entries: RefCell<Vec<Entry>>,
    enabled_changed: Rc<Handlers<ActionEnabledChanged>>,
    state_changed: Rc<Handlers<ActionStateChanged>>,
}

impl SimpleActionGroup {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            enabled_changed: Handlers::new(),
            state_changed: Handlers::new(),
        })
    }

    /// Adds an action, replacing any action with the same name.
    pub fn add_action(&self, action: Rc<SimpleAction>) {
        self.remove_action(action.name());

        let enabled_fwd = Rc::downgrade(&self.enabled_changed);
        let state_fwd = Rc::downgrade(&self.state_changed);
        let forwards = [
            action.enabled_changed.connect(Box::new(move |e| {
                if let Some(handlers) = enabled_fwd.upgrade() {
                    handlers.emit(e);
                }
            })),
            action.state_changed.connect(Box::new(move |e| {
                if let Some(handlers) = state_fwd.upgrade() {
                    handlers.emit(e);
                }
            })),
        ];

        self.entries.borrow_mut().push(Entry {
            action,
            _forwards: forwards,
        });
    }

    pub fn remove_action(&self, name: &str) {
        self.entries
            .borrow_mut()
            .retain(|entry| entry.action.name() != name);
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<SimpleAction>> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.action.name() == name)
            .map(|entry| Rc::clone(&entry.action))
    }

    fn require(&self, name: &str) -> Result<Rc<SimpleAction>, ModelError> {
        self.lookup(name)
            .ok_or_else(|| ModelError::UnknownAction(name.to_string()))
    }
}

impl ActionGroup for SimpleActionGroup {
    fn has_action(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn list_actions(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.action.name().to_string())
            .collect()
    }

    fn action_enabled(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|a| a.enabled())
    }

    fn action_parameter_type(&self, name: &str) -> Option<VariantType> {
        self.lookup(name)?.parameter_type()
    }

    fn action_state_type(&self, name: &str) -> Option<VariantType> {
        self.lookup(name)?.state_type()
    }

    fn action_state(&self, name: &str) -> Option<Variant> {
        self.lookup(name)?.state()
    }

    fn activate_action(&self, name: &str, parameter: Option<Variant>) -> Result<(), ModelError> {
        let action = self.require(name)?;
        debug!(action = %name, parameter = ?parameter, "activating action");
        action.activate(parameter)
    }

    fn change_action_state(&self, name: &str, value: Variant) -> Result<(), ModelError> {
        self.require(name)?.set_state(value)
    }

    fn connect_action_enabled_changed(
        &self,
        handler: Box<dyn Fn(&ActionEnabledChanged)>,
    ) -> Subscription {
        self.enabled_changed.connect(handler)
    }

    fn connect_action_state_changed(
        &self,
        handler: Box<dyn Fn(&ActionStateChanged)>,
    ) -> Subscription {
        self.state_changed.connect(handler)
    }
}
