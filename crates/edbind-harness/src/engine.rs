#![forbid(unsafe_code)]

//! Scripted editor engine for binding tests.
//!
//! [`MockEditor`] owns a few observable values, each an [`EngineCell`] with
//! its own listener registry and counters. Tests drive it imperatively
//! ([`EngineCell::set`], [`EngineCell::emit`]) and then assert on what the
//! binding observed and on the registry bookkeeping (attaches, detaches,
//! reads, active listeners).
//!
//! # Example
//!
//! ```rust
//! use edbind_core::EditorHandle;
//! use edbind_harness::engine::{MockEditor, counter_factory};
//!
//! let editor = EditorHandle::new(MockEditor::new());
//! let descriptor = counter_factory().resolve(&editor).unwrap();
//! editor.counter().set(3);
//! assert_eq!(descriptor.read_current().unwrap(), 3);
//! assert_eq!(editor.counter().reads(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use edbind_core::{
    EditorHandle, Listener, SameValue, Subscription, SubscriptionError, SubscriptionFactory,
    Unsubscribe,
};

/// Registry bookkeeping of one [`EngineCell`] at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStats {
    pub attaches: u64,
    pub detaches: u64,
    pub active: usize,
    pub reads: u64,
}

/// One observable engine value.
pub struct EngineCell<T> {
    name: &'static str,
    value: RefCell<T>,
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
    next_id: Cell<u64>,
    attaches: Cell<u64>,
    detaches: Cell<u64>,
    reads: Cell<u64>,
    notifications: Cell<u64>,
    fail_reads: Cell<bool>,
    fail_subscribes: Cell<bool>,
}

impl<T: Clone + SameValue + 'static> EngineCell<T> {
    #[must_use]
    pub fn new(name: &'static str, value: T) -> Rc<Self> {
        Rc::new(Self {
            name,
            value: RefCell::new(value),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            attaches: Cell::new(0),
            detaches: Cell::new(0),
            reads: Cell::new(0),
            notifications: Cell::new(0),
            fail_reads: Cell::new(false),
            fail_subscribes: Cell::new(false),
        })
    }

    /// Current value without counting a read.
    #[must_use]
    pub fn peek(&self) -> T {
        self.value.borrow().clone()
    }

    /// Counted read, as a descriptor's `read_current` performs it.
    ///
    /// # Errors
    ///
    /// [`SubscriptionError::Read`] while reads are failing.
    pub fn read(&self) -> Result<T, SubscriptionError> {
        self.reads.set(self.reads.get() + 1);
        if self.fail_reads.get() {
            return Err(SubscriptionError::read(format!("{} unavailable", self.name)));
        }
        Ok(self.peek())
    }

    /// Store `value` and notify listeners when it is not the same value.
    pub fn set(&self, value: T) {
        let changed = !self.value.borrow().same_value(&value);
        *self.value.borrow_mut() = value.clone();
        if changed {
            self.notify(value);
        }
    }

    /// Store `value` and notify listeners unconditionally.
    pub fn emit(&self, value: T) {
        *self.value.borrow_mut() = value.clone();
        self.notify(value);
    }

    /// Register `listener`, returning the lease that removes it.
    ///
    /// # Errors
    ///
    /// [`SubscriptionError::Subscribe`] while subscriptions are failing.
    pub fn register(self: &Rc<Self>, listener: Listener<T>) -> Result<Unsubscribe, SubscriptionError> {
        if self.fail_subscribes.get() {
            return Err(SubscriptionError::subscribe(format!(
                "{} rejected listener",
                self.name
            )));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.attaches.set(self.attaches.get() + 1);
        self.listeners.borrow_mut().push((id, listener));
        tracing::trace!(message = "engine.attach", cell = self.name, id);

        let owner = Rc::clone(self);
        Ok(Unsubscribe::new(move || {
            owner.detaches.set(owner.detaches.get() + 1);
            owner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
            tracing::trace!(message = "engine.detach", cell = owner.name, id);
        }))
    }

    /// Listener currently registered under the oldest id, if any.
    ///
    /// Lets tests hold on to a listener past its detach.
    #[must_use]
    pub fn first_listener(&self) -> Option<Listener<T>> {
        self.listeners.borrow().first().map(|(_, l)| Rc::clone(l))
    }

    fn notify(&self, value: T) {
        // Snapshot so listeners may attach or detach while being notified.
        let listeners: Vec<Listener<T>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        self.notifications.set(self.notifications.get() + 1);
        for listener in listeners {
            listener(value.clone());
        }
    }
}

impl<T> EngineCell<T> {
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[must_use]
    pub fn attaches(&self) -> u64 {
        self.attaches.get()
    }

    #[must_use]
    pub fn detaches(&self) -> u64 {
        self.detaches.get()
    }

    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }

    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.notifications.get()
    }

    #[must_use]
    pub fn stats(&self) -> CellStats {
        CellStats {
            attaches: self.attaches(),
            detaches: self.detaches(),
            active: self.active_listeners(),
            reads: self.reads(),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn fail_subscribes(&self, fail: bool) {
        self.fail_subscribes.set(fail);
    }
}

impl<T: fmt::Debug> fmt::Debug for EngineCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCell")
            .field("name", &self.name)
            .field("value", &self.value.borrow())
            .field("listeners", &self.listeners.borrow().len())
            .field("attaches", &self.attaches.get())
            .field("detaches", &self.detaches.get())
            .finish()
    }
}

/// A small editor: an editable flag, text content, and a change counter.
#[derive(Debug)]
pub struct MockEditor {
    editable: Rc<EngineCell<bool>>,
    text: Rc<EngineCell<Rc<str>>>,
    counter: Rc<EngineCell<i64>>,
}

impl MockEditor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            editable: EngineCell::new("editable", true),
            text: EngineCell::new("text", Rc::from("")),
            counter: EngineCell::new("counter", 0),
        }
    }

    #[must_use]
    pub fn editable(&self) -> &Rc<EngineCell<bool>> {
        &self.editable
    }

    #[must_use]
    pub fn text(&self) -> &Rc<EngineCell<Rc<str>>> {
        &self.text
    }

    #[must_use]
    pub fn counter(&self) -> &Rc<EngineCell<i64>> {
        &self.counter
    }

    /// Replace the text content. Unchanged text keeps its allocation, so
    /// identity comparison sees no change.
    pub fn set_text(&self, text: &str) {
        if *self.text.peek() != *text {
            self.text.set(Rc::from(text));
        }
    }
}

impl Default for MockEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_descriptor<T>(cell: &Rc<EngineCell<T>>) -> Subscription<T>
where
    T: Clone + SameValue + 'static,
{
    let reader = Rc::clone(cell);
    let registrar = Rc::clone(cell);
    Subscription::try_new(
        move || reader.read(),
        move |listener| registrar.register(listener),
    )
}

/// Whether the editor accepts input.
#[must_use]
pub fn editable_factory() -> SubscriptionFactory<MockEditor, bool> {
    SubscriptionFactory::new("editable", |editor: &EditorHandle<MockEditor>| {
        cell_descriptor(editor.editable())
    })
}

/// The editor's text content.
#[must_use]
pub fn text_content_factory() -> SubscriptionFactory<MockEditor, Rc<str>> {
    SubscriptionFactory::new("text_content", |editor: &EditorHandle<MockEditor>| {
        cell_descriptor(editor.text())
    })
}

/// The change counter.
#[must_use]
pub fn counter_factory() -> SubscriptionFactory<MockEditor, i64> {
    SubscriptionFactory::new("counter", |editor: &EditorHandle<MockEditor>| {
        cell_descriptor(editor.counter())
    })
}

/// Whether the text content is empty, derived from the text cell.
#[must_use]
pub fn is_empty_factory() -> SubscriptionFactory<MockEditor, bool> {
    SubscriptionFactory::new("is_empty", |editor: &EditorHandle<MockEditor>| {
        cell_descriptor(editor.text()).map(|text: Rc<str>| text.is_empty())
    })
}
