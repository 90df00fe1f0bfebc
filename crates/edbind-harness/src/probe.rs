#![forbid(unsafe_code)]

//! A mounted component that binds one swappable factory and records what it
//! rendered.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use edbind_core::{EditorHandle, SameValue, SubscriptionFactory};
use edbind_runtime::{Host, HostError, Root, bind};

use crate::engine::{CellStats, EngineCell, MockEditor};
use crate::trace::BindingTrace;

type StatsFn = Box<dyn Fn() -> CellStats>;

/// Component under test: `bind(editor, factory)` and nothing else.
///
/// Every render's value is kept, and every driver call is recorded into a
/// [`BindingTrace`] together with the bookkeeping of the watched engine cell.
pub struct BindingProbe<T> {
    host: Host,
    factory: Rc<RefCell<SubscriptionFactory<MockEditor, T>>>,
    renders: Rc<RefCell<Vec<T>>>,
    root: Root<T>,
    stats: StatsFn,
    trace: BindingTrace,
}

impl<T> BindingProbe<T>
where
    T: Clone + SameValue + fmt::Debug + 'static,
{
    /// Mount a probe. `watched` is the engine cell backing `factory`; its
    /// registry counters go into the trace.
    pub fn new<S: 'static>(
        host: &Host,
        editor: &EditorHandle<MockEditor>,
        factory: SubscriptionFactory<MockEditor, T>,
        watched: &Rc<EngineCell<S>>,
    ) -> Self {
        let factory = Rc::new(RefCell::new(factory));
        let renders = Rc::new(RefCell::new(Vec::new()));
        let root = {
            let editor = editor.clone();
            let factory = Rc::clone(&factory);
            let renders = Rc::clone(&renders);
            Root::new(host, move |hooks| {
                let factory = factory.borrow().clone();
                let value = bind(hooks, &editor, &factory)?;
                renders.borrow_mut().push(value.clone());
                Ok(value)
            })
        };
        let watched = Rc::clone(watched);
        let run_id = factory.borrow().name();
        Self {
            host: host.clone(),
            trace: BindingTrace::new(run_id),
            factory,
            renders,
            root,
            stats: Box::new(move || watched.stats()),
        }
    }

    pub fn render(&mut self) -> Result<T, HostError> {
        let value = self.root.render()?;
        self.record("render", Some(&value));
        Ok(value)
    }

    pub fn commit(&mut self) -> Result<(), HostError> {
        self.root.commit()?;
        self.record("commit", None);
        Ok(())
    }

    /// Render and commit until settled, recording the settled value.
    pub fn flush(&mut self) -> Result<T, HostError> {
        let value = self.root.flush()?;
        self.record("flush", Some(&value));
        Ok(value)
    }

    /// Use `factory` from the next render on.
    pub fn swap_factory(&mut self, factory: SubscriptionFactory<MockEditor, T>) {
        tracing::debug!(message = "probe.swap_factory", factory = factory.name());
        *self.factory.borrow_mut() = factory;
        self.record("swap_factory", None);
    }

    pub fn unmount(&mut self) {
        self.root.unmount();
        self.record("unmount", None);
    }

    /// Record an external step, such as an engine emit.
    pub fn note(&mut self, event: &'static str) {
        self.record(event, None);
    }

    /// Every value rendered so far, including renders from `flush`.
    #[must_use]
    pub fn renders(&self) -> Vec<T> {
        self.renders.borrow().clone()
    }

    #[must_use]
    pub fn last_render(&self) -> Option<T> {
        self.renders.borrow().last().cloned()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.root.is_dirty()
    }

    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[must_use]
    pub fn trace(&self) -> &BindingTrace {
        &self.trace
    }

    fn record(&mut self, event: &'static str, value: Option<&T>) {
        let stats = (self.stats)();
        self.trace
            .record(event, value.map(|v| format!("{v:?}")), stats);
    }
}

impl<T> fmt::Debug for BindingProbe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingProbe")
            .field("root", &self.root.id())
            .field("renders", &self.renders.borrow().len())
            .field("steps", &self.trace.steps().len())
            .finish()
    }
}
