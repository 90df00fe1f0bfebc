#![forbid(unsafe_code)]

//! Subscription bindings: editor state as a reactive component value.
//!
//! # Design
//!
//! [`bind`] turns a [`SubscriptionFactory`] into a value that re-renders its
//! component whenever the editor reports a change. Per render it:
//!
//! 1. Resolves the descriptor, memoized on the identity of the editor and
//!    the factory.
//! 2. Seeds reactive state from `read_current()` on the first render only.
//! 3. Keeps a non-reactive tracking cell holding the last delivered value.
//! 4. Registers a layout effect, keyed on descriptor and factory identity,
//!    that re-reads the value, reconciles it against the tracking cell, and
//!    only then attaches the listener. The lease becomes the effect cleanup.
//!
//! Step 4's re-read closes the window between the render-time read and
//! listener attachment: a change in that window is picked up by the
//! reconciliation instead of being lost.
//!
//! # Invariants
//!
//! 1. At most one listener registration per binding at any time; the host
//!    runs the previous cleanup before attaching again.
//! 2. The reconciliation read happens before the first notification of an
//!    attach can be delivered.
//! 3. Every notification is applied, in emission order, with no equality
//!    filtering.
//! 4. After unmount (or detach, with
//!    [`HostConfig::guard_detached`](crate::config::HostConfig::guard_detached))
//!    late notifications do not touch the component.
//!
//! # Caller obligations
//!
//! - Create the factory once and clone it into each render. A fresh factory
//!   per render resolves and re-subscribes on every render.
//! - `read_current` must return identity-stable values for unchanged logical
//!   values (see [`SameValue`]); otherwise every reconciliation re-renders.

use std::cell::Cell;
use std::rc::Rc;

use edbind_core::{ByIdentity, EditorHandle, Listener, SameValue, SubscriptionFactory};

use crate::error::Result;
use crate::host::{Cleanup, Hooks};

/// Bind `factory`'s value for `editor` into the rendering component.
///
/// Call once per render, in the same hook position every time.
///
/// # Errors
///
/// Factory and read failures propagate from the render; attach failures
/// propagate from the commit. Hook order violations are reported as usual.
pub fn bind<E, T>(
    hooks: &mut Hooks<'_>,
    editor: &EditorHandle<E>,
    factory: &SubscriptionFactory<E, T>,
) -> Result<T>
where
    E: ?Sized + 'static,
    T: Clone + SameValue + 'static,
{
    let root = hooks.root_id();
    let descriptor = hooks.use_memo((editor.clone(), factory.clone()), |(editor, factory)| {
        tracing::debug!(
            message = "binding.resolve",
            root,
            factory = factory.name(),
            editor = %editor.id()
        );
        Ok(factory.resolve(editor)?)
    })?;

    let (value, set_value) = hooks.try_use_state(|| Ok(descriptor.read_current()?))?;
    let tracked = hooks.use_ref(|| value.clone())?;

    let host = hooks.host().clone();
    let guard_detached = host.config().guard_detached;
    let factory_name = factory.name();
    let deps = (ByIdentity::new(Rc::clone(&descriptor)), factory.clone());
    let descriptor_id = deps.0.key();

    hooks.use_layout_effect(deps, move || {
        let current = descriptor.read_current()?;
        if !tracked.with(|last| last.same_value(&current)) {
            tracing::debug!(
                message = "binding.reconcile",
                root,
                factory = factory_name,
                descriptor = %descriptor_id
            );
            tracked.set(current.clone());
            set_value.set(current);
        }

        let attached = Rc::new(Cell::new(true));
        let listener: Listener<T> = {
            let attached = Rc::clone(&attached);
            Rc::new(move |next: T| {
                if guard_detached && !attached.get() {
                    host.note_dropped_update();
                    tracing::debug!(
                        message = "binding.notify_after_detach",
                        root,
                        factory = factory_name
                    );
                    return;
                }
                tracked.set(next.clone());
                set_value.set(next);
            })
        };

        let lease = descriptor.subscribe(listener)?;
        tracing::debug!(
            message = "binding.attach",
            root,
            factory = factory_name,
            descriptor = %descriptor_id
        );

        let cleanup: Cleanup = Box::new(move || {
            attached.set(false);
            lease.call();
            tracing::debug!(
                message = "binding.detach",
                root,
                factory = factory_name,
                descriptor = %descriptor_id
            );
        });
        Ok(Some(cleanup))
    })?;

    Ok(value)
}

/// [`bind`] against the [`EditorHandle<E>`] provided on the host, the
/// analogue of reading the editor from the surrounding composer.
///
/// # Errors
///
/// [`HostError::MissingContext`](crate::error::HostError::MissingContext)
/// when no editor of type `E` was provided, plus everything [`bind`]
/// reports.
pub fn use_editor_subscription<E, T>(
    hooks: &mut Hooks<'_>,
    factory: &SubscriptionFactory<E, T>,
) -> Result<T>
where
    E: ?Sized + 'static,
    T: Clone + SameValue + 'static,
{
    let editor = hooks.use_context::<EditorHandle<E>>()?;
    bind(hooks, &editor, factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::error::HostError;
    use crate::host::{Host, Root};
    use edbind_core::{Subscription, SubscriptionError, Unsubscribe};
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    /// A counter engine with an observable registration list.
    #[derive(Default)]
    struct Counter {
        value: Cell<i32>,
        listeners: RefCell<Vec<(u32, Listener<i32>)>>,
        next_id: Cell<u32>,
        attaches: Cell<u32>,
        detaches: Cell<u32>,
        reads: Cell<u32>,
        fail_subscribe: Cell<bool>,
    }

    impl Counter {
        fn emit(&self, value: i32) {
            self.value.set(value);
            let listeners: Vec<_> = self
                .listeners
                .borrow()
                .iter()
                .map(|(_, l)| Rc::clone(l))
                .collect();
            for listener in listeners {
                listener(value);
            }
        }

        fn active(&self) -> usize {
            self.listeners.borrow().len()
        }
    }

    fn counter_factory() -> SubscriptionFactory<Counter, i32> {
        SubscriptionFactory::new("counter", |editor: &EditorHandle<Counter>| {
            let reader = editor.shared();
            let registrar = editor.shared();
            Subscription::try_new(
                move || {
                    reader.reads.set(reader.reads.get() + 1);
                    Ok(reader.value.get())
                },
                move |listener| {
                    if registrar.fail_subscribe.get() {
                        return Err(SubscriptionError::subscribe("engine read-only"));
                    }
                    let id = registrar.next_id.get();
                    registrar.next_id.set(id + 1);
                    registrar.attaches.set(registrar.attaches.get() + 1);
                    registrar.listeners.borrow_mut().push((id, listener));
                    let owner = Rc::clone(&registrar);
                    Ok(Unsubscribe::new(move || {
                        owner.detaches.set(owner.detaches.get() + 1);
                        owner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
                    }))
                },
            )
        })
    }

    fn mount(
        host: &Host,
        editor: &EditorHandle<Counter>,
        factory: &SubscriptionFactory<Counter, i32>,
    ) -> Root<i32> {
        let (editor, factory) = (editor.clone(), factory.clone());
        Root::new(host, move |hooks| bind(hooks, &editor, &factory))
    }

    #[test]
    fn initial_value_is_current_value() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        editor.value.set(4);
        let mut root = mount(&host, &editor, &counter_factory());

        assert_eq!(root.render().unwrap(), 4);
        assert_eq!(editor.reads.get(), 1);
        root.commit().unwrap();
        // One render-time read plus one reconciliation read.
        assert_eq!(editor.reads.get(), 2);
        assert_eq!(editor.attaches.get(), 1);
        assert_eq!(editor.active(), 1);
    }

    #[test]
    fn change_before_attach_is_reconciled() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        let mut root = mount(&host, &editor, &counter_factory());

        assert_eq!(root.render().unwrap(), 0);
        editor.value.set(5);
        root.commit().unwrap();
        assert!(root.is_dirty());
        assert_eq!(root.flush().unwrap(), 5);
    }

    #[test]
    fn notifications_drive_rerenders() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        let mut root = mount(&host, &editor, &counter_factory());
        assert_eq!(root.flush().unwrap(), 0);

        editor.emit(1);
        assert_eq!(root.flush().unwrap(), 1);
        editor.emit(2);
        editor.emit(3);
        assert_eq!(root.flush().unwrap(), 3);
        assert_eq!(editor.attaches.get(), 1);
        assert_eq!(editor.detaches.get(), 0);
    }

    #[test]
    fn unmount_detaches_once_and_ignores_late_notifications() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        let mut root = mount(&host, &editor, &counter_factory());
        root.flush().unwrap();

        let listener = Rc::clone(&editor.listeners.borrow()[0].1);
        root.unmount();
        assert_eq!(editor.detaches.get(), 1);
        assert_eq!(editor.active(), 0);

        listener(9);
        assert_eq!(host.stats().dropped_updates, 1);
        assert_eq!(host.stats().state_updates, 0);
    }

    #[test]
    fn unguarded_late_notifications_hit_the_unmounted_root() {
        let host = Host::new(HostConfig::default().with_guard_detached(false));
        let editor = EditorHandle::new(Counter::default());
        let mut root = mount(&host, &editor, &counter_factory());
        root.flush().unwrap();

        let listener = Rc::clone(&editor.listeners.borrow()[0].1);
        root.unmount();
        listener(9);
        // Dropped by the host instead of the binding.
        assert_eq!(host.stats().dropped_updates, 1);
    }

    #[test]
    fn subscribe_failure_propagates_from_commit() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        editor.fail_subscribe.set(true);
        let mut root = mount(&host, &editor, &counter_factory());

        root.render().unwrap();
        assert_eq!(
            root.commit(),
            Err(HostError::Subscription(SubscriptionError::subscribe(
                "engine read-only"
            )))
        );
        assert_eq!(editor.active(), 0);
    }

    #[test]
    fn factory_failure_propagates_from_render() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        let factory: SubscriptionFactory<Counter, i32> =
            SubscriptionFactory::try_new("broken", |_| Err(SubscriptionError::factory("no root")));
        let mut root = mount(&host, &editor, &factory);
        assert_eq!(
            root.flush(),
            Err(HostError::Subscription(SubscriptionError::factory("no root")))
        );
    }

    #[test]
    fn context_editor_is_used() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        editor.value.set(11);
        let factory = counter_factory();
        let mut root = Root::new(&host, move |hooks| use_editor_subscription(hooks, &factory));

        assert!(matches!(root.flush(), Err(HostError::MissingContext { .. })));
        host.provide(editor.clone());
        assert_eq!(root.flush().unwrap(), 11);
        assert_eq!(editor.active(), 1);
    }

    #[derive(Debug, Clone, Default)]
    struct Captured {
        message: String,
        phase: Option<String>,
    }

    struct CaptureLayer {
        events: Arc<Mutex<Vec<Captured>>>,
    }

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Fields(Captured);
            impl tracing::field::Visit for Fields {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    match field.name() {
                        "message" => self.0.message = value.to_string(),
                        "phase" => self.0.phase = Some(value.to_string()),
                        _ => {}
                    }
                }

                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0.message = format!("{value:?}").trim_matches('"').to_string();
                    }
                }
            }
            let mut fields = Fields(Captured::default());
            event.record(&mut fields);
            if !fields.0.message.is_empty() {
                self.events.lock().expect("capture lock").push(fields.0);
            }
        }
    }

    fn capture() -> (Arc<Mutex<Vec<Captured>>>, tracing::subscriber::DefaultGuard) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            events: Arc::clone(&events),
        });
        (events, tracing::subscriber::set_default(subscriber))
    }

    #[test]
    fn lifecycle_events_are_logged() {
        let (events, _guard) = capture();

        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        let mut root = mount(&host, &editor, &counter_factory());
        root.render().unwrap();
        editor.value.set(1);
        root.commit().unwrap();
        root.unmount();

        let names: Vec<String> = events
            .lock()
            .expect("capture lock")
            .iter()
            .map(|c| c.message.clone())
            .collect();
        let position = |name: &str| names.iter().position(|n| n == name);
        let resolve = position("binding.resolve").expect("resolve event");
        let reconcile = position("binding.reconcile").expect("reconcile event");
        let attach = position("binding.attach").expect("attach event");
        let detach = position("binding.detach").expect("detach event");
        assert!(resolve < reconcile && reconcile < attach && attach < detach);
    }

    #[test]
    fn failed_attach_logs_its_phase() {
        let (events, _guard) = capture();

        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        editor.fail_subscribe.set(true);
        let mut root = mount(&host, &editor, &counter_factory());
        assert!(root.flush().is_err());

        let failed = events
            .lock()
            .expect("capture lock")
            .iter()
            .find(|c| c.message == "host.effect_failed")
            .cloned()
            .expect("effect failure event");
        assert_eq!(failed.phase.as_deref(), Some("subscribe"));
    }

    #[test]
    fn notification_during_render_keeps_cell_and_state_in_step() {
        let host = Host::default();
        let editor = EditorHandle::new(Counter::default());
        let current = Rc::new(RefCell::new(counter_factory()));
        let mut root = {
            let (editor, current) = (editor.clone(), Rc::clone(&current));
            Root::new(&host, move |hooks| {
                let factory = current.borrow().clone();
                bind(hooks, &editor, &factory)
            })
        };
        assert_eq!(root.flush().unwrap(), 0);

        // Resolving this factory notifies the attached listener mid-render.
        let inner = counter_factory();
        *current.borrow_mut() =
            SubscriptionFactory::try_new("emitting", move |editor: &EditorHandle<Counter>| {
                editor.emit(9);
                inner.resolve(editor)
            });

        assert_eq!(root.flush(), Err(HostError::ReentrantUpdate { slot: 1 }));
        assert_eq!(root.flush().unwrap(), 9);
        editor.emit(10);
        assert_eq!(root.flush().unwrap(), 10);
    }
}
