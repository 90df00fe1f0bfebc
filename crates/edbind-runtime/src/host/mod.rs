#![forbid(unsafe_code)]

//! Minimal hook host for components that bind to editor state.
//!
//! This module provides the primitives a binding needs from its reactive
//! environment, and nothing more:
//!
//! - [`Hooks::use_memo`]: value cached by a dependency tuple.
//! - [`Hooks::use_ref`]: mutable cell that survives renders without
//!   triggering them.
//! - [`Hooks::use_state`]: reactive slot whose [`StateSetter`] schedules a
//!   re-render.
//! - [`Hooks::use_layout_effect`]: post-commit effect with cleanup.
//! - [`Hooks::use_context`]: values provided on the [`Host`].
//!
//! # Architecture
//!
//! A [`Host`] is shared configuration, statistics, and context. A [`Root`]
//! owns one component: its render closure and its slot table. Slots are
//! positional, like a call-site keyed slot table: the n-th hook call of a
//! render always addresses the n-th slot.
//!
//! Each update cycle has two phases:
//!
//! 1. **Render** ([`Root::render`]): runs the render closure. Memo and state
//!    initializers may run; effects whose dependencies differ from the last
//!    *committed* ones are queued. Rendering may repeat without a commit.
//! 2. **Commit** ([`Root::commit`]): runs the previous cleanups of every
//!    queued effect, then the queued effects, both in slot order.
//!
//! # Invariants
//!
//! 1. A cleanup runs at most once, and always before the effect that
//!    replaces it.
//! 2. Every stored cleanup runs on [`Root::unmount`] (or drop).
//! 3. State writes after unmount are dropped and counted.
//! 4. All types are `!Send`: one logical thread drives the host.
//!
//! # Failure Modes
//!
//! - **Hook order drift**: a render calling hooks in a different order or
//!   count than the previous one fails with [`HostError::HookOrder`].
//! - **Effect failure**: the commit stops at the failing effect. Effects
//!   whose cleanup already ran are left uncommitted and re-run on the next
//!   commit.
//! - **Unsettled state**: [`Root::flush`] gives up after
//!   [`HostConfig::max_render_passes`] with [`HostError::RenderLoop`].

mod hooks;
mod root;

pub use hooks::{Cleanup, Hooks, Ref, StateSetter};
pub use root::Root;

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::config::HostConfig;
use crate::error::HostError;

/// Counters describing what a host has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub renders: u64,
    pub commits: u64,
    pub effects_run: u64,
    pub cleanups_run: u64,
    pub state_updates: u64,
    /// State writes or listener calls discarded because their target was
    /// unmounted or detached.
    pub dropped_updates: u64,
}

struct HostShared {
    config: HostConfig,
    stats: Cell<HostStats>,
    contexts: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    next_root_id: Cell<u64>,
}

/// Shared host handle. Cloning shares configuration, stats, and context.
#[derive(Clone)]
pub struct Host {
    shared: Rc<HostShared>,
}

impl Host {
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        Self {
            shared: Rc::new(HostShared {
                config,
                stats: Cell::new(HostStats::default()),
                contexts: RefCell::new(HashMap::new()),
                next_root_id: Cell::new(1),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> HostConfig {
        self.shared.config
    }

    #[must_use]
    pub fn stats(&self) -> HostStats {
        self.shared.stats.get()
    }

    /// Provide `value` to every component's [`Hooks::use_context`]. A later
    /// value of the same type replaces the earlier one.
    pub fn provide<T: 'static>(&self, value: T) {
        self.shared
            .contexts
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::new(value));
    }

    /// The provided value of type `T`, if any.
    #[must_use]
    pub fn context<T: 'static>(&self) -> Option<Rc<T>> {
        let any = self.shared.contexts.borrow().get(&TypeId::of::<T>()).cloned()?;
        any.downcast::<T>().ok()
    }

    /// Count a discarded update.
    pub fn note_dropped_update(&self) {
        self.record(|s| s.dropped_updates += 1);
    }

    pub(crate) fn record(&self, f: impl FnOnce(&mut HostStats)) {
        let mut stats = self.shared.stats.get();
        f(&mut stats);
        self.shared.stats.set(stats);
    }

    fn next_root_id(&self) -> u64 {
        let id = self.shared.next_root_id.get();
        self.shared.next_root_id.set(id + 1);
        id
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .field("contexts", &self.shared.contexts.borrow().len())
            .finish()
    }
}

/// Per-root scheduling state shared with that root's state setters.
pub(crate) struct RootState {
    host: Host,
    id: u64,
    dirty: Cell<bool>,
    alive: Cell<bool>,
    rendering: Cell<bool>,
    deferred: RefCell<Vec<HostError>>,
}

impl RootState {
    fn new(host: &Host) -> Self {
        Self {
            id: host.next_root_id(),
            host: host.clone(),
            dirty: Cell::new(true),
            alive: Cell::new(true),
            rendering: Cell::new(false),
            deferred: RefCell::new(Vec::new()),
        }
    }

    fn defer(&self, err: HostError) {
        self.deferred.borrow_mut().push(err);
    }

    fn take_deferred(&self) -> Option<HostError> {
        let mut deferred = self.deferred.borrow_mut();
        if deferred.is_empty() {
            None
        } else {
            Some(deferred.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_round_trip() {
        let host = Host::default();
        assert!(host.context::<String>().is_none());

        host.provide(String::from("composer"));
        assert_eq!(host.context::<String>().as_deref().map(String::as_str), Some("composer"));

        host.provide(String::from("replaced"));
        assert_eq!(host.context::<String>().as_deref().map(String::as_str), Some("replaced"));
    }

    #[test]
    fn contexts_are_keyed_by_type() {
        let host = Host::default();
        host.provide(1u32);
        host.provide(2u64);
        assert_eq!(host.context::<u32>().map(|v| *v), Some(1));
        assert_eq!(host.context::<u64>().map(|v| *v), Some(2));
        assert!(host.context::<i32>().is_none());
    }

    #[test]
    fn clones_share_stats() {
        let host = Host::default();
        let other = host.clone();
        other.note_dropped_update();
        assert_eq!(host.stats().dropped_updates, 1);
    }

    #[test]
    fn root_ids_are_unique() {
        let host = Host::default();
        let a = RootState::new(&host);
        let b = RootState::new(&host);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn deferred_errors_are_fifo() {
        let host = Host::default();
        let state = RootState::new(&host);
        state.defer(HostError::ReentrantUpdate { slot: 1 });
        state.defer(HostError::ReentrantUpdate { slot: 2 });
        assert_eq!(
            state.take_deferred(),
            Some(HostError::ReentrantUpdate { slot: 1 })
        );
        assert_eq!(
            state.take_deferred(),
            Some(HostError::ReentrantUpdate { slot: 2 })
        );
        assert_eq!(state.take_deferred(), None);
    }
}
