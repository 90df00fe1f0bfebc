#![forbid(unsafe_code)]

//! A mounted component: render closure plus slot table.

use std::fmt;
use std::rc::Rc;

use super::hooks::{Hooks, Slot};
use super::{Host, RootState};
use crate::error::{HostError, Result};

type RenderFn<Out> = dyn FnMut(&mut Hooks<'_>) -> Result<Out>;

/// One mounted component.
///
/// Dropping a `Root` unmounts it.
pub struct Root<Out> {
    state: Rc<RootState>,
    slots: Vec<Slot>,
    render_fn: Box<RenderFn<Out>>,
    /// Set once a render has completed; later renders must reuse the slots.
    mounted: bool,
}

impl<Out> Root<Out> {
    pub fn new(host: &Host, render: impl FnMut(&mut Hooks<'_>) -> Result<Out> + 'static) -> Self {
        Self {
            state: Rc::new(RootState::new(host)),
            slots: Vec::new(),
            render_fn: Box::new(render),
            mounted: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.state.id
    }

    #[must_use]
    pub fn host(&self) -> &Host {
        &self.state.host
    }

    /// Whether state changed since the last render started.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// Whether the root has not been unmounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state.alive.get()
    }

    /// Take the oldest error deferred by a state setter.
    pub fn take_error(&self) -> Option<HostError> {
        self.state.take_deferred()
    }

    /// Render phase: run the render closure and queue changed effects.
    ///
    /// May be called repeatedly without committing; only the effects queued
    /// by the latest render are committed.
    ///
    /// # Errors
    ///
    /// [`HostError::Unmounted`] after unmount, hook order violations, and
    /// any error returned by the render closure. A failed render queues no
    /// effects.
    pub fn render(&mut self) -> Result<Out> {
        if !self.state.alive.get() {
            return Err(HostError::Unmounted);
        }
        let mounting = !self.mounted;
        self.state.dirty.set(false);
        self.state.rendering.set(true);
        let (result, cursor) = {
            let mut hooks = Hooks::new(&mut self.slots, mounting, &self.state);
            let result = (self.render_fn)(&mut hooks);
            (result, hooks.cursor())
        };
        self.state.rendering.set(false);
        self.state.host.record(|s| s.renders += 1);

        let result = result.and_then(|out| {
            if !mounting && cursor != self.slots.len() {
                tracing::warn!(
                    message = "host.hook_order",
                    root = self.state.id,
                    index = cursor,
                    expected = "end of render",
                    slots = self.slots.len()
                );
                return Err(HostError::HookOrder {
                    index: cursor,
                    expected: "end of render",
                });
            }
            Ok(out)
        });

        match result {
            Ok(out) => {
                self.mounted = true;
                tracing::trace!(
                    message = "host.render",
                    root = self.state.id,
                    slots = self.slots.len(),
                    mounting
                );
                Ok(out)
            }
            Err(err) => {
                if mounting {
                    self.slots.clear();
                } else {
                    self.discard_pending();
                }
                Err(err)
            }
        }
    }

    /// Commit phase: run the cleanups of queued effects, then the effects.
    ///
    /// # Errors
    ///
    /// [`HostError::Unmounted`] after unmount, or the first failing effect's
    /// error. Effects after the failing one are not run this commit.
    pub fn commit(&mut self) -> Result<()> {
        if !self.state.alive.get() {
            return Err(HostError::Unmounted);
        }
        let host = &self.state.host;

        for slot in &mut self.slots {
            if let Slot::Effect(effect) = slot
                && effect.pending.is_some()
            {
                // The previous run is gone; until the new run completes this
                // slot has nothing committed.
                effect.committed = None;
                if let Some(cleanup) = effect.cleanup.take() {
                    cleanup();
                    host.record(|s| s.cleanups_run += 1);
                }
            }
        }

        let mut failure = None;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Slot::Effect(effect) = slot else {
                continue;
            };
            let Some(pending) = effect.pending.take() else {
                continue;
            };
            if failure.is_some() {
                continue;
            }
            match (pending.run)() {
                Ok(cleanup) => {
                    effect.cleanup = cleanup;
                    effect.committed = Some(pending.deps);
                    host.record(|s| s.effects_run += 1);
                }
                Err(err) => {
                    let phase = match &err {
                        HostError::Subscription(source) => source.phase(),
                        _ => "host",
                    };
                    tracing::debug!(
                        message = "host.effect_failed",
                        root = self.state.id,
                        index,
                        phase,
                        error = %err
                    );
                    failure = Some(err);
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => {
                host.record(|s| s.commits += 1);
                Ok(())
            }
        }
    }

    /// Render and commit until no state changed during the last commit.
    ///
    /// Returns the output of the final render.
    ///
    /// # Errors
    ///
    /// A deferred setter error, any render or commit error, or
    /// [`HostError::RenderLoop`] when the root does not settle within
    /// [`HostConfig::max_render_passes`](crate::config::HostConfig::max_render_passes).
    pub fn flush(&mut self) -> Result<Out> {
        if let Some(err) = self.state.take_deferred() {
            return Err(err);
        }
        let max_passes = self.state.host.config().max_render_passes;
        let mut passes = 0;
        loop {
            let out = self.render()?;
            self.commit()?;
            passes += 1;
            if let Some(err) = self.state.take_deferred() {
                return Err(err);
            }
            if !self.state.dirty.get() {
                return Ok(out);
            }
            if passes >= max_passes {
                tracing::warn!(message = "host.render_loop", root = self.state.id, passes);
                return Err(HostError::RenderLoop { passes });
            }
        }
    }

    /// Run every stored cleanup and mark the root dead. Idempotent.
    pub fn unmount(&mut self) {
        if !self.state.alive.replace(false) {
            return;
        }
        let host = &self.state.host;
        let mut released = 0usize;
        for slot in &mut self.slots {
            if let Slot::Effect(effect) = slot {
                effect.pending = None;
                effect.committed = None;
                if let Some(cleanup) = effect.cleanup.take() {
                    cleanup();
                    released += 1;
                    host.record(|s| s.cleanups_run += 1);
                }
            }
        }
        tracing::debug!(message = "host.unmount", root = self.state.id, released);
    }

    fn discard_pending(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Effect(effect) = slot {
                effect.pending = None;
            }
        }
    }
}

impl<Out> Drop for Root<Out> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<Out> fmt::Debug for Root<Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.state.id)
            .field("slots", &self.slots.len())
            .field("mounted", &self.state.alive.get())
            .field("dirty", &self.state.dirty.get())
            .finish()
    }
}
