#![forbid(unsafe_code)]

//! Render-phase hook cursor and the slot table behind it.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{Host, RootState};
use crate::config::HostConfig;
use crate::error::{HostError, Result};

/// Effect cleanup, run before the effect re-runs and on unmount.
pub type Cleanup = Box<dyn FnOnce()>;

type EffectFn = Box<dyn FnOnce() -> Result<Option<Cleanup>>>;

pub(crate) enum Slot {
    Memo {
        deps: Box<dyn Any>,
        value: Rc<dyn Any>,
    },
    Ref(Rc<dyn Any>),
    State(Rc<dyn Any>),
    Effect(EffectSlot),
}

impl Slot {
    fn kind(&self) -> &'static str {
        match self {
            Self::Memo { .. } => "memo",
            Self::Ref(_) => "ref",
            Self::State(_) => "state",
            Self::Effect(_) => "layout effect",
        }
    }
}

#[derive(Default)]
pub(crate) struct EffectSlot {
    /// Dependencies of the last effect that ran to completion.
    pub(crate) committed: Option<Box<dyn Any>>,
    pub(crate) cleanup: Option<Cleanup>,
    /// Queued by the latest render; consumed by the next commit.
    pub(crate) pending: Option<PendingEffect>,
}

pub(crate) struct PendingEffect {
    pub(crate) deps: Box<dyn Any>,
    pub(crate) run: EffectFn,
}

/// Hook cursor handed to a render closure.
///
/// Hooks must be called in the same order, with the same types, on every
/// render of a root.
pub struct Hooks<'a> {
    slots: &'a mut Vec<Slot>,
    cursor: usize,
    mounting: bool,
    root: &'a Rc<RootState>,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(slots: &'a mut Vec<Slot>, mounting: bool, root: &'a Rc<RootState>) -> Self {
        Self {
            slots,
            cursor: 0,
            mounting,
            root,
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn host(&self) -> &Host {
        &self.root.host
    }

    #[must_use]
    pub fn config(&self) -> HostConfig {
        self.root.host.config()
    }

    /// Id of the root being rendered, for logs.
    #[must_use]
    pub fn root_id(&self) -> u64 {
        self.root.id
    }

    /// Cache `compute(&deps)` until `deps` changes.
    ///
    /// # Errors
    ///
    /// Propagates `compute` failures (the previous value and dependencies
    /// are kept) and reports hook order violations.
    pub fn use_memo<D, R>(&mut self, deps: D, compute: impl FnOnce(&D) -> Result<R>) -> Result<Rc<R>>
    where
        D: PartialEq + 'static,
        R: 'static,
    {
        let index = self.cursor;
        let value = if index == self.slots.len() {
            self.check_mounting(index, "memo")?;
            let value: Rc<dyn Any> = Rc::new(compute(&deps)?);
            self.slots.push(Slot::Memo {
                deps: Box::new(deps),
                value: Rc::clone(&value),
            });
            value
        } else {
            let Slot::Memo {
                deps: prev,
                value,
            } = &mut self.slots[index]
            else {
                return Err(self.order_error(index, "memo"));
            };
            let unchanged = prev
                .downcast_ref::<D>()
                .ok_or(HostError::HookOrder {
                    index,
                    expected: "memo",
                })?
                == &deps;
            if !unchanged {
                let fresh: Rc<dyn Any> = Rc::new(compute(&deps)?);
                *prev = Box::new(deps);
                *value = fresh;
            }
            Rc::clone(value)
        };
        self.cursor += 1;
        value.downcast::<R>().map_err(|_| HostError::HookOrder {
            index,
            expected: "memo",
        })
    }

    /// Mutable cell initialized once and kept across renders. Writing it
    /// never schedules a render.
    ///
    /// # Errors
    ///
    /// Reports hook order violations.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Result<Ref<T>> {
        let index = self.cursor;
        let cell = if index == self.slots.len() {
            self.check_mounting(index, "ref")?;
            let cell: Rc<dyn Any> = Rc::new(RefCell::new(init()));
            self.slots.push(Slot::Ref(Rc::clone(&cell)));
            cell
        } else {
            match &self.slots[index] {
                Slot::Ref(cell) => Rc::clone(cell),
                _ => return Err(self.order_error(index, "ref")),
            }
        };
        self.cursor += 1;
        cell.downcast::<RefCell<T>>()
            .map(|cell| Ref { cell })
            .map_err(|_| HostError::HookOrder {
                index,
                expected: "ref",
            })
    }

    /// Reactive state seeded once by `init`.
    ///
    /// # Errors
    ///
    /// Reports hook order violations.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, StateSetter<T>)> {
        self.try_use_state(|| Ok(init()))
    }

    /// Reactive state seeded once by a fallible `init`.
    ///
    /// # Errors
    ///
    /// Propagates the initializer's failure on the first render, and
    /// reports hook order violations.
    pub fn try_use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> Result<T>,
    ) -> Result<(T, StateSetter<T>)> {
        let index = self.cursor;
        let cell = if index == self.slots.len() {
            self.check_mounting(index, "state")?;
            let cell: Rc<dyn Any> = Rc::new(RefCell::new(init()?));
            self.slots.push(Slot::State(Rc::clone(&cell)));
            cell
        } else {
            match &self.slots[index] {
                Slot::State(cell) => Rc::clone(cell),
                _ => return Err(self.order_error(index, "state")),
            }
        };
        self.cursor += 1;
        let cell = cell
            .downcast::<RefCell<T>>()
            .map_err(|_| HostError::HookOrder {
                index,
                expected: "state",
            })?;
        let value = cell.borrow().clone();
        Ok((
            value,
            StateSetter {
                cell,
                root: Rc::clone(self.root),
                slot: index,
            },
        ))
    }

    /// Queue `effect` for the next commit if `deps` differs from the
    /// dependencies of the last committed run.
    ///
    /// The effect's returned cleanup runs before the next run of this effect
    /// and on unmount.
    ///
    /// # Errors
    ///
    /// Reports hook order violations.
    pub fn use_layout_effect<D>(
        &mut self,
        deps: D,
        effect: impl FnOnce() -> Result<Option<Cleanup>> + 'static,
    ) -> Result<()>
    where
        D: PartialEq + 'static,
    {
        let index = self.cursor;
        if index == self.slots.len() {
            self.check_mounting(index, "layout effect")?;
            self.slots.push(Slot::Effect(EffectSlot {
                pending: Some(PendingEffect {
                    deps: Box::new(deps),
                    run: Box::new(effect),
                }),
                ..EffectSlot::default()
            }));
        } else {
            let Slot::Effect(slot) = &mut self.slots[index] else {
                return Err(self.order_error(index, "layout effect"));
            };
            let changed = match &slot.committed {
                Some(prev) => {
                    prev.downcast_ref::<D>().ok_or(HostError::HookOrder {
                        index,
                        expected: "layout effect",
                    })? != &deps
                }
                None => true,
            };
            slot.pending = changed.then(|| PendingEffect {
                deps: Box::new(deps),
                run: Box::new(effect),
            });
        }
        self.cursor += 1;
        Ok(())
    }

    /// Value of type `T` provided on the host.
    ///
    /// # Errors
    ///
    /// [`HostError::MissingContext`] when nothing of type `T` was provided.
    pub fn use_context<T: 'static>(&self) -> Result<Rc<T>> {
        self.root
            .host
            .context::<T>()
            .ok_or_else(HostError::missing_context::<T>)
    }

    fn check_mounting(&self, index: usize, expected: &'static str) -> Result<()> {
        if self.mounting {
            Ok(())
        } else {
            tracing::warn!(
                message = "host.hook_order",
                root = self.root.id,
                index,
                expected,
                found = "nothing"
            );
            Err(HostError::HookOrder { index, expected })
        }
    }

    fn order_error(&self, index: usize, expected: &'static str) -> HostError {
        tracing::warn!(
            message = "host.hook_order",
            root = self.root.id,
            index,
            expected,
            found = self.slots[index].kind()
        );
        HostError::HookOrder { index, expected }
    }
}

/// Handle to a [`Hooks::use_ref`] cell.
pub struct Ref<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Ref<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow())
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.cell.replace(value)
    }
}

impl<T: Clone> Ref<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.cell.borrow()).finish()
    }
}

/// Writer for a [`Hooks::use_state`] slot.
///
/// Every accepted write stores the value immediately and marks the root
/// dirty; the next render observes the latest write.
pub struct StateSetter<T> {
    cell: Rc<RefCell<T>>,
    root: Rc<RootState>,
    slot: usize,
}

impl<T> StateSetter<T> {
    /// Store `value` and schedule a re-render.
    ///
    /// Writes to an unmounted root are dropped. Writes while the owning root
    /// is rendering are still stored, so readers never diverge from the
    /// cell, and a [`HostError::ReentrantUpdate`] is deferred for the next
    /// [`Root::flush`](super::Root::flush) to report.
    pub fn set(&self, value: T) {
        let root = &self.root;
        if !root.alive.get() {
            root.host.note_dropped_update();
            tracing::debug!(
                message = "host.update_after_unmount",
                root = root.id,
                slot = self.slot
            );
            return;
        }
        if root.rendering.get() {
            tracing::warn!(
                message = "host.update_during_render",
                root = root.id,
                slot = self.slot
            );
            root.defer(HostError::ReentrantUpdate { slot: self.slot });
        }
        *self.cell.borrow_mut() = value;
        root.dirty.set(true);
        root.host.record(|s| s.state_updates += 1);
    }

    /// Whether the owning root is still mounted.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.root.alive.get()
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            root: Rc::clone(&self.root),
            slot: self.slot,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("root", &self.root.id)
            .field("slot", &self.slot)
            .finish()
    }
}
