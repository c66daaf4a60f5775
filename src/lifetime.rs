//! Lifetime of native objects exposed through proxies.
//!
//! The heap holds one reference per owning proxy: the allocation's own
//! reference for an owned proxy, one more per shared proxy. Borrowed proxies
//! hold none and never destroy anything.
//!
//! ## Algorithm
//!
//! When the last clone of an owning proxy is dropped its reference is given
//! back to the heap:
//!
//! 1. Immediate mode: the reference is dropped on the spot. Dropping the last
//!    one runs the class destructor, then frees the slot.
//! 2. Light mode: the handle is queued. The queue is swept when it reaches the
//!    batch size, on `collect_garbage()`, when light mode is switched off, and
//!    at shutdown.
//!
//! Shutdown sweeps the queue and then destroys every object still live, so
//! each destructor runs exactly once per object.

use std::cell::{Cell, RefCell};

use bindery_core::{CallContext, Finalizer, ObjectHandle, ObjectRef, Ownership, Proxy};
use tracing::{debug, warn};

use crate::error::{BindError, Result};
use crate::runtime::State;

/// Counters reported by [`crate::Runtime::gc_statistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStatistics {
    /// Objects currently in the heap.
    pub live_objects: usize,
    /// Finalizations waiting for the next sweep.
    pub pending: usize,
    /// Destructor runs since the runtime was created.
    pub total_destroyed: u64,
}

/// Finalization queue and regime switch.
pub(crate) struct Collector {
    light: Cell<bool>,
    batch: usize,
    pending: RefCell<Vec<ObjectHandle>>,
    sweeping: Cell<bool>,
    destroyed: Cell<u64>,
}

impl Collector {
    pub(crate) fn new(light: bool, batch: usize) -> Self {
        Self {
            light: Cell::new(light),
            batch: batch.max(1),
            pending: RefCell::new(Vec::new()),
            sweeping: Cell::new(false),
            destroyed: Cell::new(0),
        }
    }

    pub(crate) fn is_light(&self) -> bool {
        self.light.get()
    }
}

impl Finalizer for State {
    fn finalize(&self, object: &ObjectRef) {
        if self.collector.is_light() {
            let queued = {
                let mut pending = self.collector.pending.borrow_mut();
                pending.push(object.handle);
                pending.len()
            };
            if queued >= self.collector.batch
                && let Err(err) = self.sweep()
            {
                warn!(error = %err, "destructor failed during sweep");
            }
        } else if let Err(err) = self.drop_reference(object.handle) {
            warn!(error = %err, "destructor failed during finalization");
        }
    }
}

impl State {
    /// New proxy for `object`, finalized through this state.
    pub(crate) fn new_proxy(&self, object: ObjectRef, ownership: Ownership) -> Proxy {
        let class_name = self.registry.type_name(object.view);
        let finalizer = match ownership {
            Ownership::Borrowed => None,
            _ => {
                let weak: std::rc::Weak<dyn Finalizer> = self.weak_self.clone();
                Some(weak)
            }
        };
        Proxy::new(object, ownership, class_name, finalizer)
    }

    /// The object behind `proxy`, if it may still be used.
    pub(crate) fn live_object(&self, proxy: &Proxy) -> Result<ObjectRef> {
        if proxy.is_released() || !self.heap.borrow().is_live(proxy.handle()) {
            return Err(BindError::UseAfterFree {
                class: proxy.class_name().to_string(),
            });
        }
        Ok(proxy.object().clone())
    }

    /// Give back one owning reference, destroying the object with the last.
    pub(crate) fn drop_reference(&self, handle: ObjectHandle) -> Result<()> {
        let count = self.heap.borrow().ref_count(handle);
        match count {
            None => Ok(()),
            Some(1) => self.destroy(handle),
            Some(_) => {
                self.heap.borrow_mut().release(handle);
                Ok(())
            }
        }
    }

    /// Run the destructor and free the slot, whatever the reference count.
    pub(crate) fn destroy(&self, handle: ObjectHandle) -> Result<()> {
        let Some(type_hash) = self.heap.borrow().type_of(handle) else {
            return Ok(());
        };
        let class = self.registry.type_name(type_hash);

        let result = match self.registry.class(type_hash).and_then(|c| c.destructor.as_ref()) {
            Some(destructor) => {
                let this = ObjectRef::new(handle, type_hash);
                CallContext::new(&self.heap, Some(this), Vec::new())
                    .and_then(|mut ctx| destructor.call(&mut ctx))
            }
            None => Ok(()),
        };

        // the destructor may have re-entered and destroyed it already
        let cell = self.heap.borrow_mut().free(handle);
        if cell.is_some() {
            self.collector.destroyed.set(self.collector.destroyed.get() + 1);
            debug!(class = %class, handle = handle.index, "destroyed object");
        }
        drop(cell);

        result.map_err(|err| BindError::from_native(&format!("~{}", class), err))
    }

    /// Drain the finalization queue. Returns the first destructor error.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn sweep(&self) -> Result<()> {
        if self.collector.sweeping.replace(true) {
            return Ok(());
        }
        let mut first_error = None;
        loop {
            let batch = std::mem::take(&mut *self.collector.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            debug!(count = batch.len(), "sweeping finalization queue");
            for handle in batch {
                if let Err(err) = self.drop_reference(handle) {
                    warn!(error = %err, "destructor failed during sweep");
                    first_error.get_or_insert(err);
                }
            }
        }
        self.collector.sweeping.set(false);
        first_error.map_or(Ok(()), Err)
    }

    pub(crate) fn set_light_gc(&self, enabled: bool) -> Result<()> {
        let was = self.collector.light.replace(enabled);
        debug!(enabled, "light gc toggled");
        if was && !enabled {
            self.sweep()
        } else {
            Ok(())
        }
    }

    pub(crate) fn gc_statistics(&self) -> GcStatistics {
        GcStatistics {
            live_objects: self.heap.borrow().live_count(),
            pending: self.collector.pending.borrow().len(),
            total_destroyed: self.collector.destroyed.get(),
        }
    }

    /// Explicitly end `proxy`'s hold on its object.
    ///
    /// An owned object is destroyed now, a shared one loses this reference and
    /// a borrowed proxy simply stops being usable.
    ///
    /// A release that would destroy an object a native frame is still using
    /// fails with [`BindError::Native`] and leaves the proxy alive.
    pub(crate) fn release(&self, proxy: &Proxy) -> Result<()> {
        self.live_object(proxy)?;
        let destroys = match proxy.ownership() {
            Ownership::Borrowed => false,
            Ownership::Shared => self.heap.borrow().ref_count(proxy.handle()) == Some(1),
            Ownership::Owned => true,
        };
        if destroys && self.in_use(proxy.handle()) {
            return Err(BindError::Native {
                function: "release".into(),
                message: format!("{} object is in use by a native call", proxy.class_name()),
            });
        }
        proxy.mark_released();
        match proxy.ownership() {
            Ownership::Borrowed => Ok(()),
            Ownership::Shared => self.drop_reference(proxy.handle()),
            Ownership::Owned => self.destroy(proxy.handle()),
        }
    }

    fn in_use(&self, handle: ObjectHandle) -> bool {
        let cell = self.heap.borrow().get(handle);
        cell.is_some_and(|cell| cell.try_borrow_mut().is_err())
    }

    /// Move `proxy`'s hold on its object to a fresh proxy.
    pub(crate) fn transfer(&self, proxy: &Proxy) -> Result<Proxy> {
        let object = self.live_object(proxy)?;
        let moved = self.new_proxy(object, proxy.ownership());
        proxy.mark_released();
        Ok(moved)
    }

    /// Destroy everything still alive. Errors are logged, not returned.
    pub(crate) fn shutdown(&self) {
        if let Err(err) = self.sweep() {
            warn!(error = %err, "destructor failed during shutdown sweep");
        }
        let live = self.heap.borrow().live_handles();
        if !live.is_empty() {
            debug!(count = live.len(), "destroying objects live at shutdown");
        }
        for handle in live {
            if let Err(err) = self.destroy(handle) {
                warn!(error = %err, "destructor failed during shutdown");
            }
        }
    }
}
