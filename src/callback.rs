//! Dynamic functions handed to native code as callbacks.
//!
//! Every dispatch opens a frame. A callback created for one of its arguments
//! belongs to that frame and expires when the frame closes, unless the
//! parameter was declared retained. An error raised by the dynamic function
//! is recorded on the frame and the dispatch fails with it once native code
//! returns, whatever native code did with the failure it saw.
//!
//! A retained callback may run when no dispatch is active, for instance from
//! a destructor during finalization. Its error cannot propagate there, so it
//! is deferred and surfaced by the next dispatch or `collect_garbage()`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use bindery_core::{
    CallbackHandle, CallbackSignature, CallbackTarget, ConversionPolicy, DynFunction, Native,
    NativeError,
};
use tracing::debug;

use crate::convert::{to_dynamic, to_native};
use crate::error::BindError;
use crate::runtime::State;

pub(crate) type FrameId = u64;

struct Frame {
    id: FrameId,
    error: Option<String>,
}

/// Stack of native frames plus errors waiting for the next boundary.
#[derive(Default)]
pub(crate) struct CallbackScope {
    next_id: Cell<FrameId>,
    frames: RefCell<Vec<Frame>>,
    deferred: RefCell<Vec<String>>,
}

impl CallbackScope {
    pub(crate) fn enter(&self) -> FrameGuard<'_> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.frames.borrow_mut().push(Frame { id, error: None });
        FrameGuard {
            scope: self,
            id,
            closed: false,
        }
    }

    fn close(&self, id: FrameId) -> Option<String> {
        let mut frames = self.frames.borrow_mut();
        let position = frames.iter().rposition(|frame| frame.id == id)?;
        // frames above this one were left by unwinding
        frames.drain(position..).next().and_then(|frame| frame.error)
    }

    pub(crate) fn current(&self) -> Option<FrameId> {
        self.frames.borrow().last().map(|frame| frame.id)
    }

    fn is_active(&self, id: FrameId) -> bool {
        self.frames.borrow().iter().any(|frame| frame.id == id)
    }

    /// Record an error raised by a callback created in `origin`.
    fn raise(&self, origin: Option<FrameId>, message: String) {
        let mut frames = self.frames.borrow_mut();
        let frame = match origin {
            Some(id) => frames.iter_mut().rev().find(|frame| frame.id == id),
            None => frames.last_mut(),
        };
        match frame {
            Some(frame) => {
                frame.error.get_or_insert(message);
            }
            None => {
                debug!(message = %message, "deferring callback error");
                self.deferred.borrow_mut().push(message);
            }
        }
    }

    /// Oldest deferred error, if any.
    pub(crate) fn take_deferred(&self) -> Option<BindError> {
        let mut deferred = self.deferred.borrow_mut();
        if deferred.is_empty() {
            None
        } else {
            Some(BindError::Callback {
                message: deferred.remove(0),
            })
        }
    }
}

/// An open frame; closing it yields the first callback error raised in it.
pub(crate) struct FrameGuard<'s> {
    scope: &'s CallbackScope,
    id: FrameId,
    closed: bool,
}

impl FrameGuard<'_> {
    pub(crate) fn finish(mut self) -> Result<(), BindError> {
        self.closed = true;
        match self.scope.close(self.id) {
            Some(message) => Err(BindError::Callback { message }),
            None => Ok(()),
        }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.scope.close(self.id);
        }
    }
}

/// Native-side view of a dynamic function.
struct DynCallback {
    state: Weak<State>,
    function: DynFunction,
    signature: CallbackSignature,
    /// Owning frame; `None` for retained callbacks.
    frame: Option<FrameId>,
}

impl DynCallback {
    fn run(&self, state: &State, args: Vec<Native>) -> Result<Native, String> {
        let values = args
            .into_iter()
            .zip(&self.signature.params)
            .map(|(arg, spec)| to_dynamic(state, arg, spec))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;

        let result = (self.function)(&values).map_err(|err| err.message)?;

        let ret = &self.signature.ret;
        let policy = ret.policy.or(self.signature.policy).unwrap_or(ConversionPolicy::Loose);
        to_native(state, &result, ret, policy).map_err(|err| err.to_string())
    }
}

impl CallbackTarget for DynCallback {
    fn invoke(&self, args: Vec<Native>) -> Result<Native, NativeError> {
        let state = self.state.upgrade().ok_or(NativeError::CallbackExpired)?;
        if let Some(frame) = self.frame
            && !state.callbacks.is_active(frame)
        {
            return Err(NativeError::CallbackExpired);
        }
        if args.len() != self.signature.params.len() {
            return Err(NativeError::other(format!(
                "callback takes {} arguments, got {}",
                self.signature.params.len(),
                args.len()
            )));
        }

        self.run(&state, args).map_err(|message| {
            state.callbacks.raise(self.frame, message.clone());
            NativeError::CallbackRaised { message }
        })
    }
}

impl State {
    /// Handle for `function` bound to the current frame, or to no frame when
    /// `retained`.
    pub(crate) fn callback_handle(
        &self,
        function: DynFunction,
        signature: &CallbackSignature,
        retained: bool,
    ) -> CallbackHandle {
        let frame = if retained { None } else { self.callbacks.current() };
        CallbackHandle::new(Rc::new(DynCallback {
            state: self.weak_self.clone(),
            function,
            signature: signature.clone(),
            frame,
        }))
    }
}
