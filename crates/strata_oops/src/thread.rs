use crate::{
    flags,
    handle::HandleArea,
    unhandled::{SlotId, UnhandledOopEntry, UnhandledOops},
};
use std::{
    cell::{Cell, RefCell},
    marker::PhantomData,
    panic::Location,
};

/// The state a managed thread owns: its unhandled oop registry and its handle area.
pub(crate) struct ThreadContext {
    name: String,
    pub(crate) unhandled_oops: UnhandledOops,
    pub(crate) handles: HandleArea,
    at_safepoint: bool,
}

thread_local! {
    static CURRENT: RefCell<Option<ThreadContext>> = const { RefCell::new(None) };

    // Lives outside the context so ids stay unique across re-attachment.
    static NEXT_SLOT: Cell<u64> = const { Cell::new(0) };
}

/// Runs `f` on the context of the current thread, or returns `None` if the thread is not
/// attached (or is being torn down).
fn try_with_current<R>(f: impl FnOnce(&mut ThreadContext) -> R) -> Option<R> {
    CURRENT
        .try_with(|current| {
            let mut current = current.try_borrow_mut().ok()?;
            current.as_mut().map(f)
        })
        .ok()
        .flatten()
}

pub(crate) fn register_oop(obj: usize, origin: &'static Location<'static>) -> Option<SlotId> {
    if !flags::check_unhandled_oops() {
        return None;
    }
    try_with_current(|ctx| {
        let id = NEXT_SLOT.with(|next| next.replace(next.get() + 1));
        let slot = SlotId::new(id);
        ctx.unhandled_oops.register(slot, obj, origin);
        slot
    })
}

pub(crate) fn unregister_oop(slot: SlotId) {
    try_with_current(|ctx| ctx.unhandled_oops.unregister(slot));
}

pub(crate) fn allow_unhandled_oop(slot: SlotId) {
    try_with_current(|ctx| ctx.unhandled_oops.allow(slot));
}

/// An error that occurs when attaching a thread to the runtime.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum AttachError {
    /// The current thread already has a context
    #[error("thread is already attached as '{0}'")]
    AlreadyAttached(String),
}

/// Attaches the current OS thread to the runtime for as long as it lives.
///
/// Attaching creates the thread's unhandled oop registry and handle area; dropping the
/// `ManagedThread` tears both down. A `ManagedThread` cannot leave the thread it was created on.
pub struct ManagedThread {
    name: String,
    _not_send: PhantomData<*const ()>,
}

impl ManagedThread {
    /// Attaches the current thread under `name`.
    pub fn attach(name: impl Into<String>) -> Result<Self, AttachError> {
        let name = name.into();
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            if let Some(ctx) = current.as_ref() {
                return Err(AttachError::AlreadyAttached(ctx.name.clone()));
            }
            *current = Some(ThreadContext {
                name: name.clone(),
                unhandled_oops: UnhandledOops::default(),
                handles: HandleArea::default(),
                at_safepoint: false,
            });
            Ok(())
        })?;

        log::debug!("attached thread '{name}'");
        Ok(Self {
            name,
            _not_send: PhantomData,
        })
    }

    /// Returns true if the current thread is attached.
    pub fn is_attached() -> bool {
        try_with_current(|_| ()).is_some()
    }

    /// Returns true if the current thread is parked at a safepoint.
    pub fn is_at_safepoint() -> bool {
        try_with_current(|ctx| ctx.at_safepoint).unwrap_or(false)
    }

    /// Returns the name of the thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn with_context<R>(&self, f: impl FnOnce(&mut ThreadContext) -> R) -> R {
        try_with_current(f).expect("the context of an attached thread is always present")
    }

    /// Parks the thread at a cooperative safepoint and verifies that every live registered
    /// reference is anchored by a handle.
    ///
    /// # Panics
    ///
    /// Panics with a fatal diagnostic naming the offending source locations if an unhandled
    /// reference is found.
    pub fn safepoint_poll(&self) {
        self.with_context(|ctx| ctx.at_safepoint = true);
        let _resume = SafepointResume;
        self.with_context(|ctx| ctx.unhandled_oops.verify(&ctx.name, &ctx.handles));
    }

    /// Returns the number of live registered references on this thread.
    pub fn unhandled_oops_count(&self) -> usize {
        self.with_context(|ctx| ctx.unhandled_oops.len())
    }

    /// Returns a snapshot of the registry in registration order.
    pub fn unhandled_oops(&self) -> Vec<UnhandledOopEntry> {
        self.with_context(|ctx| {
            ctx.unhandled_oops
                .entries()
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Returns the registered references a moving collection would leave dangling right now.
    pub fn find_unhandled_oops(&self) -> Vec<UnhandledOopEntry> {
        self.with_context(|ctx| ctx.unhandled_oops.find_unhandled(&ctx.handles))
    }

    /// Points every handle of this thread that refers to `from` at `to`. Returns the number of
    /// updated handles.
    pub fn relocate_handles(&self, from: usize, to: usize) -> usize {
        self.with_context(|ctx| ctx.handles.relocate(from, to))
    }

    /// Returns the number of allocated handles.
    pub fn handle_count(&self) -> usize {
        self.with_context(|ctx| ctx.handles.len())
    }
}

/// Leaves the safepoint when dropped, also while unwinding from a failed verification.
struct SafepointResume;

impl Drop for SafepointResume {
    fn drop(&mut self) {
        try_with_current(|ctx| ctx.at_safepoint = false);
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        let ctx = CURRENT
            .try_with(|current| current.try_borrow_mut().ok().and_then(|mut c| c.take()))
            .ok()
            .flatten();

        if let Some(ctx) = ctx {
            if !ctx.unhandled_oops.is_empty() {
                log::warn!(
                    "thread '{}' detached with {} live registered oop(s)",
                    ctx.name,
                    ctx.unhandled_oops.len()
                );
                log::trace!("{}", ctx.unhandled_oops);
            }
        }
        log::debug!("detached thread '{}'", self.name);
    }
}
