use crate::handle::HandleArea;
use rustc_hash::FxHashMap;
use std::{fmt, panic::Location};

/// Identifies one registration in an [`UnhandledOops`] registry.
///
/// Rust moves values by copying their bytes, so the stack address of a reference is not a stable
/// identity. Every registered reference gets a `SlotId` instead, unique for the lifetime of the
/// thread that issued it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SlotId(u64);

impl SlotId {
    pub(crate) fn new(id: u64) -> Self {
        SlotId(id)
    }
}

/// A single live reference known to the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnhandledOopEntry {
    slot: SlotId,
    obj: usize,
    origin: &'static Location<'static>,
    allowed: bool,
}

impl UnhandledOopEntry {
    /// Returns the registration this entry belongs to.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Returns the address held by the reference.
    pub fn address(&self) -> usize {
        self.obj
    }

    /// Returns the source location at which the reference was constructed.
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// Returns true if the reference was explicitly allowed to be unhandled.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

impl fmt::Display for UnhandledOopEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} created at {}", self.obj, self.origin)?;
        if self.allowed {
            write!(f, " (allowed)")?;
        }
        Ok(())
    }
}

/// Per-thread bookkeeping of every live, registered object reference.
///
/// The registry is owned by the thread's context and is never touched by any other thread, so
/// it performs no synchronization. The cardinality of the registry always equals the number of
/// live registered references on the thread.
#[derive(Default)]
pub struct UnhandledOops {
    entries: FxHashMap<SlotId, UnhandledOopEntry>,
}

impl UnhandledOops {
    /// Records a live reference to `obj` constructed at `origin`.
    pub(crate) fn register(&mut self, slot: SlotId, obj: usize, origin: &'static Location<'static>) {
        let previous = self.entries.insert(
            slot,
            UnhandledOopEntry {
                slot,
                obj,
                origin,
                allowed: false,
            },
        );
        debug_assert!(previous.is_none(), "slot {slot:?} registered twice");
    }

    /// Forgets the reference registered as `slot`. Returns false if it was not registered, which
    /// happens when the reference outlived an earlier attachment of the thread.
    pub(crate) fn unregister(&mut self, slot: SlotId) -> bool {
        self.entries.remove(&slot).is_some()
    }

    /// Exempts the reference registered as `slot` from verification.
    pub(crate) fn allow(&mut self, slot: SlotId) {
        if let Some(entry) = self.entries.get_mut(&slot) {
            entry.allowed = true;
        }
    }

    /// Returns the number of live registered references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no references are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `slot`.
    pub fn get(&self, slot: SlotId) -> Option<&UnhandledOopEntry> {
        self.entries.get(&slot)
    }

    /// Returns all entries in registration order.
    pub fn entries(&self) -> Vec<&UnhandledOopEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.slot);
        entries
    }

    /// Returns every registered reference that a moving collection would leave dangling: it is
    /// non-null, not allowed and its address is not held by any handle in `handles`.
    pub fn find_unhandled(&self, handles: &HandleArea) -> Vec<UnhandledOopEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| !entry.allowed && entry.obj != 0 && !handles.contains(entry.obj))
            .cloned()
            .collect()
    }

    /// Verifies that every registered reference is anchored by `handles`.
    ///
    /// Must only be called while the owning thread is parked at a safepoint.
    ///
    /// # Panics
    ///
    /// Panics if an unhandled reference is found. This is an internal consistency failure of the
    /// runtime and is never recoverable.
    pub fn verify(&self, thread_name: &str, handles: &HandleArea) {
        let unhandled = self.find_unhandled(handles);
        if unhandled.is_empty() {
            return;
        }

        for entry in &unhandled {
            log::error!("unhandled oop in thread '{thread_name}': {entry}");
        }
        let offenders = unhandled
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        panic!(
            "fatal: {} unhandled oop(s) live across a safepoint in thread '{thread_name}': {offenders}",
            unhandled.len()
        );
    }
}

impl fmt::Display for UnhandledOops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} unhandled oop(s)", self.len())?;
        for entry in self.entries() {
            writeln!(f, "  [{}] {entry}", entry.slot.0)?;
        }
        Ok(())
    }
}
