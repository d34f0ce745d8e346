use crate::{thread::ManagedThread, Oop, RawOop};
use std::{cell::Cell, marker::PhantomData};

thread_local! {
    // Outlives any single attachment so a released handle never matches a newer slot.
    static NEXT_STAMP: Cell<u64> = const { Cell::new(0) };
}

/// One handle area entry: the anchored address and the stamp of the handle that owns it.
#[derive(Copy, Clone, Debug)]
struct Slot {
    address: usize,
    stamp: u64,
}

/// The per-thread storage behind [`Handle`]s.
///
/// Slots hold raw addresses rather than references so that they are not themselves subject to
/// unhandled oop checking. A moving collector updates these slots, which is what makes a handle a
/// safe way to keep an object reachable across a collection.
#[derive(Debug, Default)]
pub struct HandleArea {
    slots: Vec<Slot>,
}

impl HandleArea {
    /// Stores `address` in a new slot and returns its index and stamp.
    pub(crate) fn push(&mut self, address: usize) -> (usize, u64) {
        let stamp = NEXT_STAMP.with(|next| next.replace(next.get() + 1));
        self.slots.push(Slot { address, stamp });
        (self.slots.len() - 1, stamp)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    /// Returns the address stored at `index`.
    pub fn get(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(|slot| slot.address)
    }

    /// Returns the address stored at `index` if the slot still belongs to the handle stamped
    /// `stamp`.
    fn get_stamped(&self, index: usize, stamp: u64) -> Option<usize> {
        self.slots
            .get(index)
            .filter(|slot| slot.stamp == stamp)
            .map(|slot| slot.address)
    }

    /// Returns the number of allocated handles.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no handles are allocated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if some handle refers to `address`.
    pub fn contains(&self, address: usize) -> bool {
        self.slots.iter().any(|slot| slot.address == address)
    }

    /// Points every handle that refers to `from` at `to` instead. Returns the number of updated
    /// handles.
    pub fn relocate(&mut self, from: usize, to: usize) -> usize {
        let mut count = 0;
        for slot in self.slots.iter_mut().filter(|slot| slot.address == from) {
            slot.address = to;
            count += 1;
        }
        count
    }

    /// Returns an iterator over the addresses held by all handles.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|slot| slot.address)
    }
}

/// A reference to a heap object that stays valid across collections.
///
/// A `Handle` is an index into the handle area of the thread that created it. It is released
/// when the innermost enclosing [`HandleMark`] is dropped or the thread detaches. A released
/// handle resolves to nothing, even if a newer handle reuses its slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Handle {
    index: usize,
    stamp: u64,
    _not_send: PhantomData<*const ()>,
}

impl Handle {
    /// Anchors the object referenced by `oop` in the handle area of `thread`.
    pub fn new<R: RawOop>(thread: &ManagedThread, oop: &R) -> Self {
        let (index, stamp) = thread.with_context(|ctx| ctx.handles.push(oop.address()));
        Self {
            index,
            stamp,
            _not_send: PhantomData,
        }
    }

    /// Returns a fresh reference to the anchored object, reflecting any relocation since the
    /// handle was created. A released handle resolves to null.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the handle was released.
    #[track_caller]
    pub fn resolve(&self, thread: &ManagedThread) -> Oop {
        let address = self.address(thread);
        debug_assert!(address.is_some(), "handle {} was released", self.index);
        Oop::from_bits(address.unwrap_or_default())
    }

    /// Returns the raw address held by the handle without creating a reference, or `None` if the
    /// handle was released.
    pub fn address(&self, thread: &ManagedThread) -> Option<usize> {
        thread.with_context(|ctx| ctx.handles.get_stamped(self.index, self.stamp))
    }
}

/// Releases every handle created after it when dropped.
pub struct HandleMark<'t> {
    thread: &'t ManagedThread,
    len: usize,
}

impl<'t> HandleMark<'t> {
    /// Marks the current top of the handle area of `thread`.
    pub fn new(thread: &'t ManagedThread) -> Self {
        let len = thread.with_context(|ctx| ctx.handles.len());
        Self { thread, len }
    }
}

impl Drop for HandleMark<'_> {
    fn drop(&mut self) {
        let len = self.len;
        self.thread.with_context(|ctx| ctx.handles.truncate(len));
    }
}
