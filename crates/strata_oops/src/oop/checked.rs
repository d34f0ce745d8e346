use super::{OopDesc, RawOop};
use crate::{thread, unhandled::SlotId};
use std::{cmp::Ordering, fmt, panic::Location};

/// An object reference that registers itself with the current thread's unhandled oop registry.
///
/// Every construction, including [`Clone::clone`], records the address together with the caller's
/// source location, and dropping the reference removes that record again. At a safepoint the
/// registry is compared against the thread's handle area; a non-null reference that is neither
/// reachable through a handle nor explicitly allowed would be left dangling by a moving collection
/// and is reported as a fatal error.
///
/// Registration only happens while [`crate::check_unhandled_oops`] is enabled and the current
/// thread is attached. Null references are never registered.
pub struct CheckedOop {
    obj: *mut OopDesc,
    slot: Option<SlotId>,
}

impl CheckedOop {
    #[track_caller]
    fn with_obj(obj: *mut OopDesc) -> Self {
        let slot = if obj.is_null() {
            None
        } else {
            thread::register_oop(obj as usize, Location::caller())
        };
        Self { obj, slot }
    }

    /// Returns the registration of this reference, if it has one.
    pub fn registration(&self) -> Option<SlotId> {
        self.slot
    }

    /// Tells the verifier that this particular reference is known not to be live across a
    /// collection.
    pub fn allow_unhandled(&self) {
        if let Some(slot) = self.slot {
            thread::allow_unhandled_oop(slot);
        }
    }
}

impl RawOop for CheckedOop {
    fn null() -> Self {
        Self {
            obj: std::ptr::null_mut(),
            slot: None,
        }
    }

    #[track_caller]
    fn from_ptr(ptr: *const OopDesc) -> Self {
        Self::with_obj(ptr.cast_mut())
    }

    #[track_caller]
    fn from_bits(bits: usize) -> Self {
        Self::with_obj(bits as *mut OopDesc)
    }

    fn obj(&self) -> *mut OopDesc {
        self.obj
    }
}

impl Clone for CheckedOop {
    #[track_caller]
    fn clone(&self) -> Self {
        Self::with_obj(self.obj)
    }
}

impl Drop for CheckedOop {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            thread::unregister_oop(slot);
        }
    }
}

impl Default for CheckedOop {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for CheckedOop {
    fn eq(&self, other: &Self) -> bool {
        self.obj == other.obj
    }
}

impl Eq for CheckedOop {}

impl PartialOrd for CheckedOop {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CheckedOop {
    fn cmp(&self, other: &Self) -> Ordering {
        self.obj.cmp(&other.obj)
    }
}

impl fmt::Debug for CheckedOop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CheckedOop({:#x})", self.address())
    }
}

impl From<*mut OopDesc> for CheckedOop {
    #[track_caller]
    fn from(ptr: *mut OopDesc) -> Self {
        Self::with_obj(ptr)
    }
}

impl From<CheckedOop> for *mut OopDesc {
    fn from(oop: CheckedOop) -> Self {
        oop.obj
    }
}

impl From<&CheckedOop> for *mut OopDesc {
    fn from(oop: &CheckedOop) -> Self {
        oop.obj
    }
}
