use super::{OopDesc, RawOop};
use std::fmt;

/// An object reference that is nothing more than the object's address.
///
/// This is the representation used by performance builds: it is `Copy`, has the size of a
/// pointer and performs no bookkeeping at all.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct DirectOop(*mut OopDesc);

impl DirectOop {
    /// The null reference.
    pub const NULL: DirectOop = DirectOop(std::ptr::null_mut());
}

impl RawOop for DirectOop {
    fn null() -> Self {
        Self::NULL
    }

    fn from_ptr(ptr: *const OopDesc) -> Self {
        DirectOop(ptr.cast_mut())
    }

    fn from_bits(bits: usize) -> Self {
        DirectOop(bits as *mut OopDesc)
    }

    fn obj(&self) -> *mut OopDesc {
        self.0
    }
}

impl Default for DirectOop {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for DirectOop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectOop({:#x})", self.address())
    }
}

impl From<*mut OopDesc> for DirectOop {
    fn from(ptr: *mut OopDesc) -> Self {
        DirectOop(ptr)
    }
}

impl From<DirectOop> for *mut OopDesc {
    fn from(oop: DirectOop) -> Self {
        oop.0
    }
}

impl From<&DirectOop> for *mut OopDesc {
    fn from(oop: &DirectOop) -> Self {
        oop.0
    }
}

#[cfg(test)]
mod tests {
    use super::DirectOop;
    use crate::RawOop;

    #[test]
    fn pointer_sized() {
        assert_eq!(
            std::mem::size_of::<DirectOop>(),
            std::mem::size_of::<usize>()
        );
    }

    #[test]
    fn default_is_null() {
        let oop = DirectOop::default();
        assert!(oop.is_null());
        assert_eq!(oop, DirectOop::NULL);
        assert_eq!(oop.address(), 0);
    }

    #[test]
    fn compares_by_address() {
        let low = DirectOop::from_bits(0x1000);
        let high = DirectOop::from_bits(0x2000);
        assert!(low < high);
        assert_eq!(low, DirectOop::from_bits(0x1000));
        assert_eq!(format!("{low:?}"), "DirectOop(0x1000)");
    }
}
