mod checked;
mod direct;

pub use checked::CheckedOop;
pub use direct::DirectOop;

use klass::{Klass, OopKind};
use std::fmt;

/// The first word of every heap object. It carries locking and hashing state; this layer only
/// needs its prototype value.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MarkWord(usize);

impl MarkWord {
    const LOCK_MASK: usize = 0b11;
    const UNLOCKED: usize = 0b01;

    /// The mark of a freshly allocated object: unlocked, no hash.
    pub const fn prototype() -> Self {
        MarkWord(Self::UNLOCKED)
    }

    /// Reinterprets a raw word as a mark.
    pub const fn from_bits(bits: usize) -> Self {
        MarkWord(bits)
    }

    /// Returns the raw word.
    pub const fn bits(self) -> usize {
        self.0
    }

    /// Returns true if the lock bits say the object is not locked.
    pub const fn is_unlocked(self) -> bool {
        self.0 & Self::LOCK_MASK == Self::UNLOCKED
    }
}

/// The header shared by every heap object.
///
/// Every kind-specific object description starts with this header, which is what makes the
/// representation of a sub kind a byte-prefix extension of its super kind.
#[repr(C)]
#[derive(Debug)]
pub struct OopDesc {
    mark: MarkWord,
    klass: *const Klass,
}

impl OopDesc {
    /// Constructs the header of an object described by `klass`.
    pub fn new(klass: &Klass) -> Self {
        Self {
            mark: MarkWord::prototype(),
            klass,
        }
    }

    /// Returns the mark word.
    pub fn mark(&self) -> MarkWord {
        self.mark
    }

    /// Replaces the mark word.
    pub fn set_mark(&mut self, mark: MarkWord) {
        self.mark = mark;
    }

    /// Returns the raw descriptor pointer stored in the header.
    pub fn klass_ptr(&self) -> *const Klass {
        self.klass
    }

    /// Returns the descriptor of this object.
    ///
    /// # Safety
    ///
    /// The descriptor pointer must have been set from a live `Klass`, which holds for every header
    /// built through [`OopDesc::new`] as long as the descriptor outlives the object.
    pub unsafe fn klass(&self) -> &Klass {
        &*self.klass
    }
}

/// The operations shared by both representations of an object reference.
///
/// [`DirectOop`] and [`CheckedOop`] implement this trait with identical signatures, so code written
/// against the crate-wide [`crate::Oop`] alias compiles unchanged whichever representation the
/// build selects. Calls are statically dispatched.
///
/// Equality and ordering compare raw addresses only. The ordering is meaningful between two
/// collections at most: a relocating collection may reorder objects.
pub trait RawOop: Clone + Default + Eq + Ord + fmt::Debug + private::Sealed {
    /// Returns the null reference.
    fn null() -> Self;

    /// Constructs a reference from the address of an object.
    fn from_ptr(ptr: *const OopDesc) -> Self;

    /// Constructs a reference from the bit pattern of an address.
    fn from_bits(bits: usize) -> Self;

    /// Returns the address of the referenced object.
    fn obj(&self) -> *mut OopDesc;

    /// Returns the address of the referenced object as an integer.
    fn address(&self) -> usize {
        self.obj() as usize
    }

    /// Returns true if this is the null reference.
    fn is_null(&self) -> bool {
        self.obj().is_null()
    }

    /// Returns the header of the referenced object.
    ///
    /// # Safety
    ///
    /// The reference must be non-null and point at a live object that is not moved for as long as
    /// the returned reference is used.
    unsafe fn header(&self) -> &OopDesc {
        &*self.obj()
    }

    /// Returns the descriptor of the referenced object.
    ///
    /// # Safety
    ///
    /// See [`RawOop::header`].
    unsafe fn klass(&self) -> &Klass {
        self.header().klass()
    }

    /// Returns the kind of the referenced object.
    ///
    /// # Safety
    ///
    /// See [`RawOop::header`].
    unsafe fn kind(&self) -> OopKind {
        self.klass().oop_kind()
    }
}

mod private {
    pub trait Sealed {}

    impl Sealed for super::DirectOop {}
    impl Sealed for super::CheckedOop {}
}
