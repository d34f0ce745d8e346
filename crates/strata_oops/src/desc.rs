//! Kind-specific views of heap objects.
//!
//! Every struct here is `#[repr(C)]` and starts with the struct of its super kind, so a pointer to
//! an object can be reinterpreted as a pointer to any of its super kinds' descriptions. `Deref`
//! mirrors that prefix relation. Only the fields this layer needs are described; the rest of an
//! object's layout belongs to the heap.

use crate::oop::OopDesc;
use std::ops::Deref;

macro_rules! header_only_desc {
    ($($(#[$attr:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$attr])*
            #[repr(C)]
            #[derive(Debug)]
            pub struct $name {
                header: OopDesc,
            }

            impl $name {
                /// Constructs an object description with the given header.
                pub fn new(header: OopDesc) -> Self {
                    Self { header }
                }
            }

            impl Deref for $name {
                type Target = OopDesc;

                fn deref(&self) -> &OopDesc {
                    &self.header
                }
            }
        )+
    };
}

header_only_desc!(
    /// A class instance
    InstanceOopDesc,
    /// A method
    MethodOopDesc,
    /// The read-only part of a method
    ConstMethodOopDesc,
    /// Profiling data of a method
    MethodDataOopDesc,
    /// A constant pool
    ConstantPoolOopDesc,
    /// The resolved-entry cache of a constant pool
    ConstantPoolCacheOopDesc,
    /// A type descriptor living in the heap
    KlassOopDesc,
    /// A holder of compiled inline cache data
    CompiledICHolderOopDesc,
);

/// Any array. The element storage follows the length.
#[repr(C)]
#[derive(Debug)]
pub struct ArrayOopDesc {
    header: OopDesc,
    length: u32,
}

impl ArrayOopDesc {
    /// Constructs the fixed part of an array with `length` elements.
    pub fn new(header: OopDesc, length: u32) -> Self {
        Self { header, length }
    }

    /// Returns the number of elements.
    pub fn length(&self) -> u32 {
        self.length
    }
}

impl Deref for ArrayOopDesc {
    type Target = OopDesc;

    fn deref(&self) -> &OopDesc {
        &self.header
    }
}

macro_rules! array_desc {
    ($($(#[$attr:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$attr])*
            #[repr(C)]
            #[derive(Debug)]
            pub struct $name {
                array: ArrayOopDesc,
            }

            impl $name {
                /// Constructs the fixed part of an array with the given header and length.
                pub fn new(header: OopDesc, length: u32) -> Self {
                    Self {
                        array: ArrayOopDesc::new(header, length),
                    }
                }
            }

            impl Deref for $name {
                type Target = ArrayOopDesc;

                fn deref(&self) -> &ArrayOopDesc {
                    &self.array
                }
            }
        )+
    };
}

array_desc!(
    /// An array of references
    ObjArrayOopDesc,
    /// An array of primitive values
    TypeArrayOopDesc,
);

#[cfg(test)]
mod tests {
    use super::{ArrayOopDesc, InstanceOopDesc, ObjArrayOopDesc};
    use crate::oop::OopDesc;
    use klass::{Klass, KlassKind};
    use std::mem::size_of;

    #[test]
    fn sub_kinds_start_with_their_super_kind() {
        let klass = Klass::new("[Object", KlassKind::ObjArray, 24);
        let array = ObjArrayOopDesc::new(OopDesc::new(&klass), 3);

        let base = std::ptr::addr_of!(array).cast::<u8>();
        let as_array: &ArrayOopDesc = &array;
        let as_oop: &OopDesc = as_array;
        assert_eq!(std::ptr::addr_of!(*as_array).cast::<u8>(), base);
        assert_eq!(std::ptr::addr_of!(*as_oop).cast::<u8>(), base);
        assert_eq!(array.length(), 3);
        assert!(std::ptr::eq(array.klass_ptr(), &klass));
    }

    #[test]
    fn header_only_kinds_add_nothing() {
        assert_eq!(size_of::<InstanceOopDesc>(), size_of::<OopDesc>());
        assert!(size_of::<ObjArrayOopDesc>() >= size_of::<OopDesc>() + size_of::<u32>());
    }
}
