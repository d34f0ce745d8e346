//! Kind tags and type descriptors for objects in the Strata heap.
//!
//! Two hierarchies live here and they are deliberately kept apart:
//!
//! * [`OopKind`] tags the *reference* family. Every heap object has exactly one `OopKind` and a
//!   reference to it can be narrowed to the matching typed reference.
//! * [`KlassKind`] tags the *descriptor* classes. A [`Klass`] describes the layout and behavior
//!   of all objects of one kind, and every object header points at its `Klass`.
#![warn(missing_docs)]

mod klass;

pub use klass::{Klass, KlassKind};

/// The kind of a heap object as seen through a typed reference.
///
/// The kinds form a lattice rooted at [`OopKind::Oop`]. A kind's representation is a byte-prefix
/// extension of its super kind's representation, so a reference of a sub kind can always be used
/// where a reference of its super kind is expected.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OopKind {
    /// Any heap object
    Oop,
    /// An instance of a class
    Instance,
    /// A method
    Method,
    /// The read-only part of a method (bytecodes, tables)
    ConstMethod,
    /// Profiling data gathered for a method
    MethodData,
    /// Any array
    Array,
    /// An array of references
    ObjArray,
    /// An array of primitive values
    TypeArray,
    /// A constant pool
    ConstantPool,
    /// The resolved-entry cache of a constant pool
    ConstantPoolCache,
    /// A type descriptor living in the heap
    Klass,
    /// A holder for compiled inline cache data
    CompiledICHolder,
}

impl OopKind {
    /// Every member of the family, supertypes before their subtypes.
    pub const ALL: [OopKind; 12] = [
        OopKind::Oop,
        OopKind::Instance,
        OopKind::Method,
        OopKind::ConstMethod,
        OopKind::MethodData,
        OopKind::Array,
        OopKind::ObjArray,
        OopKind::TypeArray,
        OopKind::ConstantPool,
        OopKind::ConstantPoolCache,
        OopKind::Klass,
        OopKind::CompiledICHolder,
    ];

    /// Returns the direct super kind, or `None` for the root of the lattice.
    pub const fn super_kind(self) -> Option<OopKind> {
        match self {
            OopKind::Oop => None,
            OopKind::ObjArray | OopKind::TypeArray => Some(OopKind::Array),
            _ => Some(OopKind::Oop),
        }
    }

    /// Returns true if `self` is `other` or one of its (transitive) subkinds.
    pub fn is_subkind_of(self, other: OopKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.super_kind();
        }
        false
    }

    /// Returns the name used for this kind in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            OopKind::Oop => "oop",
            OopKind::Instance => "instanceOop",
            OopKind::Method => "methodOop",
            OopKind::ConstMethod => "constMethodOop",
            OopKind::MethodData => "methodDataOop",
            OopKind::Array => "arrayOop",
            OopKind::ObjArray => "objArrayOop",
            OopKind::TypeArray => "typeArrayOop",
            OopKind::ConstantPool => "constantPoolOop",
            OopKind::ConstantPoolCache => "constantPoolCacheOop",
            OopKind::Klass => "klassOop",
            OopKind::CompiledICHolder => "compiledICHolderOop",
        }
    }
}

impl std::fmt::Display for OopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
