use crate::{Oop, RawOop};
use klass::OopKind;
use std::{cmp::Ordering, fmt, marker::PhantomData, ops::Deref};

/// A zero-sized tag naming one member of the reference family.
pub trait OopKindMarker: 'static {
    /// The kind tag in the descriptor catalog.
    const KIND: OopKind;

    /// The description of objects of this kind.
    type Desc;
}

/// An object reference narrowed to objects of kind `K`.
///
/// A `TypedOop` has exactly the representation of [`Oop`] and derefs to it, so it can be used
/// wherever an untyped reference is expected without any conversion. Equality and ordering are
/// those of the underlying reference.
#[repr(transparent)]
pub struct TypedOop<K: OopKindMarker> {
    oop: Oop,
    kind: PhantomData<fn() -> K>,
}

impl<K: OopKindMarker> TypedOop<K> {
    /// Returns the null reference.
    pub fn null() -> Self {
        Self {
            oop: Oop::null(),
            kind: PhantomData,
        }
    }

    /// Narrows `oop` to kind `K`. The kind is only verified in debug builds.
    ///
    /// # Safety
    ///
    /// `oop` must be null or point at a live object whose kind is `K` or one of its sub kinds.
    #[track_caller]
    pub unsafe fn from_oop(oop: Oop) -> Self {
        debug_assert!(
            oop.is_null() || oop.kind().is_subkind_of(K::KIND),
            "{oop:?} refers to a {}, not a {}",
            oop.kind(),
            K::KIND
        );
        Self {
            oop,
            kind: PhantomData,
        }
    }

    /// Returns the kind of this reference.
    pub const fn kind(&self) -> OopKind {
        K::KIND
    }

    /// Returns the untyped reference.
    pub fn as_oop(&self) -> &Oop {
        &self.oop
    }

    /// Converts into the untyped reference.
    pub fn into_oop(self) -> Oop {
        self.oop
    }

    /// Converts into a reference of the super kind `S`.
    ///
    /// # Panics
    ///
    /// Panics if `S` is not a super kind of `K`.
    pub fn widen<S: OopKindMarker>(self) -> TypedOop<S> {
        assert!(
            K::KIND.is_subkind_of(S::KIND),
            "{} is not a super kind of {}",
            S::KIND,
            K::KIND
        );
        TypedOop {
            oop: self.oop,
            kind: PhantomData,
        }
    }

    /// Returns the address of the referenced object as a pointer to its description.
    pub fn desc(&self) -> *mut K::Desc {
        self.oop.obj().cast()
    }

    /// Returns the description of the referenced object.
    ///
    /// # Safety
    ///
    /// The reference must be non-null and point at a live object of kind `K` that is not moved
    /// for as long as the returned reference is used.
    pub unsafe fn as_desc(&self) -> &K::Desc {
        &*self.desc()
    }
}

impl<K: OopKindMarker> Deref for TypedOop<K> {
    type Target = Oop;

    fn deref(&self) -> &Oop {
        &self.oop
    }
}

#[cfg(feature = "check-unhandled-oops")]
impl<K: OopKindMarker> Clone for TypedOop<K> {
    #[track_caller]
    fn clone(&self) -> Self {
        Self {
            oop: self.oop.clone(),
            kind: PhantomData,
        }
    }
}

#[cfg(not(feature = "check-unhandled-oops"))]
impl<K: OopKindMarker> Clone for TypedOop<K> {
    fn clone(&self) -> Self {
        *self
    }
}

#[cfg(not(feature = "check-unhandled-oops"))]
impl<K: OopKindMarker> Copy for TypedOop<K> {}

impl<K: OopKindMarker> Default for TypedOop<K> {
    fn default() -> Self {
        Self::null()
    }
}

impl<K: OopKindMarker> PartialEq for TypedOop<K> {
    fn eq(&self, other: &Self) -> bool {
        self.oop == other.oop
    }
}

impl<K: OopKindMarker> Eq for TypedOop<K> {}

impl<K: OopKindMarker> PartialOrd for TypedOop<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: OopKindMarker> Ord for TypedOop<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.oop.cmp(&other.oop)
    }
}

impl<K: OopKindMarker> fmt::Debug for TypedOop<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", K::KIND, self.oop.address())
    }
}

impl<K: OopKindMarker> From<TypedOop<K>> for Oop {
    fn from(oop: TypedOop<K>) -> Self {
        oop.oop
    }
}

/// The members of the reference family.
pub mod kinds {
    use super::OopKindMarker;
    use crate::desc;
    use klass::OopKind;

    macro_rules! def_oop_kind {
        ($($(#[$attr:meta])* $marker:ident => $kind:ident, $desc:ident;)+) => {
            $(
                $(#[$attr])*
                #[derive(Copy, Clone, Debug, Eq, PartialEq)]
                pub struct $marker;

                impl OopKindMarker for $marker {
                    const KIND: OopKind = OopKind::$kind;
                    type Desc = desc::$desc;
                }
            )+
        };
    }

    def_oop_kind! {
        /// Class instances
        Instance => Instance, InstanceOopDesc;
        /// Methods
        Method => Method, MethodOopDesc;
        /// The read-only parts of methods
        ConstMethod => ConstMethod, ConstMethodOopDesc;
        /// Method profiling data
        MethodData => MethodData, MethodDataOopDesc;
        /// Arrays of any element type
        Array => Array, ArrayOopDesc;
        /// Arrays of references
        ObjArray => ObjArray, ObjArrayOopDesc;
        /// Arrays of primitive values
        TypeArray => TypeArray, TypeArrayOopDesc;
        /// Constant pools
        ConstantPool => ConstantPool, ConstantPoolOopDesc;
        /// Constant pool caches
        ConstantPoolCache => ConstantPoolCache, ConstantPoolCacheOopDesc;
        /// Type descriptors living in the heap
        Klass => Klass, KlassOopDesc;
        /// Compiled inline cache holders
        CompiledICHolder => CompiledICHolder, CompiledICHolderOopDesc;
    }
}

/// A reference to a class instance.
pub type InstanceOop = TypedOop<kinds::Instance>;
/// A reference to a method.
pub type MethodOop = TypedOop<kinds::Method>;
/// A reference to the read-only part of a method.
pub type ConstMethodOop = TypedOop<kinds::ConstMethod>;
/// A reference to method profiling data.
pub type MethodDataOop = TypedOop<kinds::MethodData>;
/// A reference to an array of any element type.
pub type ArrayOop = TypedOop<kinds::Array>;
/// A reference to an array of references.
pub type ObjArrayOop = TypedOop<kinds::ObjArray>;
/// A reference to an array of primitive values.
pub type TypeArrayOop = TypedOop<kinds::TypeArray>;
/// A reference to a constant pool.
pub type ConstantPoolOop = TypedOop<kinds::ConstantPool>;
/// A reference to a constant pool cache.
pub type ConstantPoolCacheOop = TypedOop<kinds::ConstantPoolCache>;
/// A reference to a type descriptor living in the heap.
pub type KlassOop = TypedOop<kinds::Klass>;
/// A reference to a compiled inline cache holder.
pub type CompiledICHolderOop = TypedOop<kinds::CompiledICHolder>;

impl ArrayOop {
    /// Returns the number of elements of the referenced array.
    ///
    /// # Safety
    ///
    /// See [`TypedOop::as_desc`].
    pub unsafe fn length(&self) -> u32 {
        self.as_desc().length()
    }
}

impl ObjArrayOop {
    /// Returns the number of elements of the referenced array.
    ///
    /// # Safety
    ///
    /// See [`TypedOop::as_desc`].
    pub unsafe fn length(&self) -> u32 {
        self.as_desc().length()
    }
}

impl TypeArrayOop {
    /// Returns the number of elements of the referenced array.
    ///
    /// # Safety
    ///
    /// See [`TypedOop::as_desc`].
    pub unsafe fn length(&self) -> u32 {
        self.as_desc().length()
    }
}
