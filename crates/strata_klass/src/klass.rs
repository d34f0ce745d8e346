use crate::OopKind;
use smol_str::SmolStr;

/// The class of a type descriptor.
///
/// This hierarchy is separate from the [`OopKind`] hierarchy: it classifies descriptors, not the
/// references to the objects they describe. [`KlassKind::oop_kind`] maps one onto the other.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KlassKind {
    /// Describes ordinary class instances
    Instance,
    /// Describes the mirror objects that represent classes at runtime
    InstanceMirror,
    /// Describes the subclasses of the runtime's reference types
    InstanceRef,
    /// Describes methods
    Method,
    /// Describes the read-only part of methods
    ConstMethod,
    /// Describes method profiling data
    MethodData,
    /// Describes descriptors; the end of the descriptor chain
    KlassKlass,
    /// Describes instance descriptors
    InstanceKlassKlass,
    /// Describes array descriptors
    ArrayKlassKlass,
    /// Describes reference-array descriptors
    ObjArrayKlassKlass,
    /// Describes primitive-array descriptors
    TypeArrayKlassKlass,
    /// Describes arrays in general; never instantiated directly
    Array,
    /// Describes arrays of references
    ObjArray,
    /// Describes arrays of primitive values
    TypeArray,
    /// Describes constant pools
    ConstantPool,
    /// Describes constant pool caches
    ConstantPoolCache,
    /// Describes compiled inline cache holders
    CompiledICHolder,
}

impl KlassKind {
    /// Returns the direct super class of this descriptor class, or `None` if it derives directly
    /// from the descriptor base.
    pub const fn super_kind(self) -> Option<KlassKind> {
        match self {
            KlassKind::InstanceMirror | KlassKind::InstanceRef => Some(KlassKind::Instance),
            KlassKind::InstanceKlassKlass | KlassKind::ArrayKlassKlass => {
                Some(KlassKind::KlassKlass)
            }
            KlassKind::ObjArrayKlassKlass | KlassKind::TypeArrayKlassKlass => {
                Some(KlassKind::ArrayKlassKlass)
            }
            KlassKind::ObjArray | KlassKind::TypeArray => Some(KlassKind::Array),
            _ => None,
        }
    }

    /// Returns true if `self` is `other` or one of its (transitive) subclasses.
    pub fn is_subkind_of(self, other: KlassKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.super_kind();
        }
        false
    }

    /// Returns the kind of the objects described by descriptors of this class.
    pub const fn oop_kind(self) -> OopKind {
        match self {
            KlassKind::Instance | KlassKind::InstanceMirror | KlassKind::InstanceRef => {
                OopKind::Instance
            }
            KlassKind::Method => OopKind::Method,
            KlassKind::ConstMethod => OopKind::ConstMethod,
            KlassKind::MethodData => OopKind::MethodData,
            KlassKind::KlassKlass
            | KlassKind::InstanceKlassKlass
            | KlassKind::ArrayKlassKlass
            | KlassKind::ObjArrayKlassKlass
            | KlassKind::TypeArrayKlassKlass => OopKind::Klass,
            KlassKind::Array => OopKind::Array,
            KlassKind::ObjArray => OopKind::ObjArray,
            KlassKind::TypeArray => OopKind::TypeArray,
            KlassKind::ConstantPool => OopKind::ConstantPool,
            KlassKind::ConstantPoolCache => OopKind::ConstantPoolCache,
            KlassKind::CompiledICHolder => OopKind::CompiledICHolder,
        }
    }
}

/// An immutable description of the structural kind of a heap object.
///
/// A single `Klass` is shared by every object of its kind; object headers store a pointer to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Klass {
    name: SmolStr,
    kind: KlassKind,
    instance_size: usize,
}

impl Klass {
    /// Constructs a descriptor named `name` whose objects occupy `instance_size` bytes, header
    /// included. Arrays report the size of their fixed part.
    pub fn new(name: impl Into<SmolStr>, kind: KlassKind, instance_size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            instance_size,
        }
    }

    /// Returns the name of the described type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the class of this descriptor.
    pub fn kind(&self) -> KlassKind {
        self.kind
    }

    /// Returns the kind of the objects this descriptor describes.
    pub fn oop_kind(&self) -> OopKind {
        self.kind.oop_kind()
    }

    /// Returns the size in bytes of an object described by this descriptor.
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }
}

impl std::fmt::Display for Klass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{Klass, KlassKind};
    use crate::OopKind;

    #[test]
    fn klass_klasses_describe_klass_oops() {
        for kind in [
            KlassKind::KlassKlass,
            KlassKind::InstanceKlassKlass,
            KlassKind::ArrayKlassKlass,
            KlassKind::ObjArrayKlassKlass,
            KlassKind::TypeArrayKlassKlass,
        ] {
            assert!(kind.is_subkind_of(KlassKind::KlassKlass));
            assert_eq!(kind.oop_kind(), OopKind::Klass);
        }
    }

    #[test]
    fn descriptor_hierarchy_matches_reference_hierarchy() {
        // Whenever a descriptor class derives from another, the references it describes must be
        // usable wherever the super class's references are.
        let kinds = [
            KlassKind::Instance,
            KlassKind::InstanceMirror,
            KlassKind::InstanceRef,
            KlassKind::ObjArrayKlassKlass,
            KlassKind::Array,
            KlassKind::ObjArray,
            KlassKind::TypeArray,
        ];
        for kind in kinds {
            if let Some(parent) = kind.super_kind() {
                assert!(kind.oop_kind().is_subkind_of(parent.oop_kind()));
            }
        }
    }

    #[test]
    fn klass_accessors() {
        let klass = Klass::new("java/lang/Object", KlassKind::Instance, 16);
        assert_eq!(klass.name(), "java/lang/Object");
        assert_eq!(klass.kind(), KlassKind::Instance);
        assert_eq!(klass.oop_kind(), OopKind::Instance);
        assert_eq!(klass.instance_size(), 16);
        assert_eq!(klass.to_string(), "java/lang/Object (Instance)");
    }
}
