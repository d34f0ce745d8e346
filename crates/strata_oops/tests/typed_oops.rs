mod util;

use std::mem::size_of;
use strata_oops::{
    desc::ArrayOopDesc, kinds, ArrayOop, InstanceOop, KlassKind, ObjArrayOop, Oop, OopDesc,
    OopKind, OopKindMarker, RawOop, TypeArrayOop, TypedOop,
};
use util::TestHeap;

/// Reads the first `n` bytes of the object through the untyped and the typed view.
fn check_prefix_law<K: OopKindMarker>(klass_kind: KlassKind) {
    let mut heap = TestHeap::default();
    let obj = heap.alloc(klass_kind, size_of::<K::Desc>());

    let oop = Oop::from_ptr(obj);
    let typed = unsafe { TypedOop::<K>::from_oop(oop.clone()) };

    let n = size_of::<OopDesc>();
    let (via_base, via_typed) = unsafe {
        (
            std::slice::from_raw_parts(oop.obj().cast::<u8>(), n),
            std::slice::from_raw_parts(typed.desc().cast::<u8>(), n),
        )
    };
    assert_eq!(via_base, via_typed);
    assert_eq!(typed.as_oop(), &oop);
    assert_eq!(typed.kind(), K::KIND);
    assert_eq!(unsafe { oop.kind() }, K::KIND);
    assert_eq!(size_of::<TypedOop<K>>(), size_of::<Oop>());
}

macro_rules! family_tests {
    ($($marker:ident => $klass_kind:ident),+ $(,)?) => {
        paste::paste! {
            $(
                #[test]
                fn [<prefix_law_ $marker:snake>]() {
                    check_prefix_law::<kinds::$marker>(KlassKind::$klass_kind);
                }
            )+
        }
    };
}

family_tests!(
    Instance => Instance,
    Method => Method,
    ConstMethod => ConstMethod,
    MethodData => MethodData,
    Array => Array,
    ObjArray => ObjArray,
    TypeArray => TypeArray,
    ConstantPool => ConstantPool,
    ConstantPoolCache => ConstantPoolCache,
    Klass => KlassKlass,
    CompiledICHolder => CompiledICHolder,
);

#[test]
fn array_refinements_share_the_array_prefix() {
    let mut heap = TestHeap::default();
    let obj = heap.alloc_array(KlassKind::ObjArray, 4, size_of::<usize>());

    let objects = unsafe { ObjArrayOop::from_oop(Oop::from_ptr(obj)) };
    assert_eq!(unsafe { objects.length() }, 4);

    let n = size_of::<ArrayOopDesc>();
    let array: ArrayOop = objects.clone().widen();
    let (via_array, via_objects) = unsafe {
        (
            std::slice::from_raw_parts(array.desc().cast::<u8>(), n),
            std::slice::from_raw_parts(objects.desc().cast::<u8>(), n),
        )
    };
    assert_eq!(via_array, via_objects);
    assert_eq!(unsafe { array.length() }, 4);
    assert_eq!(array.as_oop(), objects.as_oop());
}

#[test]
fn primitive_arrays() {
    let mut heap = TestHeap::default();
    let obj = heap.alloc_array(KlassKind::TypeArray, 16, 1);

    let bytes = unsafe { TypeArrayOop::from_oop(Oop::from_ptr(obj)) };
    assert_eq!(unsafe { bytes.length() }, 16);
    assert_eq!(unsafe { bytes.klass().kind() }, KlassKind::TypeArray);
}

#[test]
fn sub_descriptors_narrow_to_their_super_kind() {
    let mut heap = TestHeap::default();
    let mirror = heap.alloc(KlassKind::InstanceMirror, 32);

    let instance = unsafe { InstanceOop::from_oop(Oop::from_ptr(mirror)) };
    assert_eq!(instance.obj(), mirror);
}

#[test]
fn usable_where_an_oop_is_expected() {
    fn address_of(oop: &Oop) -> usize {
        oop.address()
    }

    let mut heap = TestHeap::default();
    let obj = heap.alloc(KlassKind::Method, 32);
    let method = unsafe { TypedOop::<kinds::Method>::from_oop(Oop::from_ptr(obj)) };

    assert_eq!(address_of(&method), obj as usize);
    assert!(!method.is_null());

    let untyped: Oop = method.into();
    assert_eq!(untyped.obj(), obj);
}

#[test]
fn equality_and_ordering_are_inherited() {
    let mut heap = TestHeap::default();
    let a = heap.alloc(KlassKind::Instance, 32);
    let b = heap.alloc(KlassKind::Instance, 32);

    let (x, y) = unsafe {
        (
            InstanceOop::from_oop(Oop::from_ptr(a)),
            InstanceOop::from_oop(Oop::from_ptr(b)),
        )
    };
    assert_eq!(x == y, Oop::from_ptr(a) == Oop::from_ptr(b));
    assert_eq!(x.cmp(&y), Oop::from_ptr(a).cmp(&Oop::from_ptr(b)));
    assert_eq!(x, x.clone());
}

#[cfg(not(feature = "check-unhandled-oops"))]
#[test]
fn typed_references_are_copy_without_checking() {
    fn assert_copy<T: Copy>() {}
    assert_copy::<InstanceOop>();
    assert_copy::<ObjArrayOop>();

    let mut heap = TestHeap::default();
    let obj = heap.alloc(KlassKind::Instance, 32);
    let original = unsafe { InstanceOop::from_oop(Oop::from_ptr(obj)) };
    let copy = original;
    assert_eq!(copy, original);
    assert_eq!(Clone::clone(&original).obj(), obj);
}

#[cfg(feature = "check-unhandled-oops")]
#[test]
fn typed_clones_register_like_untyped_clones() {
    util::enable_checking();
    let thread = strata_oops::ManagedThread::attach("typed").expect("failed to attach");
    let mut heap = TestHeap::default();
    let obj = heap.alloc(KlassKind::Instance, 32);

    let original = unsafe { InstanceOop::from_oop(Oop::from_ptr(obj)) };
    let copy = original.clone();
    assert_eq!(copy, original);
    assert_ne!(copy.registration(), original.registration());
    assert_eq!(thread.unhandled_oops_count(), 2);
}

#[test]
fn null_typed_references() {
    let null = InstanceOop::default();
    assert!(null.is_null());
    assert_eq!(null, InstanceOop::null());
    assert_eq!(format!("{null:?}"), "instanceOop(0x0)");

    let narrowed = unsafe { ObjArrayOop::from_oop(Oop::null()) };
    assert!(narrowed.is_null());
    assert_eq!(narrowed.kind(), OopKind::ObjArray);
}

#[test]
#[should_panic(expected = "arrayOop is not a super kind of instanceOop")]
fn widening_to_an_unrelated_kind_panics() {
    let _ = InstanceOop::null().widen::<kinds::Array>();
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "refers to a methodOop, not a instanceOop")]
fn narrowing_to_the_wrong_kind_is_caught_in_debug_builds() {
    let mut heap = TestHeap::default();
    let method = heap.alloc(KlassKind::Method, 32);
    let _ = unsafe { InstanceOop::from_oop(Oop::from_ptr(method)) };
}
