//! Object references for the Strata heap.
//!
//! Every subsystem that touches heap memory does so through the types in this crate:
//!
//! * [`Oop`], a handle to a heap object. The build selects one of two representations: the
//!   zero-overhead [`DirectOop`], or the [`CheckedOop`] which registers every live instance with its
//!   thread's [`UnhandledOops`] registry (enable the `check-unhandled-oops` feature).
//! * [`TypedOop`], an `Oop` narrowed to one member of the closed reference family
//!   ([`InstanceOop`], [`MethodOop`], [`ObjArrayOop`], ...).
//! * [`NarrowOop`], the 32-bit compressed form of a reference, and the [`CompressedOops`] codec that
//!   translates between the two.
//!
//! Unhandled oop checking catches raw references that are kept across a point where the collector
//! may move objects. A thread attaches with [`ManagedThread::attach`], anchors the objects it needs
//! to keep in [`Handle`]s, and at every [`ManagedThread::safepoint_poll`] all live registered
//! references that are not anchored by a handle are reported as a fatal error.
#![warn(missing_docs)]

pub mod desc;
mod flags;
mod handle;
mod narrow;
mod oop;
mod thread;
mod typed;
mod unhandled;

pub use flags::{check_unhandled_oops, FlagsError, VmFlags, VmFlagsBuilder};
pub use handle::{Handle, HandleArea, HandleMark};
pub use klass::{Klass, KlassKind, OopKind};
pub use narrow::{CompressedOops, CompressedOopsError, NarrowOop};
pub use oop::{CheckedOop, DirectOop, MarkWord, OopDesc, RawOop};
pub use thread::{AttachError, ManagedThread};
pub use typed::{
    kinds, ArrayOop, CompiledICHolderOop, ConstMethodOop, ConstantPoolCacheOop, ConstantPoolOop,
    InstanceOop, KlassOop, MethodDataOop, MethodOop, ObjArrayOop, OopKindMarker, TypeArrayOop,
    TypedOop,
};
pub use unhandled::{SlotId, UnhandledOopEntry, UnhandledOops};

/// A handle to a heap object, in the representation selected for this build.
#[cfg(feature = "check-unhandled-oops")]
pub type Oop = CheckedOop;

/// A handle to a heap object, in the representation selected for this build.
#[cfg(not(feature = "check-unhandled-oops"))]
pub type Oop = DirectOop;

/// The *prelude* contains the imports needed by almost every user of this crate.
pub mod prelude {
    pub use crate::{Handle, HandleMark, ManagedThread, NarrowOop, Oop, RawOop, TypedOop};
}
