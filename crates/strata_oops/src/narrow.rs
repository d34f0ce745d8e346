use crate::{Oop, RawOop};
use once_cell::sync::OnceCell;
use std::{fmt, ops::Range};

/// A compressed object reference: a 32-bit offset from the heap base.
///
/// A `NarrowOop` only means something together with the [`CompressedOops`] codec of the heap it
/// was encoded for.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NarrowOop(u32);

impl NarrowOop {
    /// The encoding of the null reference.
    pub const NULL: NarrowOop = NarrowOop(0);

    /// Reinterprets raw bits as a narrow reference.
    pub const fn from_bits(bits: u32) -> Self {
        NarrowOop(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if this is the encoding of null.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for NarrowOop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NarrowOop({:#x})", self.0)
    }
}

/// An error that occurs when setting up a [`CompressedOops`] codec or encoding an address.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum CompressedOopsError {
    /// The shift exceeds the object alignment
    #[error("shift {0} exceeds the maximum of {max}", max = CompressedOops::MAX_SHIFT)]
    InvalidShift(u32),
    /// The heap base is not aligned to the encoding granularity
    #[error("heap base {0:#x} is not aligned to the encoding granularity")]
    MisalignedBase(usize),
    /// The reserved range is empty or does not start above the heap base
    #[error("reserved range {start:#x}..{end:#x} must be non-empty and lie above the heap base")]
    InvalidReservedRange {
        /// Start of the reserved range
        start: usize,
        /// End of the reserved range
        end: usize,
    },
    /// The reserved range does not fit in the 32-bit encoding window
    #[error("reserved range ends {0:#x} bytes above the heap base, beyond the encoding window")]
    ReservedTooLarge(usize),
    /// The address lies outside of the reserved heap range
    #[error("address {0:#x} lies outside of the reserved heap range")]
    OutOfRange(usize),
    /// The address is not aligned to the encoding granularity
    #[error("address {0:#x} is not aligned to the encoding granularity")]
    Misaligned(usize),
    /// The process-wide codec was already initialized
    #[error("the process-wide compressed oops codec is already initialized")]
    AlreadyInitialized,
}

static GLOBAL: OnceCell<CompressedOops> = OnceCell::new();

/// Encodes and decodes [`NarrowOop`]s for one heap.
///
/// A narrow reference is `(address - base) >> shift`. Decoding is only valid with the base the
/// reference was encoded with, and encoding is only valid for addresses inside the reserved heap
/// range. The base lies strictly below the reserved range, so zero is free to encode null.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompressedOops {
    base: usize,
    shift: u32,
    reserved: Range<usize>,
}

impl CompressedOops {
    /// The largest supported shift: objects are at least 8-byte aligned.
    pub const MAX_SHIFT: u32 = 3;

    /// Constructs a codec for the heap reserved at `reserved`.
    pub fn new(base: usize, shift: u32, reserved: Range<usize>) -> Result<Self, CompressedOopsError> {
        if shift > Self::MAX_SHIFT {
            return Err(CompressedOopsError::InvalidShift(shift));
        }
        if base & Self::alignment_mask(shift) != 0 {
            return Err(CompressedOopsError::MisalignedBase(base));
        }
        if reserved.start <= base || reserved.end <= reserved.start {
            return Err(CompressedOopsError::InvalidReservedRange {
                start: reserved.start,
                end: reserved.end,
            });
        }

        let span = reserved.end - base;
        let window = (1u64 << 32) << shift;
        if span as u64 > window {
            return Err(CompressedOopsError::ReservedTooLarge(span));
        }

        Ok(Self {
            base,
            shift,
            reserved,
        })
    }

    fn alignment_mask(shift: u32) -> usize {
        (1usize << shift) - 1
    }

    /// Publishes `codec` as the process-wide codec. The heap base is fixed from then on.
    pub fn initialize(codec: CompressedOops) -> Result<&'static CompressedOops, CompressedOopsError> {
        let mut installed = false;
        let global = GLOBAL.get_or_init(|| {
            installed = true;
            codec
        });
        if !installed {
            return Err(CompressedOopsError::AlreadyInitialized);
        }

        log::debug!(
            "compressed oops: base {:#x}, shift {}, reserved {:#x}..{:#x}",
            global.base,
            global.shift,
            global.reserved.start,
            global.reserved.end
        );
        Ok(global)
    }

    /// Returns the process-wide codec, if it was initialized.
    pub fn global() -> Option<&'static CompressedOops> {
        GLOBAL.get()
    }

    /// Returns the heap base.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Returns the shift.
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Returns the reserved heap range.
    pub fn reserved(&self) -> &Range<usize> {
        &self.reserved
    }

    /// Returns true if `address` lies inside the reserved heap range.
    pub fn is_in_reserved(&self, address: usize) -> bool {
        self.reserved.contains(&address)
    }

    /// Encodes `address`, which must be null or lie inside the reserved range.
    pub fn try_encode(&self, address: usize) -> Result<NarrowOop, CompressedOopsError> {
        if address == 0 {
            return Ok(NarrowOop::NULL);
        }
        if !self.is_in_reserved(address) {
            return Err(CompressedOopsError::OutOfRange(address));
        }
        let offset = address - self.base;
        if offset & Self::alignment_mask(self.shift) != 0 {
            return Err(CompressedOopsError::Misaligned(address));
        }
        // Fits: the reserved range was checked against the encoding window in `new`.
        Ok(NarrowOop((offset >> self.shift) as u32))
    }

    /// Encodes `address` without validation beyond debug assertions.
    pub fn encode(&self, address: usize) -> NarrowOop {
        debug_assert!(
            self.try_encode(address).is_ok(),
            "cannot encode {address:#x}: {:?}",
            self.try_encode(address)
        );
        if address == 0 {
            NarrowOop::NULL
        } else {
            NarrowOop((address.wrapping_sub(self.base) >> self.shift) as u32)
        }
    }

    /// Decodes `narrow` into an address.
    ///
    /// `narrow` must have been encoded by this codec. Only then does the result lie inside the
    /// reserved range; any other value decodes to an unspecified address, wrapping around the
    /// address space rather than overflowing.
    pub fn decode(&self, narrow: NarrowOop) -> usize {
        if narrow.is_null() {
            0
        } else {
            self.base.wrapping_add((narrow.0 as usize) << self.shift)
        }
    }

    /// Encodes the address held by `oop`.
    pub fn encode_oop<R: RawOop>(&self, oop: &R) -> NarrowOop {
        self.encode(oop.address())
    }

    /// Decodes `narrow` into a reference.
    #[track_caller]
    pub fn decode_oop(&self, narrow: NarrowOop) -> Oop {
        Oop::from_bits(self.decode(narrow))
    }
}
