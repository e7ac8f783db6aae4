use std::{fmt::LowerHex, ops::Add};

use bytemuck::{Pod, Zeroable};

/// Size in bytes of one slot of a frame record.
pub const WORD_SIZE: u64 = size_of::<u64>() as u64;

pub type Word = u64;

#[repr(transparent)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash)]
pub struct VirtualAddress {
    addr: u64,
}

unsafe impl Pod for VirtualAddress {}

unsafe impl Zeroable for VirtualAddress {}

impl VirtualAddress {
    pub const fn new(addr: u64) -> Self {
        Self { addr }
    }

    pub const fn null() -> Self {
        Self { addr: 0 }
    }

    pub fn addr(&self) -> u64 {
        self.addr
    }

    pub fn is_null(&self) -> bool {
        self.addr == 0
    }

    pub fn is_word_aligned(&self) -> bool {
        self.addr % WORD_SIZE == 0
    }

    /// `self + words * WORD_SIZE`, wrapping like raw pointer arithmetic in C.
    pub fn offset_words(self, words: i64) -> VirtualAddress {
        Self {
            addr: self.addr.wrapping_add((words as u64).wrapping_mul(WORD_SIZE)),
        }
    }

    pub fn as_ptr(&self) -> *const Word {
        self.addr as usize as *const Word
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self {
            addr: ptr as usize as u64,
        }
    }
}

impl LowerHex for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        LowerHex::fmt(&self.addr, f)
    }
}

impl Add<i64> for VirtualAddress {
    type Output = VirtualAddress;

    fn add(self, rhs: i64) -> Self::Output {
        Self {
            addr: self.addr.wrapping_add(rhs as u64),
        }
    }
}

/// Where the two slots of a frame record sit, in words relative to the frame pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub return_address: i64,
    pub prev_frame_pointer: i64,
}

impl FrameLayout {
    /// `fp[-1]` holds the return address, `fp[-2]` the caller's frame pointer.
    /// The frame pointer is the caller's stack pointer at the call (RISC-V `s0`).
    pub const BELOW_FP: FrameLayout = FrameLayout {
        return_address: -1,
        prev_frame_pointer: -2,
    };

    /// `fp[0]` holds the caller's frame pointer and `fp[1]` the return address,
    /// as pushed by an x86_64 `push rbp; mov rbp, rsp` prologue or an aarch64 `stp x29, x30`.
    pub const AT_FP: FrameLayout = FrameLayout {
        return_address: 1,
        prev_frame_pointer: 0,
    };

    pub fn return_address_slot(&self, fp: VirtualAddress) -> VirtualAddress {
        fp.offset_words(self.return_address)
    }

    pub fn prev_frame_pointer_slot(&self, fp: VirtualAddress) -> VirtualAddress {
        fp.offset_words(self.prev_frame_pointer)
    }
}

/// One visited frame of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    /// Address the two slots were read relative to.
    pub frame_pointer: VirtualAddress,
    pub return_address: Word,
    pub prev_frame_pointer: VirtualAddress,
}
