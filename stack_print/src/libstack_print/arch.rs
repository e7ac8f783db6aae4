//! Everything that changes when porting the walker to another instruction set:
//! the register read, the user-space address ceiling and the frame record layout.

use super::types::{FrameLayout, VirtualAddress};

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Frame records are read as 64-bit words.");

pub trait Platform {
    const NAME: &'static str;

    /// First address that can never be a user-space stack location.
    const USER_MAX_VA: VirtualAddress;

    const LAYOUT: FrameLayout;

    /// Value of the frame-pointer register in the calling function.
    /// Must be inlined into the caller, otherwise it reports its own frame.
    fn read_frame_pointer() -> VirtualAddress;
}

pub struct X86_64;

pub struct Aarch64;

pub struct Riscv64;

#[cfg(target_arch = "x86_64")]
impl Platform for X86_64 {
    const NAME: &'static str = "x86_64";
    // 0x0000000000000000..=0x00007FFFFFFFFFFF is user space, the kernel starts at 0xFFFF800000000000
    const USER_MAX_VA: VirtualAddress = VirtualAddress::new(0x0000_7FFF_FFFF_FFFF);
    // fp[-1]/fp[-2] are locals under push rbp; mov rbp, rsp
    const LAYOUT: FrameLayout = FrameLayout::AT_FP;

    #[inline(always)]
    fn read_frame_pointer() -> VirtualAddress {
        let fp: u64;
        unsafe {
            std::arch::asm!(
                "mov {}, rbp",
                out(reg) fp,
                options(nomem, nostack, preserves_flags)
            );
        }
        VirtualAddress::new(fp)
    }
}

#[cfg(target_arch = "aarch64")]
impl Platform for Aarch64 {
    const NAME: &'static str = "aarch64";
    // 48-bit virtual addresses, TTBR0 half
    const USER_MAX_VA: VirtualAddress = VirtualAddress::new(0x0000_FFFF_FFFF_FFFF);
    // fp[-1]/fp[-2] are locals under stp x29, x30, [sp, #-16]!; mov x29, sp
    const LAYOUT: FrameLayout = FrameLayout::AT_FP;

    #[inline(always)]
    fn read_frame_pointer() -> VirtualAddress {
        let fp: u64;
        unsafe {
            std::arch::asm!(
                "mov {}, x29",
                out(reg) fp,
                options(nomem, nostack, preserves_flags)
            );
        }
        VirtualAddress::new(fp)
    }
}

#[cfg(target_arch = "riscv64")]
impl Platform for Riscv64 {
    const NAME: &'static str = "riscv64";
    // Sv39
    const USER_MAX_VA: VirtualAddress = VirtualAddress::new(0x0000_003F_FFFF_FFFF);
    const LAYOUT: FrameLayout = FrameLayout::BELOW_FP;

    #[inline(always)]
    fn read_frame_pointer() -> VirtualAddress {
        let fp: u64;
        unsafe {
            std::arch::asm!(
                "mv {}, fp",
                out(reg) fp,
                options(nomem, nostack, preserves_flags)
            );
        }
        VirtualAddress::new(fp)
    }
}

#[cfg(target_arch = "x86_64")]
pub type Host = X86_64;

#[cfg(target_arch = "aarch64")]
pub type Host = Aarch64;

#[cfg(target_arch = "riscv64")]
pub type Host = Riscv64;

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64"
)))]
compile_error!("No frame-pointer register known for this architecture.");
