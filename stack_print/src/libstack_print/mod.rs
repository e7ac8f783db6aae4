#![cfg(target_os = "linux")]

//! Walks the calling thread's stack through the saved frame-pointer chain.
//! The binary must be built with `-C force-frame-pointers=yes`, otherwise the
//! frame-pointer register holds arbitrary data and so does the trace.

use std::io;

use arch::{Host, Platform};
use config::{Config, WalkMode};
use error::StackPrintError;
use memory::{RawMemory, SafeMemory};
use trace::print_trace;
use types::FrameRecord;
use utils::ResultLogExt;
use walker::{FrameWalker, Hardening, StopReason};

pub mod arch;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
mod pipe;
mod test_utils;
pub mod trace;
pub mod types;
pub mod utils;
pub mod walker;

/// Print the trace of the caller's stack to stdout.
///
/// Only stops on a null frame pointer or one at/above the user-space ceiling.
/// A chain that leads into unmapped memory crashes the process.
#[inline(never)]
pub fn run() {
    let fp = Host::read_frame_pointer();
    // SAFETY: none beyond the frame-pointer build contract, faults are accepted here.
    let walker = FrameWalker::new(unsafe { RawMemory::new() }, Host::LAYOUT);
    let mut out = io::stdout().lock();
    print_trace(&walker, fp, &mut out).log_error_in("Stack trace");
}

/// Like `run`, with every `Hardening` check enabled and reads that cannot fault.
#[inline(never)]
pub fn run_hardened() -> Result<StopReason, StackPrintError> {
    let fp = Host::read_frame_pointer();
    let walker = FrameWalker::new(SafeMemory::new()?, Host::LAYOUT).hardened(Hardening::default());
    let mut out = io::stdout().lock();
    print_trace(&walker, fp, &mut out)
}

#[inline(never)]
pub fn run_with(config: &Config) -> Result<StopReason, StackPrintError> {
    let fp = Host::read_frame_pointer();
    log::debug!(
        "walking from fp=0x{fp:016x} on {}, ceiling 0x{:016x}",
        Host::NAME,
        config.ceiling
    );
    let mut out = io::stdout().lock();
    match config.mode {
        WalkMode::Baseline => {
            // SAFETY: same contract as `run`.
            let walker = FrameWalker::new(unsafe { RawMemory::new() }, Host::LAYOUT)
                .with_ceiling(config.ceiling);
            print_trace(&walker, fp, &mut out)
        }
        WalkMode::Hardened(hardening) => {
            let walker = FrameWalker::new(SafeMemory::new()?, Host::LAYOUT)
                .with_ceiling(config.ceiling)
                .hardened(hardening);
            print_trace(&walker, fp, &mut out)
        }
    }
}

/// Hardened walk of the caller's stack without printing. The first record is
/// this function's own frame, its return address points into the caller.
#[inline(never)]
pub fn capture_frames(hardening: Hardening) -> Result<Vec<FrameRecord>, StackPrintError> {
    let fp = Host::read_frame_pointer();
    let walker = FrameWalker::new(SafeMemory::new()?, Host::LAYOUT).hardened(hardening);
    let mut frames = Vec::new();
    let reason = walker.walk(fp, |record| {
        frames.push(*record);
        Ok::<(), StackPrintError>(())
    })?;
    log::debug!("captured {} frames: {reason}", frames.len());
    Ok(frames)
}
