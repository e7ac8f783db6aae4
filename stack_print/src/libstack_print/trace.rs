//! Text form of a walk. Other tools parse it, so the layout is fixed.

use std::io::Write;

use super::error::StackPrintError;
use super::memory::WordReader;
use super::types::{FrameRecord, VirtualAddress};
use super::walker::{FrameWalker, StopReason};

pub const HEADER: &str = "=== Stack trace from fp chain ===";
pub const FOOTER: &str = "=== End ===";
pub const RETURN_ADDRESS_LABEL: &str = "Return address";
pub const OLD_STACK_POINTER_LABEL: &str = "Old stack pointer";

pub fn write_header<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")
}

pub fn write_frame<W: Write>(out: &mut W, record: &FrameRecord) -> std::io::Result<()> {
    writeln!(out, "{RETURN_ADDRESS_LABEL}: 0x{:016x}", record.return_address)?;
    writeln!(
        out,
        "{OLD_STACK_POINTER_LABEL}: 0x{:016x}",
        record.prev_frame_pointer
    )?;
    writeln!(out)
}

pub fn write_footer<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{FOOTER}")?;
    writeln!(out)
}

/// Header, one block per frame, footer. Flushed after every frame so a fault
/// further up the chain still leaves the frames printed so far.
pub fn print_trace<R: WordReader, W: Write>(
    walker: &FrameWalker<R>,
    start: VirtualAddress,
    out: &mut W,
) -> Result<StopReason, StackPrintError> {
    log::debug!(
        "walking from 0x{start:016x}, ceiling 0x{:016x}, hardened: {:?}",
        walker.ceiling(),
        walker.hardening()
    );
    write_header(out)?;
    out.flush()?;
    let reason = walker.walk(start, |record| {
        write_frame(out, record)?;
        out.flush()
    })?;
    write_footer(out)?;
    out.flush()?;
    if reason.is_baseline() {
        log::debug!("{reason}");
    } else {
        log::warn!("stack trace cut short: {reason}");
    }
    return Ok(reason);
}
