use std::fmt::Display;

use super::arch::{Host, Platform};
use super::error::StackPrintError;
use super::memory::WordReader;
use super::types::{FrameLayout, FrameRecord, VirtualAddress};

/// Extra stop conditions on top of the null/ceiling checks. Opt-in only,
/// a walker without it behaves exactly like the plain C loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hardening {
    pub max_frames: usize,
    /// Callers live at higher addresses on a downward-growing stack.
    pub require_increasing: bool,
    pub require_alignment: bool,
}

impl Hardening {
    pub const DEFAULT_MAX_FRAMES: usize = 256;
}

impl Default for Hardening {
    fn default() -> Self {
        Hardening {
            max_frames: Hardening::DEFAULT_MAX_FRAMES,
            require_increasing: true,
            require_alignment: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    NullFramePointer,
    AboveCeiling(VirtualAddress),
    NotIncreasing {
        from: VirtualAddress,
        to: VirtualAddress,
    },
    Misaligned(VirtualAddress),
    DepthLimit(usize),
    Unreadable(StackPrintError),
}

impl StopReason {
    /// The two conditions the unguarded loop checks.
    pub fn is_baseline(&self) -> bool {
        matches!(
            self,
            StopReason::NullFramePointer | StopReason::AboveCeiling(_)
        )
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::NullFramePointer => write!(f, "null frame pointer"),
            StopReason::AboveCeiling(fp) => {
                write!(f, "frame pointer 0x{fp:016x} above user address ceiling")
            }
            StopReason::NotIncreasing { from, to } => write!(
                f,
                "frame pointer went from 0x{from:016x} to 0x{to:016x}, chain must grow upwards"
            ),
            StopReason::Misaligned(fp) => write!(f, "misaligned frame pointer 0x{fp:016x}"),
            StopReason::DepthLimit(n) => write!(f, "stopped after {n} frames"),
            StopReason::Unreadable(e) => write!(f, "{e}"),
        }
    }
}

pub struct FrameWalker<R: WordReader> {
    reader: R,
    layout: FrameLayout,
    ceiling: VirtualAddress,
    hardening: Option<Hardening>,
}

impl<R: WordReader> FrameWalker<R> {
    pub fn new(reader: R, layout: FrameLayout) -> Self {
        Self {
            reader,
            layout,
            ceiling: Host::USER_MAX_VA,
            hardening: None,
        }
    }

    pub fn with_ceiling(mut self, ceiling: VirtualAddress) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn hardened(mut self, hardening: Hardening) -> Self {
        self.hardening = Some(hardening);
        self
    }

    pub fn ceiling(&self) -> VirtualAddress {
        self.ceiling
    }

    pub fn hardening(&self) -> Option<&Hardening> {
        self.hardening.as_ref()
    }

    pub fn frames(&self, start: VirtualAddress) -> Frames<'_, R> {
        Frames {
            walker: self,
            state: WalkState::Walking {
                fp: start,
                prev: None,
                depth: 0,
            },
        }
    }

    /// Hands every frame to `visit` and returns why the chain ended.
    pub fn walk<E>(
        &self,
        start: VirtualAddress,
        mut visit: impl FnMut(&FrameRecord) -> Result<(), E>,
    ) -> Result<StopReason, E> {
        let mut frames = self.frames(start);
        loop {
            match frames.advance() {
                Ok(record) => visit(&record)?,
                Err(reason) => return Ok(reason),
            }
        }
    }

    fn step(
        &self,
        fp: VirtualAddress,
        prev: Option<VirtualAddress>,
        depth: usize,
    ) -> Result<FrameRecord, StopReason> {
        // When should this stop? The unguarded walk only knows these two.
        if fp.is_null() {
            return Err(StopReason::NullFramePointer);
        }
        if fp >= self.ceiling {
            return Err(StopReason::AboveCeiling(fp));
        }

        if let Some(h) = &self.hardening {
            if let Some(prev) = prev {
                if h.require_increasing && fp <= prev {
                    return Err(StopReason::NotIncreasing { from: prev, to: fp });
                }
            }
            if h.require_alignment && !fp.is_word_aligned() {
                return Err(StopReason::Misaligned(fp));
            }
            if depth >= h.max_frames {
                return Err(StopReason::DepthLimit(depth));
            }
        }

        let return_address = self
            .reader
            .read_word(self.layout.return_address_slot(fp))
            .map_err(StopReason::Unreadable)?;
        let prev_frame_pointer = self
            .reader
            .read_word(self.layout.prev_frame_pointer_slot(fp))
            .map_err(StopReason::Unreadable)?;

        Ok(FrameRecord {
            frame_pointer: fp,
            return_address,
            prev_frame_pointer: VirtualAddress::new(prev_frame_pointer),
        })
    }
}

enum WalkState {
    Walking {
        fp: VirtualAddress,
        prev: Option<VirtualAddress>,
        depth: usize,
    },
    Done(StopReason),
}

/// Iterator over the chain, `Walking` until a stop condition moves it to `Done`.
pub struct Frames<'w, R: WordReader> {
    walker: &'w FrameWalker<R>,
    state: WalkState,
}

impl<R: WordReader> Frames<'_, R> {
    /// `None` while frames are still being produced.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        match &self.state {
            WalkState::Done(reason) => Some(reason),
            WalkState::Walking { .. } => None,
        }
    }

    /// Next frame, or the reason the walk is over. Once `Done`, keeps
    /// returning the same reason.
    fn advance(&mut self) -> Result<FrameRecord, StopReason> {
        let (fp, prev, depth) = match &self.state {
            WalkState::Walking { fp, prev, depth } => (*fp, *prev, *depth),
            WalkState::Done(reason) => return Err(reason.clone()),
        };
        match self.walker.step(fp, prev, depth) {
            Ok(record) => {
                log::trace!(
                    "frame {depth}: fp=0x{fp:016x} ra=0x{:016x}",
                    record.return_address
                );
                self.state = WalkState::Walking {
                    fp: record.prev_frame_pointer,
                    prev: Some(fp),
                    depth: depth + 1,
                };
                Ok(record)
            }
            Err(reason) => {
                log::debug!("frame walk done after {depth} frames: {reason}");
                self.state = WalkState::Done(reason.clone());
                Err(reason)
            }
        }
    }
}

impl<R: WordReader> Iterator for Frames<'_, R> {
    type Item = FrameRecord;

    fn next(&mut self) -> Option<FrameRecord> {
        self.advance().ok()
    }
}
