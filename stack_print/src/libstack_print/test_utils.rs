#![cfg(test)]

use super::types::{FrameLayout, VirtualAddress, Word, WORD_SIZE};

/// Words per simulated frame. Room for the record on either side of the frame pointer.
const FRAME_WORDS: usize = 4;

/// A frame chain laid out in a heap buffer, linked in increasing address order
/// and terminated by a null previous frame pointer.
pub struct SyntheticStack {
    words: Box<[Word]>,
    layout: FrameLayout,
}

impl SyntheticStack {
    pub fn chain(return_addresses: &[Word]) -> Self {
        SyntheticStack::with_layout(FrameLayout::BELOW_FP, return_addresses)
    }

    pub fn with_layout(layout: FrameLayout, return_addresses: &[Word]) -> Self {
        let n = return_addresses.len();
        let mut stack = SyntheticStack {
            words: vec![0; (n + 1) * FRAME_WORDS].into_boxed_slice(),
            layout,
        };
        for (i, ra) in return_addresses.iter().enumerate() {
            let next = if i + 1 < n {
                stack.fp(i + 1)
            } else {
                VirtualAddress::null()
            };
            stack.set_return_address(i, *ra);
            stack.set_prev(i, next);
        }
        stack
    }

    pub fn fp(&self, frame: usize) -> VirtualAddress {
        let base = VirtualAddress::from_ptr(self.words.as_ptr());
        base + ((frame * FRAME_WORDS + 2) as u64 * WORD_SIZE) as i64
    }

    pub fn start(&self) -> VirtualAddress {
        self.fp(0)
    }

    pub fn set_prev(&mut self, frame: usize, value: VirtualAddress) {
        let idx = self.slot_index(frame, self.layout.prev_frame_pointer);
        self.words[idx] = value.addr();
    }

    pub fn set_return_address(&mut self, frame: usize, value: Word) {
        let idx = self.slot_index(frame, self.layout.return_address);
        self.words[idx] = value;
    }

    fn slot_index(&self, frame: usize, offset: i64) -> usize {
        (frame as i64 * FRAME_WORDS as i64 + 2 + offset) as usize
    }
}
