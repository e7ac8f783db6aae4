use super::error::StackPrintError;
use super::types::{VirtualAddress, Word, WORD_SIZE};
use bytemuck::pod_read_unaligned;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc;
use nix::unistd::pipe2;
use nix::unistd::read;
use std::os::fd::{AsRawFd, OwnedFd};

/// Copies words out of this process through a pipe. The kernel validates the
/// source range of `write(2)`, so an unmapped address is an `EFAULT`, not a fault.
#[derive(Debug)]
pub struct PipeProbe {
    read_fd: OwnedFd,
    write_fd: OwnedFd,
}

impl PipeProbe {
    pub fn new() -> Result<Self, StackPrintError> {
        match pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK) {
            Ok((read_fd, write_fd)) => Ok(PipeProbe { read_fd, write_fd }),
            Err(errno) => StackPrintError::errno("Pipe creation failed", errno),
        }
    }

    pub fn read_word(&self, addr: VirtualAddress) -> Result<Word, StackPrintError> {
        let written = unsafe {
            libc::write(
                self.write_fd.as_raw_fd(),
                addr.addr() as usize as *const libc::c_void,
                WORD_SIZE as usize,
            )
        };
        match Errno::result(written) {
            Ok(n) if n as u64 == WORD_SIZE => {}
            Ok(n) => {
                self.drain();
                return StackPrintError::err(&format!(
                    "Short probe write of {n} bytes at 0x{addr:016x}"
                ));
            }
            Err(errno) => {
                return StackPrintError::errno(
                    &format!("Could not read memory at 0x{addr:016x}"),
                    errno,
                );
            }
        }

        let mut buf = [0u8; WORD_SIZE as usize];
        match read(self.read_fd.as_raw_fd(), &mut buf) {
            Ok(n) if n as u64 == WORD_SIZE => Ok(pod_read_unaligned(&buf)),
            Ok(_) => StackPrintError::err("Could not read from pipe"),
            Err(errno) => StackPrintError::errno("Could not read from pipe", errno),
        }
    }

    fn drain(&self) {
        let mut buf = [0u8; WORD_SIZE as usize];
        while let Ok(n) = read(self.read_fd.as_raw_fd(), &mut buf) {
            if n == 0 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mapped_word() {
        let probe = PipeProbe::new().unwrap();
        let value: Word = 0xdead_beef_cafe_f00d;
        let addr = VirtualAddress::from_ptr(&value as *const Word);
        assert_eq!(probe.read_word(addr).unwrap(), value);
    }

    #[test]
    fn refuses_unmapped_word() {
        let probe = PipeProbe::new().unwrap();
        let e = probe.read_word(VirtualAddress::new(0x10)).unwrap_err();
        assert_eq!(e.raw_errno(), Errno::EFAULT);
        // the failed probe leaves nothing behind for the next read
        let value: Word = 42;
        let addr = VirtualAddress::from_ptr(&value as *const Word);
        assert_eq!(probe.read_word(addr).unwrap(), 42);
    }

    #[test]
    fn reads_many_words_without_filling_the_pipe() {
        let probe = PipeProbe::new().unwrap();
        let values: Vec<Word> = (0..20_000).collect();
        for (i, v) in values.iter().enumerate() {
            let addr = VirtualAddress::from_ptr(v as *const Word);
            assert_eq!(probe.read_word(addr).unwrap(), i as Word);
        }
    }
}
