//! The only place the walker touches memory. Every slot of every frame record
//! is read through `WordReader::read_word`.

use std::io::IoSliceMut;

use bytemuck::pod_read_unaligned;
use nix::sys::uio::{RemoteIoVec, process_vm_readv};
use nix::unistd::Pid;

use super::error::StackPrintError;
use super::pipe::PipeProbe;
use super::types::{VirtualAddress, Word, WORD_SIZE};
use super::utils::ResultLogExt;

const CANARY: Word = 0x5afe_5afe_5afe_5afe;

pub trait WordReader {
    fn read_word(&self, addr: VirtualAddress) -> Result<Word, StackPrintError>;
}

impl<R: WordReader + ?Sized> WordReader for &R {
    fn read_word(&self, addr: VirtualAddress) -> Result<Word, StackPrintError> {
        (**self).read_word(addr)
    }
}

/// Plain loads. An unmapped address kills the process.
#[derive(Debug)]
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// # Safety
    /// Every address handed to `read_word` must be readable for 8 bytes.
    /// The walker can only guarantee that for well-formed frame chains.
    pub unsafe fn new() -> Self {
        RawMemory { _private: () }
    }
}

impl WordReader for RawMemory {
    #[inline]
    fn read_word(&self, addr: VirtualAddress) -> Result<Word, StackPrintError> {
        // Frame records are not always 8-aligned in a corrupt chain.
        Ok(unsafe { addr.as_ptr().read_unaligned() })
    }
}

#[derive(Debug)]
enum SafeBackend {
    VmReadv(Pid),
    Pipe(PipeProbe),
}

/// Reads that report unmapped memory as an error instead of faulting.
#[derive(Debug)]
pub struct SafeMemory {
    backend: SafeBackend,
}

impl SafeMemory {
    pub fn new() -> Result<Self, StackPrintError> {
        let pid = Pid::this();
        let canary: Word = CANARY;
        let canary_read = read_with_vm_readv(pid, VirtualAddress::from_ptr(&canary as *const Word));
        let mem = SafeMemory {
            backend: choose_backend(pid, canary_read)?,
        };
        log::debug!("reading memory through {}", mem.backend_name());
        Ok(mem)
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            SafeBackend::VmReadv(_) => "process_vm_readv",
            SafeBackend::Pipe(_) => "pipe",
        }
    }
}

impl WordReader for SafeMemory {
    fn read_word(&self, addr: VirtualAddress) -> Result<Word, StackPrintError> {
        match &self.backend {
            SafeBackend::VmReadv(pid) => read_with_vm_readv(*pid, addr),
            SafeBackend::Pipe(probe) => probe.read_word(addr),
        }
    }
}

/// `process_vm_readv` is kept only if it read the canary back intact.
/// Seccomp filters and hardened kernels refuse it with `EPERM`/`ENOSYS`.
fn choose_backend(
    pid: Pid,
    canary_read: Result<Word, StackPrintError>,
) -> Result<SafeBackend, StackPrintError> {
    match canary_read.log_debug() {
        Some(CANARY) => Ok(SafeBackend::VmReadv(pid)),
        Some(other) => {
            log::debug!("process_vm_readv returned 0x{other:016x} for the canary, probing through a pipe");
            Ok(SafeBackend::Pipe(PipeProbe::new()?))
        }
        None => Ok(SafeBackend::Pipe(PipeProbe::new()?)),
    }
}

fn read_with_vm_readv(pid: Pid, addr: VirtualAddress) -> Result<Word, StackPrintError> {
    let mut buf = [0u8; WORD_SIZE as usize];
    let remote = [RemoteIoVec {
        base: addr.addr() as usize,
        len: WORD_SIZE as usize,
    }];
    let mut local = [IoSliceMut::new(&mut buf)];
    match process_vm_readv(pid, &mut local, &remote) {
        Ok(n) if n as u64 == WORD_SIZE => Ok(pod_read_unaligned(&buf)),
        Ok(n) => StackPrintError::err(&format!(
            "Short read of {n} bytes at 0x{addr:016x}"
        )),
        Err(errno) => StackPrintError::errno(
            &format!("Could not read memory at 0x{addr:016x}"),
            errno,
        ),
    }
}
