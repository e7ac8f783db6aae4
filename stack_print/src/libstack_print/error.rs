use nix::errno::Errno;
use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPrintError {
    details: String,
    errno: Errno,
}

impl StackPrintError {
    pub fn err<T>(s: &str) -> Result<T, StackPrintError> {
        Err(StackPrintError::new_err(s))
    }

    pub fn new_err(s: &str) -> StackPrintError {
        StackPrintError {
            details: s.to_owned(),
            errno: Errno::UnknownErrno,
        }
    }

    pub fn new_errno(s: &str, errno: Errno) -> StackPrintError {
        StackPrintError {
            details: s.to_owned(),
            errno,
        }
    }

    pub fn errno<T>(s: &str, errno: Errno) -> Result<T, StackPrintError> {
        Err(StackPrintError::new_errno(s, errno))
    }

    /// `Errno::UnknownErrno` when the error did not come from a syscall.
    pub fn raw_errno(&self) -> Errno {
        self.errno
    }
}

impl From<std::io::Error> for StackPrintError {
    fn from(e: std::io::Error) -> Self {
        match e.raw_os_error() {
            Some(code) => StackPrintError::new_errno("Could not write trace", Errno::from_raw(code)),
            None => StackPrintError::new_err(&format!("Could not write trace: {e}")),
        }
    }
}

impl Error for StackPrintError {}

impl Display for StackPrintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errno == Errno::UnknownErrno {
            write!(f, "{}", self.details)?;
        } else {
            write!(
                f,
                "{}: {} (errno {})",
                self.details,
                self.errno.desc(),
                self.errno
            )?;
        }
        Ok(())
    }
}
