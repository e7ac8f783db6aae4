use std::fmt::Display;

/// Log the error side of a result and continue with an `Option`.
pub trait ResultLogExt<T> {
    fn log_error(self) -> Option<T>;

    /// Same as `log_error` with a prefix naming what was being attempted.
    fn log_error_in(self, context: &str) -> Option<T>;

    /// For failures that have a fallback and are only worth a debug line.
    fn log_debug(self) -> Option<T>;
}

impl<T, E: Display> ResultLogExt<T> for Result<T, E> {
    fn log_error(self) -> Option<T> {
        self.inspect_err(|e| log::error!("{e}")).ok()
    }

    fn log_error_in(self, context: &str) -> Option<T> {
        self.inspect_err(|e| log::error!("{context}: {e}")).ok()
    }

    fn log_debug(self) -> Option<T> {
        self.inspect_err(|e| log::debug!("{e}")).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackPrintError;

    #[test]
    fn ok_value_passes_through() {
        let r: Result<u64, StackPrintError> = Ok(7);
        assert_eq!(r.log_error(), Some(7));
    }

    #[test]
    fn error_becomes_none() {
        let r: Result<u64, StackPrintError> = StackPrintError::err("boom");
        assert_eq!(r.clone().log_error(), None);
        assert_eq!(r.clone().log_error_in("walking"), None);
        assert_eq!(r.log_debug(), None);
    }

    #[test]
    fn works_for_nix_results() {
        let r: nix::Result<()> = Err(nix::errno::Errno::EFAULT);
        assert_eq!(r.log_debug(), None);
    }
}
