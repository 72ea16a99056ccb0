#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more requests failed (transport error or non-2xx status).
    RequestsFailed = 10,

    /// Invalid CLI/config (unknown scenario, bad flags, invalid durations, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, unexpected invariants).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_run(failed_requests_total: u64) -> Self {
        if failed_requests_total > 0 {
            Self::RequestsFailed
        } else {
            Self::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_requests_map_to_exit_10() {
        assert_eq!(ExitCode::from_run(0), ExitCode::Success);
        assert_eq!(ExitCode::from_run(1), ExitCode::RequestsFailed);
        assert_eq!(ExitCode::RequestsFailed.as_i32(), 10);
        assert_eq!(ExitCode::InvalidInput.as_i32(), 30);
    }
}
