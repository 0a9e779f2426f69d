use derive_more::{Display, IsVariant};
use libc::c_int;

/// Returned by [`Popen::returncode`](super::Popen::returncode) while the child hasn't been seen
/// to terminate.
pub const STILL_RUNNING: i32 = -1;

/// Exit code of a child whose program couldn't be executed (not found, not executable, ...).
/// Nothing else distinguishes that case from a program which ran and exited with 127 itself.
pub const EXEC_FAILURE_CODE: i32 = 127;

/// How a child terminated.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum ExitStatus {
    #[display("exited with code {_0}")]
    Exited(u8),
    #[display("killed by signal {_0}")]
    Signaled(c_int),
}

impl ExitStatus {
    /// Decodes a raw wait status. Stopped and continued states aren't terminal and give `None`.
    pub(crate) fn from_raw(status: c_int) -> Option<ExitStatus> {
        if libc::WIFEXITED(status) {
            Some(ExitStatus::Exited(libc::WEXITSTATUS(status) as u8))
        } else if libc::WIFSIGNALED(status) {
            Some(ExitStatus::Signaled(libc::WTERMSIG(status)))
        } else {
            None
        }
    }

    /// The integer exit code: the exit value for a normal exit, `128 + signal` for a child killed
    /// by a signal (the shell convention).
    pub const fn code(self) -> i32 {
        match self {
            ExitStatus::Exited(code) => code as i32,
            ExitStatus::Signaled(signal) => 128 + signal,
        }
    }

    pub const fn success(self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}
