use libc::{EFAULT, EINVAL, EMFILE, ENFILE, O_CLOEXEC, c_int};

use super::{Fd, PipeError};
use crate::util::error::FileCountError;
use crate::util::os;
use crate::util::panic::{BadAddrPanic, InvalidArgPanic, Panic, UnexpectedErrorPanic};

/// Both ends of a freshly created OS pipe. Bytes written to `write` can be read from `read`, and
/// `read` only sees EOF once every copy of `write` (in every process) has been closed.
#[derive(Debug)]
pub struct Pipe {
    pub read: Fd,
    pub write: Fd,
}

impl Pipe {
    /// Creates a new pipe. Both ends are marked close-on-exec, so they are never inherited by an
    /// unrelated child unless explicitly duplicated onto one of its standard channels.
    pub fn new() -> Result<Pipe, PipeError> {
        let mut fds: [c_int; 2] = [-1, -1];
        // SAFETY: fds is a valid, writable array of two c_ints.
        if unsafe { libc::pipe2(fds.as_mut_ptr(), O_CLOEXEC) } == -1 {
            match os::err_no() {
                EMFILE | ENFILE => Err(FileCountError)?,
                EFAULT =>          BadAddrPanic.panic(),
                EINVAL =>          InvalidArgPanic.panic(),
                e =>               UnexpectedErrorPanic(e).panic(),
            }
        }
        // SAFETY: pipe2 succeeded, so both descriptors are open and owned by nothing else.
        let (read, write) = unsafe { (Fd::from_raw(fds[0]), Fd::from_raw(fds[1])) };
        Ok(Pipe { read, write })
    }

    pub fn into_parts(self) -> (Fd, Fd) {
        (self.read, self.write)
    }
}
