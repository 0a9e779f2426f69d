use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::os::fd::{AsRawFd, RawFd};
use std::thread;

use libc::{EBADF, EDQUOT, EINTR, EIO, ENOSPC, c_int};

use super::CloseError;
use crate::util::error::{IOError, InterruptError, StorageExhaustedError};
use crate::util::os;
use crate::util::panic::{BadFdPanic, Panic, UnexpectedErrorPanic};

/// An owned file descriptor, closed when dropped.
#[derive(PartialEq, Eq)]
pub struct Fd(c_int);

impl Fd {
    /// Takes ownership of a raw descriptor.
    ///
    /// # Safety
    /// `raw` must be an open descriptor which nothing else will close.
    pub const unsafe fn from_raw(raw: c_int) -> Fd {
        Fd(raw)
    }

    /// Returns a non-owning view of this descriptor, valid for as long as `self` is borrowed.
    pub const fn borrow(&self) -> FdRef<'_> {
        FdRef {
            raw: self.0,
            _owner: PhantomData,
        }
    }

    pub fn read(&self, buf: &mut [u8]) -> Result<usize, c_int> {
        // SAFETY: buf is valid for writes of buf.len() bytes.
        match unsafe { libc::read(self.0, buf.as_mut_ptr().cast(), buf.len()) } {
            -1 => Err(os::err_no()),
            count => Ok(count as usize),
        }
    }

    pub fn write(&self, buf: &[u8]) -> Result<usize, c_int> {
        // SAFETY: buf is valid for reads of buf.len() bytes.
        match unsafe { libc::write(self.0, buf.as_ptr().cast(), buf.len()) } {
            -1 => Err(os::err_no()),
            count => Ok(count as usize),
        }
    }

    pub fn close(self) -> Result<(), CloseError> {
        let raw = self.0;
        // The descriptor is released by close regardless of the outcome, so drop must not run.
        mem::forget(self);
        // SAFETY: We owned raw and have just given up ownership of it.
        if unsafe { libc::close(raw) } == -1 {
            match os::err_no() {
                EBADF =>           BadFdPanic.panic(),
                EINTR =>           Err(InterruptError)?,
                EIO =>             Err(IOError)?,
                ENOSPC | EDQUOT => Err(StorageExhaustedError)?,
                e =>               UnexpectedErrorPanic(e).panic(),
            }
        }
        Ok(())
    }

    /// Releases a descriptor the OS has already reported as invalid, ignoring whatever close has
    /// to say about it.
    pub(crate) fn discard(self) {
        let raw = self.0;
        mem::forget(self);
        // SAFETY: We owned raw; any error is deliberately ignored.
        unsafe { libc::close(raw) };
    }
}

impl Deref for Fd {
    type Target = c_int;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRawFd for Fd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        // SAFETY: After this, the file descriptor is invalidated but we are dropping self so it
        // doesn't matter.
        if unsafe { libc::close(self.0) } == -1 {
            match os::err_no() {
                // Someone else closed our descriptor, ownership is broken.
                EBADF if !thread::panicking() => {
                    panic!("error while dropping file descriptor: {}", BadFdPanic)
                },
                e => log::warn!("error while dropping file descriptor {}: {}", self.0, match e {
                    EBADF =>           BadFdPanic.to_string(),
                    EINTR =>           InterruptError.to_string(),
                    EIO =>             IOError.to_string(),
                    ENOSPC | EDQUOT => StorageExhaustedError.to_string(),
                    e =>               UnexpectedErrorPanic(e).to_string(),
                }),
            }
        }
    }
}

impl Debug for Fd {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Fd({})", self.0)
    }
}

/// A borrowed file descriptor. It refers to a descriptor owned by something else (an [`Fd`], a
/// [`File`](std::fs::File), ...) and can't outlive it. Dropping an `FdRef` does nothing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FdRef<'a> {
    raw: c_int,
    _owner: PhantomData<&'a Fd>,
}

impl<'a> FdRef<'a> {
    /// Borrows the descriptor behind any handle that exposes one.
    pub fn of<T: AsRawFd + ?Sized>(owner: &'a T) -> FdRef<'a> {
        FdRef {
            raw: owner.as_raw_fd(),
            _owner: PhantomData,
        }
    }

    pub const fn raw(self) -> c_int {
        self.raw
    }
}

impl AsRawFd for FdRef<'_> {
    fn as_raw_fd(&self) -> RawFd {
        self.raw
    }
}

impl Debug for FdRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "FdRef({})", self.raw)
    }
}
