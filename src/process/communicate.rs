//! Exchanging data with a running child over its pipes.
//!
//! Feeding stdin and draining stdout/stderr can't be done one after the other: a child that fills
//! its stdout pipe before it has read all of its input blocks on the write, while the parent
//! blocks writing the rest of the input. The loop here waits on all active pipes at once with
//! `poll(2)` and only ever performs an operation the OS has reported as ready.

use std::borrow::Cow;
use std::cmp;
use std::time::Duration;

use libc::{
    EAGAIN, EBADF, EFAULT, EINTR, EINVAL, EIO, ENOMEM, EPIPE, POLLERR, POLLHUP, POLLIN, POLLNVAL,
    POLLOUT, c_int, c_short, nfds_t, pollfd,
};

use super::{Channel, CommunicateError, Popen};
use crate::io::Fd;
use crate::util::error::{IOError, OOMError};
use crate::util::os;
use crate::util::panic::{BadAddrPanic, InvalidArgPanic, Panic, UnexpectedErrorPanic};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_CHUNK: usize = 1024;
pub const DEFAULT_WRITE_CHUNK: usize = 512;

/// Everything a finished [`communicate`](Popen::communicate) collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Communication {
    /// Exit code of the child, decoded like [`Popen::wait`].
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Communication {
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    pub const fn success(&self) -> bool {
        self.code == 0
    }
}

/// A builder for the multiplexing loop behind [`Popen::communicate`], for when the defaults
/// don't fit.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use pipework::process::{CommunicateOptions, Popen, PIPE};
/// let mut cat = Popen::spawn_with(["cat"], PIPE, PIPE, PIPE).unwrap();
/// let out = CommunicateOptions::new()
///     .timeout(Duration::from_millis(100))
///     .read_chunk(4096)
///     .run(&mut cat, Some(b"meow".as_slice()))
///     .unwrap();
/// assert_eq!(out.stdout, b"meow");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicateOptions {
    timeout: Duration,
    read_chunk: usize,
    write_chunk: usize,
}

impl Default for CommunicateOptions {
    fn default() -> Self {
        CommunicateOptions {
            timeout: DEFAULT_TIMEOUT,
            read_chunk: DEFAULT_READ_CHUNK,
            write_chunk: DEFAULT_WRITE_CHUNK,
        }
    }
}

impl CommunicateOptions {
    pub fn new() -> CommunicateOptions {
        CommunicateOptions::default()
    }

    /// The longest a single readiness wait may block before the loop goes around again. This
    /// doesn't bound the operation as a whole.
    pub const fn timeout(&mut self, value: Duration) -> &mut Self {
        self.timeout = value;
        self
    }

    /// How many bytes to read from stdout or stderr per ready event. At least 1.
    pub fn read_chunk(&mut self, value: usize) -> &mut Self {
        self.read_chunk = cmp::max(value, 1);
        self
    }

    /// How many bytes to write to stdin per ready event. Clamped to `1..=PIPE_BUF`, so that a
    /// write to a pipe reported as writable never blocks.
    pub fn write_chunk(&mut self, value: usize) -> &mut Self {
        self.write_chunk = value.clamp(1, libc::PIPE_BUF);
        self
    }

    /// Drives `popen`'s pipes to completion and waits for it to exit.
    ///
    /// With `Some(input)`, the input is written to the child's stdin pipe, which is then closed.
    /// With `None`, a stdin pipe is left open and untouched, so a child reading its stdin keeps
    /// waiting until [`Popen::close_stdin`] is called or it exits some other way.
    pub fn run(&self, popen: &mut Popen, input: Option<&[u8]>) -> Result<Communication, CommunicateError> {
        let mut feed = match (input, popen.stdin.take()) {
            (Some(input), Some(fd)) if input.is_empty() => {
                fd.close()?;
                None
            },
            (Some(input), Some(fd)) => Some(Feed { fd, input, offset: 0 }),
            (Some(input), None) => {
                if !input.is_empty() {
                    log::warn!(
                        "stdin of pid {} isn't piped, ignoring {} bytes of input",
                        popen.pid(), input.len()
                    );
                }
                None
            },
            (None, stdin) => {
                popen.stdin = stdin;
                None
            },
        };
        let mut stdout = popen.stdout.take();
        let mut stderr = popen.stderr.take();

        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut chunk = vec![0_u8; self.read_chunk];
        let timeout = c_int::try_from(self.timeout.as_millis()).unwrap_or(c_int::MAX);

        while feed.is_some() || stdout.is_some() || stderr.is_some() {
            // poll skips entries with a negative descriptor, so inactive channels keep their slot.
            let mut fds = [
                poll_entry(feed.as_ref().map(|f| &f.fd), POLLOUT),
                poll_entry(stdout.as_ref(), POLLIN),
                poll_entry(stderr.as_ref(), POLLIN),
            ];

            // SAFETY: fds is a valid array of fds.len() pollfd structs.
            let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as nfds_t, timeout) };
            if ready == -1 {
                match os::err_no() {
                    EINTR | EAGAIN => continue,
                    ENOMEM =>         Err(OOMError)?,
                    EFAULT =>         BadAddrPanic.panic(),
                    EINVAL =>         InvalidArgPanic.panic(),
                    e =>              UnexpectedErrorPanic(e).panic(),
                }
            }
            if ready == 0 {
                log::trace!("no activity from pid {} within {:?}", popen.pid(), self.timeout);
                continue;
            }

            let [stdin_events, stdout_events, stderr_events] = fds.map(|entry| entry.revents);
            self.feed_stdin(&mut feed, stdin_events)?;
            drain(Channel::Stdout, &mut stdout, &mut out, &mut chunk, stdout_events)?;
            drain(Channel::Stderr, &mut stderr, &mut err, &mut chunk, stderr_events)?;
        }

        let code = popen.wait()?;
        Ok(Communication {
            code,
            stdout: out,
            stderr: err,
        })
    }

    fn feed_stdin(&self, feed: &mut Option<Feed<'_>>, events: c_short) -> Result<(), CommunicateError> {
        let Some(active) = feed.as_mut() else { return Ok(()) };

        if events & POLLNVAL != 0 {
            log::warn!("stdin pipe {:?} is no longer a valid descriptor", active.fd);
            if let Some(active) = feed.take() {
                active.fd.discard();
            }
            return Ok(());
        }
        if events & POLLERR != 0 {
            log::debug!("child closed its stdin with {} bytes unsent", active.remaining());
            return finish(feed);
        }
        if events & POLLOUT == 0 {
            return Ok(());
        }

        let end = cmp::min(active.offset + self.write_chunk, active.input.len());
        match active.fd.write(&active.input[active.offset..end]) {
            Ok(count) => {
                log::trace!("wrote {} bytes to stdin", count);
                active.offset += count;
            },
            Err(EINTR | EAGAIN) => {},
            Err(EPIPE) => {
                log::debug!("child closed its stdin with {} bytes unsent", active.remaining());
                return finish(feed);
            },
            Err(EBADF) => {
                if let Some(active) = feed.take() {
                    active.fd.discard();
                }
                return Ok(());
            },
            Err(EIO) => Err(IOError)?,
            Err(e) =>   UnexpectedErrorPanic(e).panic(),
        }

        if active.remaining() == 0 {
            // All sent, closing tells the child there is nothing more to read.
            return finish(feed);
        }
        Ok(())
    }
}

/// Input still to be written to the child's stdin.
struct Feed<'i> {
    fd: Fd,
    input: &'i [u8],
    offset: usize,
}

impl Feed<'_> {
    const fn remaining(&self) -> usize {
        self.input.len() - self.offset
    }
}

fn finish(feed: &mut Option<Feed<'_>>) -> Result<(), CommunicateError> {
    if let Some(done) = feed.take() {
        done.fd.close()?;
    }
    Ok(())
}

fn poll_entry(fd: Option<&Fd>, events: c_short) -> pollfd {
    pollfd {
        fd: fd.map_or(-1, |fd| **fd),
        events,
        revents: 0,
    }
}

fn drain(
    channel: Channel,
    source: &mut Option<Fd>,
    sink: &mut Vec<u8>,
    chunk: &mut [u8],
    events: c_short,
) -> Result<(), CommunicateError> {
    let Some(fd) = source.as_ref() else { return Ok(()) };

    if events & POLLNVAL != 0 {
        log::warn!("{} pipe {:?} is no longer a valid descriptor", channel, fd);
        if let Some(fd) = source.take() {
            fd.discard();
        }
        return Ok(());
    }
    // A hang up still has to be read through, there may be data left before EOF.
    if events & (POLLIN | POLLHUP | POLLERR) == 0 {
        return Ok(());
    }

    match fd.read(chunk) {
        Ok(0) => {
            log::debug!("{} closed by child after {} bytes", channel, sink.len());
            if let Some(fd) = source.take() {
                fd.close()?;
            }
        },
        Ok(count) => {
            log::trace!("read {} bytes from {}", count, channel);
            sink.extend_from_slice(&chunk[..count]);
        },
        Err(EINTR | EAGAIN) => {},
        Err(EBADF) => {
            if let Some(fd) = source.take() {
                fd.discard();
            }
        },
        Err(EIO) => Err(IOError)?,
        Err(e) =>   UnexpectedErrorPanic(e).panic(),
    }
    Ok(())
}

impl Popen {
    /// Writes `input` to the child's stdin while collecting its stdout and stderr, then waits for
    /// it to exit. Only piped channels take part: input for an unpiped stdin is ignored, and
    /// unpiped output channels come back empty.
    ///
    /// An empty `input` closes stdin straight away, so the child reads EOF.
    ///
    /// # Examples
    /// ```
    /// # use pipework::process::{Popen, PIPE};
    /// let mut p = Popen::spawn_with(["sh", "-c", "read name; echo hi $name"], PIPE, PIPE, PIPE)
    ///     .unwrap();
    /// let out = p.communicate(b"there\n").unwrap();
    /// assert!(out.success());
    /// assert_eq!(out.stdout_text(), "hi there\n");
    /// ```
    pub fn communicate(&mut self, input: &[u8]) -> Result<Communication, CommunicateError> {
        CommunicateOptions::new().run(self, Some(input))
    }

    /// Collects the child's stdout and stderr until both are closed, then waits for it to exit.
    ///
    /// A stdin pipe is left open: a child that reads its stdin blocks until
    /// [`close_stdin`](Popen::close_stdin) is called.
    pub fn communicate_output(&mut self) -> Result<Communication, CommunicateError> {
        CommunicateOptions::new().run(self, None)
    }
}
