//! The fork/exec half of [`Popen`](super::Popen): turning three [`Redirection`]s into concrete
//! descriptors, then forking and wiring them onto the child's standard channels.

use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use libc::{EAGAIN, ENOMEM, STDERR_FILENO, c_char, c_int, pid_t};

use super::redirection::Kind;
use super::{Channel, EXEC_FAILURE_CODE, ForkError, InvalidRedirectionError, Redirection, SpawnError};
use crate::io::{Fd, Pipe};
use crate::util::error::{EmptyCommandError, NulByteError, OOMError, ProcessLimitError};
use crate::util::os;
use crate::util::panic::{Panic, UnexpectedErrorPanic};

/// An argument vector converted to C strings ahead of forking, so the child never allocates.
#[derive(Debug)]
pub(crate) struct Command {
    args: Vec<CString>,
    // Null-terminated pointers into args. The CStrings own heap buffers, which don't move when
    // args itself is moved.
    argv: Vec<*const c_char>,
}

impl Command {
    pub fn new<I, S>(args: I) -> Result<Command, SpawnError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args = args
            .into_iter()
            .map(|arg| CString::new(arg.as_ref().as_bytes()).map_err(|_| NulByteError))
            .collect::<Result<Vec<_>, _>>()?;

        if args.is_empty() {
            Err(EmptyCommandError)?
        }

        let argv = args.iter()
            .map(|arg| arg.as_ptr())
            .chain([ptr::null()])
            .collect();

        Ok(Command { args, argv })
    }

    pub fn args(&self) -> &[CString] {
        &self.args
    }
}

/// The descriptors a child needs, computed in the parent before forking.
#[derive(Debug, Default)]
pub(crate) struct Wiring {
    /// What to install on fds 0, 1 and 2 of the child, indexed by channel number.
    pub targets: [Option<c_int>; 3],
    /// Parent end of the stdin pipe (write side).
    pub stdin: Option<Fd>,
    /// Parent end of the stdout pipe (read side).
    pub stdout: Option<Fd>,
    /// Parent end of the stderr pipe (read side).
    pub stderr: Option<Fd>,
    /// Child ends of pipes created here. The parent closes them once the child has its copies.
    pub child_ends: Vec<Fd>,
}

impl Wiring {
    pub fn new(
        stdin: Redirection<'_>,
        stdout: Redirection<'_>,
        stderr: Redirection<'_>,
    ) -> Result<Wiring, SpawnError> {
        let mut wiring = Wiring::default();

        wiring.targets[1] = match stdout.into_kind() {
            Kind::None => None,
            Kind::OutputFile(file) => Some(file.raw()),
            Kind::Pipe => {
                let (read, write) = Pipe::new()?.into_parts();
                wiring.stdout = Some(read);
                Some(wiring.keep_child_end(write))
            },
            other => Err(invalid(Channel::Stdout, &other))?,
        };

        wiring.targets[2] = match stderr.into_kind() {
            Kind::None => None,
            Kind::OutputFile(file) => Some(file.raw()),
            // Shares stdout's descriptor, so both land in the same stream in write order.
            Kind::Stdout => wiring.targets[1],
            Kind::Pipe => {
                let (read, write) = Pipe::new()?.into_parts();
                wiring.stderr = Some(read);
                Some(wiring.keep_child_end(write))
            },
            other => Err(invalid(Channel::Stderr, &other))?,
        };

        wiring.targets[0] = match stdin.into_kind() {
            Kind::None => None,
            Kind::InputFile(file) => Some(file.raw()),
            // Chained from another launcher's output, no new pipe needed.
            Kind::PipeEnd(end) => Some(end.raw()),
            // Ours now: once the child has it, the writer upstream must only see this reader.
            Kind::TakenPipeEnd(end) => Some(wiring.keep_child_end(end)),
            Kind::Pipe => {
                let (read, write) = Pipe::new()?.into_parts();
                wiring.stdin = Some(write);
                Some(wiring.keep_child_end(read))
            },
            other => Err(invalid(Channel::Stdin, &other))?,
        };

        Ok(wiring)
    }

    fn keep_child_end(&mut self, fd: Fd) -> c_int {
        let raw = *fd;
        self.child_ends.push(fd);
        raw
    }

    fn parent_ends(&self) -> [c_int; 3] {
        [&self.stdin, &self.stdout, &self.stderr].map(|end| end.as_ref().map_or(-1, |fd| **fd))
    }
}

fn invalid(channel: Channel, redirection: &Kind<'_>) -> InvalidRedirectionError {
    InvalidRedirectionError {
        channel,
        redirection: redirection.to_string(),
    }
}

/// Forks and execs `command` in the child with `wiring` applied. Returns the child's pid in the
/// parent; never returns in the child.
pub(crate) fn fork_exec(command: &Command, wiring: &Wiring) -> Result<pid_t, ForkError> {
    let parent_ends = wiring.parent_ends();

    // SAFETY: The child branch only makes async-signal-safe calls before exec or _exit.
    match unsafe { libc::fork() } {
        -1 => Err(match os::err_no() {
            EAGAIN => ProcessLimitError.into(),
            ENOMEM => OOMError.into(),
            e =>      UnexpectedErrorPanic(e).panic(),
        }),
        // SAFETY: We are the freshly forked child.
        0 => unsafe { exec_child(command, parent_ends, wiring.targets) },
        pid => Ok(pid),
    }
}

/// Runs in the child between fork and exec. Only async-signal-safe calls are allowed here: no
/// allocation, no locking, no logging and no panicking.
///
/// # Safety
/// Must only be called in a child process directly after fork.
unsafe fn exec_child(command: &Command, parent_ends: [c_int; 3], mut targets: [Option<c_int>; 3]) -> ! {
    for end in parent_ends {
        if end >= 0 {
            // SAFETY: These ends belong to the parent, the child's copies are unused.
            unsafe { libc::close(end) };
        }
    }

    // A standard descriptor used as the source of another channel would be overwritten before
    // it is read (stderr sent to the parent's stdout while stdout goes elsewhere), so move every
    // such source out of the way first.
    for channel in 0..3 {
        let Some(source) = targets[channel] else { continue };
        if source > STDERR_FILENO || source == channel as c_int {
            continue;
        }
        // SAFETY: F_DUPFD_CLOEXEC only creates a new descriptor, the lowest free one above 2.
        let moved = unsafe { libc::fcntl(source, libc::F_DUPFD_CLOEXEC, STDERR_FILENO + 1) };
        if moved == -1 {
            // SAFETY: _exit is always safe to call and never returns.
            unsafe { libc::_exit(EXEC_FAILURE_CODE) }
        }
        for target in targets.iter_mut().filter(|target| **target == Some(source)) {
            *target = Some(moved);
        }
    }

    for channel in [Channel::Stdout, Channel::Stderr, Channel::Stdin] {
        let Some(source) = targets[channel.fd() as usize] else { continue };
        let installed = if source == channel.fd() {
            // dup2 is a no-op here and wouldn't clear close-on-exec, so do it by hand.
            // SAFETY: F_GETFD/F_SETFD only touch the descriptor flags.
            unsafe {
                let flags = libc::fcntl(source, libc::F_GETFD);
                libc::fcntl(source, libc::F_SETFD, flags & !libc::FD_CLOEXEC)
            }
        } else {
            // SAFETY: dup2 only replaces the child's copy of the channel.
            unsafe { libc::dup2(source, channel.fd()) }
        };
        if installed == -1 {
            // SAFETY: _exit is always safe to call and never returns.
            unsafe { libc::_exit(EXEC_FAILURE_CODE) }
        }
    }

    for (i, source) in targets.iter().enumerate() {
        let Some(source) = *source else { continue };
        // Skip the standard channels themselves and descriptors already closed for an earlier
        // channel (stderr merged into stdout).
        if source > STDERR_FILENO && !targets[..i].contains(&Some(source)) {
            // SAFETY: The original has been duplicated onto its channel and isn't needed.
            unsafe { libc::close(source) };
        }
    }

    // SAFETY: Restoring the default disposition is async-signal-safe; the child program expects
    // to be killed by writes to a closed pipe like any other process.
    unsafe { libc::signal(libc::SIGPIPE, libc::SIG_DFL) };

    // SAFETY: argv is a valid null-terminated array of pointers to nul-terminated strings, which
    // outlive the call.
    unsafe { libc::execvp(command.argv[0], command.argv.as_ptr()) };

    // SAFETY: _exit is always safe to call and never returns.
    unsafe { libc::_exit(EXEC_FAILURE_CODE) }
}
