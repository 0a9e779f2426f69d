use std::ffi::OsStr;

use libc::{ECHILD, EINTR, EINVAL, WNOHANG, c_int, pid_t};

use super::spawn::{self, Command, Wiring};
use super::{ExitStatus, NONE, Redirection, STILL_RUNNING, SpawnError, WaitError};
use crate::io::{CloseError, Fd, FdRef};
use crate::util::error::NoChildError;
use crate::util::os;
use crate::util::panic::{InvalidArgPanic, Panic, UnexpectedErrorPanic};

/// A spawned child process.
///
/// Construction forks and execs the child straight away and returns without waiting for it. The
/// parent-side ends of any pipes requested through [`Redirection`]s are owned by the Popen and
/// closed when it is dropped (or earlier, by [`communicate`](Popen::communicate)).
///
/// Dropping a Popen doesn't wait for the child. Call [`wait`](Popen::wait) to reap it.
///
/// # Examples
/// ```
/// # use pipework::process::{Popen, NONE, PIPE};
/// let mut ls = Popen::spawn_with(["printf", "a.sh\nb.txt\nc.sh\n"], NONE, PIPE, NONE).unwrap();
/// let mut grep = Popen::spawn_with(["grep", "-c", ".sh"], ls.take_stdout_pipe(), PIPE, NONE)
///     .unwrap();
///
/// let out = grep.communicate_output().unwrap();
/// assert_eq!(out.code, 0);
/// assert_eq!(out.stdout, b"2\n");
/// assert_eq!(ls.wait().unwrap(), 0);
/// ```
#[derive(Debug)]
pub struct Popen {
    pid: pid_t,
    status: Option<ExitStatus>,
    pub(crate) stdin: Option<Fd>,
    pub(crate) stdout: Option<Fd>,
    pub(crate) stderr: Option<Fd>,
}

impl Popen {
    /// Spawns `args` with no redirections. The first argument is the program, looked up through
    /// `PATH`; every argument is passed to it verbatim.
    pub fn spawn<I, S>(args: I) -> Result<Popen, SpawnError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Popen::spawn_with(args, NONE, NONE, NONE)
    }

    /// Spawns `args` with each standard channel connected according to its [`Redirection`].
    ///
    /// A program that can't be executed isn't reported here: the child exits with
    /// [`EXEC_FAILURE_CODE`](super::EXEC_FAILURE_CODE) instead.
    pub fn spawn_with<I, S>(
        args: I,
        stdin: Redirection<'_>,
        stdout: Redirection<'_>,
        stderr: Redirection<'_>,
    ) -> Result<Popen, SpawnError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let command = Command::new(args)?;
        log::debug!(
            "spawning {:?} (stdin: {}, stdout: {}, stderr: {})",
            command.args(), stdin, stdout, stderr
        );

        let wiring = Wiring::new(stdin, stdout, stderr)?;
        let pid = spawn::fork_exec(&command, &wiring)?;
        log::debug!("spawned pid {} for {:?}", pid, command.args());

        let Wiring { stdin, stdout, stderr, child_ends, .. } = wiring;
        // The child has its own copies now. Ours have to go, or the read ends would never see EOF
        // and a writer upstream of a taken pipe end would never see its reader leave.
        drop(child_ends);

        Ok(Popen {
            pid,
            status: None,
            stdin,
            stdout,
            stderr,
        })
    }

    pub const fn pid(&self) -> pid_t {
        self.pid
    }

    /// The exit status, if the child has already been seen to terminate.
    pub const fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// The cached exit code, or [`STILL_RUNNING`]. Never asks the OS.
    pub fn returncode(&self) -> i32 {
        self.status.map_or(STILL_RUNNING, ExitStatus::code)
    }

    /// Blocks until the child terminates and returns its exit code. Once known, the code is cached
    /// and returned by every later call without waiting again.
    pub fn wait(&mut self) -> Result<i32, WaitError> {
        if let Some(status) = self.status {
            return Ok(status.code());
        }
        match self.reap(0)? {
            Some(status) => Ok(status.code()),
            None => unreachable!("blocking waitpid returned without a terminal status"),
        }
    }

    /// Checks once, without blocking, whether the child has terminated. Returns the exit code if
    /// it has (cached, like [`wait`](Popen::wait)), `None` while it is still running.
    pub fn poll(&mut self) -> Result<Option<i32>, WaitError> {
        if let Some(status) = self.status {
            return Ok(Some(status.code()));
        }
        Ok(self.reap(WNOHANG)?.map(ExitStatus::code))
    }

    fn reap(&mut self, options: c_int) -> Result<Option<ExitStatus>, WaitError> {
        let mut raw: c_int = 0;
        loop {
            // SAFETY: raw is a valid out-pointer for the duration of the call.
            let res = unsafe { libc::waitpid(self.pid, &mut raw, options) };
            if res == -1 {
                match os::err_no() {
                    EINTR =>  continue,
                    ECHILD => Err(NoChildError)?,
                    EINVAL => InvalidArgPanic.panic(),
                    e =>      UnexpectedErrorPanic(e).panic(),
                }
            }
            if res == 0 {
                return Ok(None);
            }
            match ExitStatus::from_raw(raw) {
                Some(status) => {
                    log::debug!("reaped pid {}: {}", self.pid, status);
                    self.status = Some(status);
                    return Ok(Some(status));
                },
                None if options & WNOHANG != 0 => return Ok(None),
                None => continue,
            }
        }
    }

    /// A redirection reading from this child's stdout pipe, suitable as another launcher's stdin
    /// (`a | b`). [`NONE`] if stdout isn't piped (or has already been drained or taken).
    ///
    /// The pipe end stays open in this Popen. As long as it does, this child never gets `SIGPIPE`
    /// when the next one stops reading. Use [`take_stdout_pipe`](Popen::take_stdout_pipe) when it
    /// should.
    pub fn stdout_pipe(&self) -> Redirection<'_> {
        Popen::pipe_end(&self.stdout)
    }

    /// Like [`stdout_pipe`](Popen::stdout_pipe), for stderr.
    pub fn stderr_pipe(&self) -> Redirection<'_> {
        Popen::pipe_end(&self.stderr)
    }

    fn pipe_end(end: &Option<Fd>) -> Redirection<'_> {
        end.as_ref().map_or(NONE, |fd| Redirection::pipe_end(fd.borrow()))
    }

    /// Moves this child's stdout pipe into a redirection for another launcher's stdin, the way a
    /// shell builds `a | b`. The launcher it is given to closes the parent's copy right after
    /// forking, so the next child is the only reader left and this one is stopped by `SIGPIPE` if
    /// that reader exits early. [`NONE`] if stdout isn't piped.
    ///
    /// Dropping the returned redirection unused closes the pipe end.
    pub fn take_stdout_pipe(&mut self) -> Redirection<'static> {
        self.stdout.take().map_or(NONE, Redirection::taken_pipe_end)
    }

    /// Like [`take_stdout_pipe`](Popen::take_stdout_pipe), for stderr.
    pub fn take_stderr_pipe(&mut self) -> Redirection<'static> {
        self.stderr.take().map_or(NONE, Redirection::taken_pipe_end)
    }

    /// The parent's end of the stdin pipe, if there is one.
    pub fn stdin(&self) -> Option<FdRef<'_>> {
        self.stdin.as_ref().map(Fd::borrow)
    }

    /// The parent's end of the stdout pipe, if there is one.
    pub fn stdout(&self) -> Option<FdRef<'_>> {
        self.stdout.as_ref().map(Fd::borrow)
    }

    /// The parent's end of the stderr pipe, if there is one.
    pub fn stderr(&self) -> Option<FdRef<'_>> {
        self.stderr.as_ref().map(Fd::borrow)
    }

    /// Closes the stdin pipe, letting the child see EOF. Does nothing if stdin isn't piped.
    pub fn close_stdin(&mut self) -> Result<(), CloseError> {
        match self.stdin.take() {
            Some(fd) => fd.close(),
            None => Ok(()),
        }
    }
}
