use std::fmt::{self, Display, Formatter};
use std::os::fd::AsRawFd;

use libc::c_int;

use crate::io::{Fd, FdRef};

/// One of a process's three standard channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdin,
    Stdout,
    Stderr,
}

impl Channel {
    /// The descriptor number the channel occupies in the child.
    pub const fn fd(self) -> c_int {
        match self {
            Channel::Stdin => libc::STDIN_FILENO,
            Channel::Stdout => libc::STDOUT_FILENO,
            Channel::Stderr => libc::STDERR_FILENO,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Stdin => "stdin",
            Channel::Stdout => "stdout",
            Channel::Stderr => "stderr",
        })
    }
}

/// The special targets a [`Redirection`] can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No redirection, the child inherits the parent's descriptor.
    None,
    /// Only valid for stderr: send it wherever stdout goes.
    Stdout,
    /// Connect the channel to a pipe between parent and child.
    Pipe,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Kind<'a> {
    None,
    Stdout,
    Pipe,
    PipeEnd(FdRef<'a>),
    /// A pipe end taken over from another launcher, closed in the parent once the child has it.
    TakenPipeEnd(Fd),
    OutputFile(FdRef<'a>),
    InputFile(FdRef<'a>),
}

impl Display for Kind<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Kind::None => write!(f, "no redirection"),
            Kind::Stdout => write!(f, "stdout"),
            Kind::Pipe => write!(f, "new pipe"),
            Kind::PipeEnd(fd) => write!(f, "pipe end (fd {})", fd.raw()),
            Kind::TakenPipeEnd(fd) => write!(f, "taken pipe end (fd {})", **fd),
            Kind::OutputFile(fd) => write!(f, "output file (fd {})", fd.raw()),
            Kind::InputFile(fd) => write!(f, "input file (fd {})", fd.raw()),
        }
    }
}

/// Describes what one of a child's standard channels should be connected to, without touching
/// the OS. Pipes are only created once the redirection is handed to
/// [`Popen::spawn_with`](super::Popen::spawn_with).
///
/// File redirections borrow an already-open handle, and redirections returned by
/// [`Popen::stdout_pipe`](super::Popen::stdout_pipe) borrow a pipe end owned by that launcher, so
/// the borrow checker guarantees the descriptor outlives every Redirection referring to it.
/// [`Popen::take_stdout_pipe`](super::Popen::take_stdout_pipe) is the one exception: it moves the
/// pipe end into the Redirection, and the launcher it is given to closes the parent's copy as soon
/// as the child is running.
///
/// # Examples
/// ```
/// # use pipework::process::{Redirection, Target, NONE, PIPE};
/// assert!(PIPE.is_pipe());
/// assert_eq!(Redirection::from(Target::None), NONE);
///
/// let log = tempfile::tempfile().unwrap();
/// let to_log = Redirection::output(&log);
/// assert!(to_log.is_output_file());
/// assert_eq!(to_log.target(), Target::None);
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Redirection<'a>(Kind<'a>);

/// Leave the channel alone.
pub const NONE: Redirection<'static> = Redirection(Kind::None);
/// Merge stderr into whatever stdout is connected to.
pub const STDOUT: Redirection<'static> = Redirection(Kind::Stdout);
/// Create a new pipe between parent and child.
pub const PIPE: Redirection<'static> = Redirection(Kind::Pipe);

impl<'a> Redirection<'a> {
    /// Redirects a channel into an open, writable file. The child writes into it.
    pub fn output<F: AsRawFd + ?Sized>(file: &'a F) -> Redirection<'a> {
        Redirection(Kind::OutputFile(FdRef::of(file)))
    }

    /// Redirects a channel from an open, readable file. The child reads from it.
    pub fn input<F: AsRawFd + ?Sized>(file: &'a F) -> Redirection<'a> {
        Redirection(Kind::InputFile(FdRef::of(file)))
    }

    pub(crate) const fn pipe_end(fd: FdRef<'a>) -> Redirection<'a> {
        Redirection(Kind::PipeEnd(fd))
    }

    pub(crate) const fn taken_pipe_end(fd: Fd) -> Redirection<'static> {
        Redirection(Kind::TakenPipeEnd(fd))
    }

    pub(crate) fn into_kind(self) -> Kind<'a> {
        self.0
    }

    pub const fn is_none(&self) -> bool {
        matches!(self.0, Kind::None)
    }

    pub const fn is_stdout(&self) -> bool {
        matches!(self.0, Kind::Stdout)
    }

    /// True for a fresh [`PIPE`] and for a pipe end handed out by another launcher.
    pub const fn is_pipe(&self) -> bool {
        matches!(self.0, Kind::Pipe | Kind::PipeEnd(_) | Kind::TakenPipeEnd(_))
    }

    pub const fn is_output_file(&self) -> bool {
        matches!(self.0, Kind::OutputFile(_))
    }

    pub const fn is_input_file(&self) -> bool {
        matches!(self.0, Kind::InputFile(_))
    }

    /// The special target this redirection was built from. File redirections report
    /// [`Target::None`].
    pub const fn target(&self) -> Target {
        match self.0 {
            Kind::Stdout => Target::Stdout,
            Kind::Pipe | Kind::PipeEnd(_) | Kind::TakenPipeEnd(_) => Target::Pipe,
            Kind::None | Kind::OutputFile(_) | Kind::InputFile(_) => Target::None,
        }
    }

    /// The borrowed file handle for file redirections.
    pub const fn file(&self) -> Option<FdRef<'a>> {
        match self.0 {
            Kind::OutputFile(fd) | Kind::InputFile(fd) => Some(fd),
            _ => None,
        }
    }

    /// The existing pipe descriptor for redirections handed out by a launcher, or `-1`.
    pub const fn fd(&self) -> c_int {
        match &self.0 {
            Kind::PipeEnd(fd) => fd.raw(),
            Kind::TakenPipeEnd(fd) => fd.borrow().raw(),
            _ => -1,
        }
    }
}

impl Default for Redirection<'_> {
    fn default() -> Self {
        NONE
    }
}

impl From<Target> for Redirection<'_> {
    fn from(value: Target) -> Self {
        match value {
            Target::None => NONE,
            Target::Stdout => STDOUT,
            Target::Pipe => PIPE,
        }
    }
}

impl Display for Redirection<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
