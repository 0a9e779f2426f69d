//! Spawning child processes and talking to them over pipes.
//!
//! A [`Popen`] forks and execs a program with each of its standard channels connected according
//! to a [`Redirection`]: left alone, merged into stdout, read from or written to an open file,
//! or connected to a pipe. Piped output can be handed on as another child's stdin
//! ([`Popen::take_stdout_pipe`]), and [`Popen::communicate`] exchanges data with a child over all of
//! its pipes at once without deadlocking.
//!
//! # Ownership
//! Every pipe end the parent keeps is an [`Fd`](crate::io::Fd) owned by the Popen that created
//! it, so it is closed exactly once. Redirections borrow descriptors, except for a pipe end taken
//! from a Popen, which the next launcher closes in the parent once its child is running.
//!
//! # Failures
//! Failing to create a pipe or fork is reported as a [`SpawnError`]. Failing to exec is not: the
//! child exits with [`EXEC_FAILURE_CODE`] and the parent only sees that exit code.

mod communicate;
mod error;
mod popen;
mod redirection;
mod spawn;
mod status;

pub use communicate::*;
pub use error::*;
pub use popen::*;
pub use redirection::*;
pub use status::*;
