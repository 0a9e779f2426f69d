//! This crate spawns child processes and talks to them over pipes.
//!
//! # Purpose
//! Running another program and exchanging data with it looks simple until both directions are
//! needed at once. Writing all of a child's input and then reading its output deadlocks as soon
//! as the output fills the pipe buffer. This crate wires a child's stdin, stdout and stderr to
//! files, pipes or each other, and runs a single readiness loop which keeps every pipe moving.
//!
//! # Method
//! Everything sits directly on top of the POSIX calls: `pipe2`, `fork`, `dup2`, `execvp`,
//! `waitpid` and `poll`, through `libc`'s thin wrappers. There is no shell involved, every
//! argument reaches the child exactly as given.
//!
//! The [`io`] module provides [`Fd`](io::Fd), an owned descriptor that closes itself when dropped,
//! and [`FdRef`](io::FdRef), a borrowed one that never does. Each descriptor has exactly one
//! owner, which is what guarantees that a pipe's reader actually sees EOF once the writer is done.
//!
//! # Error Handling
//! Errors are strongly typed: one zero-sized struct per OS condition, gathered into an enum per
//! operation ([`SpawnError`](process::SpawnError), [`CommunicateError`](process::CommunicateError),
//! ...), using enums for static dispatch rather than dynamic. OS errors that can only come from a
//! bug in this crate (a corrupted descriptor, an invalid flag) panic instead.
//!
//! A program that fails to exec is the one exception: it is not an error for the parent, the
//! child just exits with [`EXEC_FAILURE_CODE`](process::EXEC_FAILURE_CODE).
//!
//! # Logging
//! Spawning, reaping and the communicate loop log through the [`log`] facade. Nothing is printed
//! unless the application installs a logger.
//!
//! # Platform
//! Linux only, for now.
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::missing_const_for_fn)]
#![warn(clippy::missing_panics_doc)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_inception)]
#![cfg(target_os = "linux")]

#[cfg(feature = "process")]
pub mod io;
#[cfg(feature = "process")]
pub mod process;

#[cfg(feature = "process")]
pub(crate) mod util;
