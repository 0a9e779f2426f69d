//! Owned and borrowed file descriptors, plus the pipes built from them.
//!
//! [`Fd`] is the only type in this crate that closes a descriptor. It can't be copied or cloned,
//! so every descriptor is closed exactly once: when the `Fd` is dropped or explicitly
//! [`close`](Fd::close)d. Anything that needs to refer to a descriptor without owning it holds an
//! [`FdRef`], which is tied to its owner's lifetime and never closes anything.

mod error;
mod fd;
mod pipe;
mod tests;

pub use error::*;
pub use fd::*;
pub use pipe::*;
