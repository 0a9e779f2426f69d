#![warn(missing_docs)]

pub mod error;
pub mod os;
pub mod panic;
