use derive_more::{Display, Error, From};

use crate::util::error::{FileCountError, IOError, InterruptError, StorageExhaustedError};

#[derive(Debug, Display, Clone, From, Error)]
pub enum CloseError {
    Interrupt(InterruptError),
    IO(IOError),
    StorageExhausted(StorageExhaustedError),
}

#[derive(Debug, Display, Clone, From, Error)]
pub enum PipeError {
    FileCount(FileCountError),
}
