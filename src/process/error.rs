use derive_more::{Display, Error, From};

use super::Channel;
use crate::io::{CloseError, PipeError};
use crate::util::error::{
    EmptyCommandError, FileCountError, IOError, InterruptError, NoChildError, NulByteError,
    OOMError, ProcessLimitError, StorageExhaustedError,
};

#[derive(Debug, Display, Clone, Error)]
#[display("{redirection} can't be used to redirect {channel}")]
pub struct InvalidRedirectionError {
    pub channel: Channel,
    pub redirection: String,
}

#[derive(Debug, Display, Clone, From, Error)]
pub enum ForkError {
    ProcessLimit(ProcessLimitError),
    OOM(OOMError),
}

#[derive(Debug, Display, Clone, From, Error)]
pub enum SpawnError {
    EmptyCommand(EmptyCommandError),
    NulByte(NulByteError),
    InvalidRedirection(InvalidRedirectionError),
    FileCount(FileCountError),
    ProcessLimit(ProcessLimitError),
    OOM(OOMError),
}

impl From<PipeError> for SpawnError {
    fn from(value: PipeError) -> Self {
        match value {
            PipeError::FileCount(e) => e.into(),
        }
    }
}

impl From<ForkError> for SpawnError {
    fn from(value: ForkError) -> Self {
        match value {
            ForkError::ProcessLimit(e) => e.into(),
            ForkError::OOM(e) => e.into(),
        }
    }
}

#[derive(Debug, Display, Clone, From, Error)]
pub enum WaitError {
    NoChild(NoChildError),
}

#[derive(Debug, Display, Clone, From, Error)]
pub enum CommunicateError {
    Interrupt(InterruptError),
    IO(IOError),
    OOM(OOMError),
    StorageExhausted(StorageExhaustedError),
    NoChild(NoChildError),
}

impl From<CloseError> for CommunicateError {
    fn from(value: CloseError) -> Self {
        match value {
            CloseError::Interrupt(e) => e.into(),
            CloseError::IO(e) => e.into(),
            CloseError::StorageExhausted(e) => e.into(),
        }
    }
}

impl From<WaitError> for CommunicateError {
    fn from(value: WaitError) -> Self {
        match value {
            WaitError::NoChild(e) => e.into(),
        }
    }
}
