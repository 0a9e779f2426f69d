use derive_more::{Display, Error};

#[derive(Debug, Display, Clone, Error)]
#[display("interrupted by signal")]
pub struct InterruptError;

#[derive(Debug, Display, Clone, Error)]
#[display("error during I/O")]
pub struct IOError;

#[derive(Debug, Display, Clone, Error)]
#[display("available storage space exhausted")]
pub struct StorageExhaustedError;

#[derive(Debug, Display, Clone, Error)]
#[display("out of memory")]
pub struct OOMError;

#[derive(Debug, Display, Clone, Error)]
#[display("exceeded open file limit")]
pub struct FileCountError;

#[derive(Debug, Display, Clone, Error)]
#[display("exceeded process limit for user")]
pub struct ProcessLimitError;

#[derive(Debug, Display, Clone, Error)]
#[display("process has no child with the requested id")]
pub struct NoChildError;

#[derive(Debug, Display, Clone, Error)]
#[display("command must contain at least the program name")]
pub struct EmptyCommandError;

#[derive(Debug, Display, Clone, Error)]
#[display("command argument contains an interior nul byte")]
pub struct NulByteError;
