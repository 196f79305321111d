use thiserror::Error;

/// The error taxonomy for the simulator: argument errors (bad cache type,
/// unparseable size suffix), trace-format errors (wrong field count,
/// non-integer where an integer is required), and I/O failures reading the
/// trace file or writing report output.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown cache type '{0}'")]
    InvalidCacheType(String),

    #[error("invalid cache size literal '{0}'")]
    InvalidCacheSize(String),

    #[error("malformed trace record at line {line}: {reason}")]
    TraceFormat { line: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
