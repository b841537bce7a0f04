use thiserror::Error;

use crate::parse::ParseError;
use crate::types::{
    ConfigError, ExtractError, InvariantViolation, Location, NormalizeError, ResolveError,
};

/// Unified error type covering every compiler stage and I/O.
///
/// Returned by the [`Compiler`](crate::Compiler) facade, the
/// [`bake`](crate::bake()) pass and convenience constructors like
/// [`Options::from_file()`](crate::Options::from_file).
#[derive(Debug, Error)]
pub enum StyleBakeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{location}: {source}")]
    Normalize {
        location: Location,
        source: NormalizeError,
    },

    #[error("internal error: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
