use thiserror::Error;

/// Errors returned by [`TtlStore`] operations.
///
/// The only failure mode is caller misuse: an empty key or a null-sentinel
/// value argument. Lookup misses, updates on absent keys and removals of
/// absent keys are expressed through return values, not errors.
///
/// [`TtlStore`]: crate::TtlStore
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required argument was empty or absent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// A specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
