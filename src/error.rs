use thiserror::Error;

/// Errors surfaced by the DBG, annotator and wavelet-trie APIs.
///
/// `invariant-violated` (exact annotation disagreeing with Bloom) is
/// deliberately absent here: per spec it is counted, never raised, and
/// shows up only in [`crate::annotation::bloom_annotation::FalsePositiveReport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("unknown k-mer: {0:?} is not present in the de Bruijn graph")]
    UnknownKmer(String),

    #[error("index out of range: {index} is not in [0, {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("format error: {0}")]
    Format(String),

    #[error("precondition violated: {0}")]
    PreconditionViolated(String),
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
