//! k-mer annotation engine for a de Bruijn graph: a data plane that tags
//! DBG edges with multi-label column vectors and compresses them with two
//! complementary back-ends (an exact hash annotator and a
//! topology-corrected approximate Bloom-filter annotator), plus a
//! succinct wavelet-trie store for the same column vectors.
//!
//! Out of scope: a CLI driver, file-I/O wrappers beyond the binary contract
//! in [`serialize`], DBG construction from raw reads, and approximate
//! k-mer query.

pub mod alphabet;
pub mod annotation;
pub mod bigint_ext;
pub mod bloom;
pub mod dbg;
pub mod error;
pub mod hash;
pub mod serialize;
pub mod wavelet_trie;

pub use annotation::bloom_annotation::{BloomAnnotation, BloomAnnotator, FalsePositiveReport};
pub use annotation::exact::{ExactAnnotation, ExactAnnotator};
pub use annotation::Column;
pub use bloom::BloomFilter;
pub use dbg::{DeBruijnGraph, EdgeIndex, HashDBG};
pub use error::{AnnotationError, Result};
pub use hash::HashFamily;
pub use wavelet_trie::WaveletTrie;
