//! The DBG abstraction: a capability trait any back-end must implement,
//! plus the dense `EdgeIndex` id space. Expressed as a trait rather than a
//! concrete struct, so annotators never depend on `HashDBG` directly (a
//! succinct back-end could be substituted without touching them).

pub mod hash_dbg;

use crate::alphabet;
use crate::error::Result;

pub use hash_dbg::HashDBG;

/// A dense, stable identifier for a (k+1)-mer edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeIndex(pub usize);

impl EdgeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for EdgeIndex {
    fn from(value: usize) -> Self {
        EdgeIndex(value)
    }
}

/// Capability set any de Bruijn graph back-end must provide.
pub trait DeBruijnGraph {
    /// Node length `k`.
    fn k(&self) -> usize;

    fn num_edges(&self) -> usize;

    fn first_edge(&self) -> EdgeIndex {
        EdgeIndex(0)
    }

    fn last_edge(&self) -> EdgeIndex {
        EdgeIndex(self.num_edges().saturating_sub(1))
    }

    /// Maps any character outside Σ∖{$} to `N`.
    fn encode(&self, seq: &str) -> String {
        alphabet::encode(seq)
    }

    /// If `rooted == false`, prepends `k+1` dummy characters and appends
    /// one; otherwise returns the sequence unchanged. The trait-level
    /// default is identity on both branches; `HashDBG` is the only
    /// implementation in this crate that overrides it with the real
    /// padding policy.
    fn transform(&self, seq: &str, rooted: bool) -> String {
        let _ = rooted;
        seq.to_string()
    }

    /// Exact lookup; fails with `UnknownKmer` when absent.
    fn map_kmer(&self, kmer: &str) -> Result<EdgeIndex>;

    fn node_kmer(&self, e: EdgeIndex) -> String;

    fn edge_label(&self, e: EdgeIndex) -> u8;

    /// True iff `e`'s source node has exactly one outgoing edge.
    fn has_only_outgoing(&self, e: EdgeIndex) -> bool;

    /// True iff `e`'s source node has exactly one incoming edge.
    fn has_only_incoming(&self, e: EdgeIndex) -> bool;

    fn is_dummy_label(&self, c: u8) -> bool {
        alphabet::is_dummy_label(c)
    }

    fn is_dummy_edge(&self, kmer: &str) -> bool {
        alphabet::is_dummy_edge(kmer)
    }

    /// The unique id of the edge reached from `e` along outgoing
    /// transition `c`. Precondition: such a neighbour exists.
    fn next_edge(&self, e: EdgeIndex, c: u8) -> Result<EdgeIndex>;

    /// The unique id of the edge preceding `e`. Precondition: such a
    /// neighbour exists.
    fn prev_edge(&self, e: EdgeIndex) -> Result<EdgeIndex>;
}
