// src/core/search/mod.rs

//! Neighbor search engines and the traversals they run.

pub mod candidate;
pub mod engine;
pub mod leaf;
pub mod searcher;
pub mod spill;
mod traversal;

pub use candidate::CandidateList;
pub use engine::{NeighborSearch, ReferenceState, TreeHandle};
pub use leaf::LeafSearch;
pub use searcher::NeighborSearcher;
pub use spill::SpillSearch;
pub use traversal::SearchStats;

#[cfg(test)]
mod tests {
    mod test_agreement;
    mod test_approximate;
    mod test_degenerate;
    mod test_engine;
    mod test_spill;
}
