pub mod engine;
pub mod matching;

pub use engine::{candidate_search, find_original, mark_as_duplicate, CorpusConstraint};
pub use matching::matches;
