//! Merge join over two relations already sorted by key.

pub mod merge;

pub use merge::{count_matches, merge_join, JoinedTuple, MergeJoinIter, MergeJoinStage};
