//! The Radix Instruction Index (§4.C): a shared structure between the
//! Skeleton Store (registers prefixes) and the Hierarchy Reconstruction
//! Engine (looks them up).

mod trie;

pub use trie::{RadixIndex, RadixStats};
