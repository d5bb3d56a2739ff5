//! Node Table
//!
//! In-memory Kademlia table of discovered nodes: 256 buckets indexed by the
//! first differing bit between the local id and the node id.

mod bucket;
mod table;

pub use bucket::{InsertOutcome, KBucket};
pub use table::{NodeBuckets, NUM_BUCKETS};

#[cfg(test)]
mod tests;
