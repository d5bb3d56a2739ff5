//! # Services
//!
//! - [`Discovery`] owns the local key, answers discovery packets, performs
//!   ping / find-node requests and publishes discovered nodes.
//! - [`Finder`] decides which discovered nodes to connect to, putting
//!   elected block producers first.
//!
//! Both are shared through `Arc` and run their loops on tokio tasks.

mod correlator;
pub mod discovery;
pub mod finder;

pub use discovery::{Discovery, DiscoveryError};
pub use finder::{Finder, ObserverCallback};
