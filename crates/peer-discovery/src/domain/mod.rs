//! Domain Layer - Pure logic with no I/O
//!
//! - Node identifiers, addresses and node records
//! - Validator ownership proofs (`node_ext`)
//! - Node descriptor grammar (`descriptor`)
//! - XOR distance and the Kademlia node table

pub mod descriptor;
pub mod node_ext;
pub mod node_table;
pub mod services;
/// Core domain types (entities, values, errors)
pub mod types;

pub use descriptor::parse_node;
pub use node_ext::{parse_node_ext, set_node_ext, EXT_LEN};
pub use node_table::*;
pub use services::*;
pub use types::*;
