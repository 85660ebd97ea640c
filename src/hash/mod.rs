//! Incremental state hashing.

mod zobrist;

pub use zobrist::{compute_full_hash, update_hash_token_placement, Fact, ZobristTable};
