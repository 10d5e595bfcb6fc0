//! Durable contact storage and the sync run log.

pub mod memory;
pub mod sqlite;
pub mod traits;
