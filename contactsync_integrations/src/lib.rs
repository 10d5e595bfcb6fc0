//! External contact source adapters for contactsync.

pub mod connectors;
