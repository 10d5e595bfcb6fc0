//! Optional connectors implementing the `ContactSource` trait.

#[cfg(feature = "hubspot")]
pub mod hubspot;
#[cfg(feature = "json_file")]
pub mod json_file;
