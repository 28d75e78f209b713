//! # Folio Common Library
//!
//! Shared code for the folio metadata compilation workspace including:
//! - Error and result types
//! - Configuration file loading and root folder resolution
//! - Publisher → imprint → tranche scope resolution
//! - ISBN check digit utilities

pub mod config;
pub mod error;
pub mod isbn;
pub mod scope;

pub use error::{Error, Result};
pub use scope::{ConfigLayer, ResolvedConfig, ScopeIdentity, ScopedConfig};
