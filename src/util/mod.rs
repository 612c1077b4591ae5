//! Utility modules for tagmend.
//!
//! Contains the `Name`/`Context` interner and qualified-name helpers.

pub mod intern;
pub mod qname;
