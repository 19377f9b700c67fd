//! Row structs for the page tables.
//!
//! Each submodule holds a `FromRow` struct matching the table's column list
//! and the conversion into the core document types.

pub mod page;
pub mod page_version;
