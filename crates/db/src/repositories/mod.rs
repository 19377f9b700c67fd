//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! a `&mut PgConnection` first, so callers can run several of them inside
//! one transaction.

pub mod page_repo;
pub mod page_version_repo;

pub use page_repo::PageRepo;
pub use page_version_repo::PageVersionRepo;
