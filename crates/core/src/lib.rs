//! Pagesync domain core.
//!
//! Page model, root-prop translation, the homepage invariant, access
//! policy and the page lifecycle controller. Persistence is abstracted
//! behind [`store::DocumentStore`]; the in-memory implementation lives here,
//! the Postgres one in `pagesync-db`.

pub mod access;
pub mod error;
pub mod field_path;
pub mod homepage;
pub mod lifecycle;
pub mod page;
pub mod pagination;
pub mod request;
pub mod roles;
pub mod root_props;
pub mod store;
pub mod types;

pub use error::CoreError;
pub use lifecycle::PageLifecycle;
