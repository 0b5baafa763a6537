//! Shared plumbing for the counter workspace: logging setup and the table
//! naming function applied when the schema is prepared.

pub mod naming;
pub mod utils;

pub use naming::NamingError;
