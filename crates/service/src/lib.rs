//! Service layer over the counter model.
//! - `counter_service`: transactional operations returning `Result`.
//! - `CounterStore`: the caller-facing store that logs failures and answers
//!   with `bool` / `Option`.

pub mod errors;
pub mod pagination;
pub mod counter_service;
pub mod counter_store;
#[cfg(test)]
pub mod test_support;

pub use counter_store::CounterStore;
pub use errors::ServiceError;
pub use models::counter::{Model as Counter, Tally};
pub use models::part::PartTally;
pub use pagination::{Page, Pagination};
