//! Persistence model of the counter workspace: the `counter` entity, the JSON
//! documents stored in its text columns, and connection helpers.

pub mod errors;
pub mod db;
pub mod json_text;
pub mod custom_fields;
pub mod part;
pub mod counter;

#[cfg(test)]
mod tests;
