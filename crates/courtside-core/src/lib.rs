// Library root: re-exports all modules so integration tests and the
// `courtside` binary can reach the crate's public API.

pub mod config;
pub mod db;
pub mod lineup;
pub mod model;
pub mod notify;
pub mod store;
