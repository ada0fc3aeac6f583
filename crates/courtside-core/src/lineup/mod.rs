// Lineup-to-result pipeline: court assignment, set scoring, match
// aggregation and the transactional save protocol.

pub mod aggregate;
pub mod availability;
pub mod board;
pub mod gesture;
pub mod save;
pub mod scores;
pub mod session;
