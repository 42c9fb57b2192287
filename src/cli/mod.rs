pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod start;

pub use actions::{EXIT_FAILURE, EXIT_NOT_FOUND};
pub use start::start;
