pub mod cert;
pub mod cli;
pub mod config;
pub mod hooks;
pub mod pull;
pub mod push;
pub mod schema;
pub mod store;
pub mod telemetry;
pub mod tls;
