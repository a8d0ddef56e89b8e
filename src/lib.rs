pub mod config;
pub mod dal;
pub mod gateway;
pub mod metrics;
pub mod store;
pub mod utils;
