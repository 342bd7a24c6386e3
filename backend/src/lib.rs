pub mod config;
pub mod db;
pub mod intake;
pub mod metrics;
pub mod notify;
pub mod runner;
pub mod store;

pub mod error;
pub mod logger;
