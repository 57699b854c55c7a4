pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod forest;
pub mod generator;
pub mod logistic;
pub mod relay;
pub mod server;
pub mod telemetry;
pub mod types;
