pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod generator;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod output;
pub mod processor;
pub mod random;
pub mod routing;
pub mod state;
