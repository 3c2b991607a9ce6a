pub mod aggregator;
pub mod batch;
pub mod codec;
pub mod config;
pub mod connection;
pub mod db;
pub mod envelope;
pub mod export;
pub mod job;
pub mod model;
pub mod ordering;
pub mod persistence;
pub mod store;
pub mod transport;
