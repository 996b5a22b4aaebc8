pub mod aggregator;
pub mod backend;
pub mod config;
pub mod data_models;
pub mod error;
pub mod export;
pub mod extractor;
pub mod orchestrator;
pub mod query_builder;
