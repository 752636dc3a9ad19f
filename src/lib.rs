pub mod arbitrage;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod merge;
pub mod output;
pub mod parser;
pub mod scoring;
pub mod table;
pub mod validate;
