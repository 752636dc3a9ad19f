pub mod carrier_api;
pub mod market_api;
pub mod tag_generator;
