pub mod fmcsa;
pub mod kalshi;
pub mod openai;
