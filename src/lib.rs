pub mod analysis;
pub mod args;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod logging;
pub mod util;
