pub mod cache;
pub mod metadata;
pub mod price_series;
pub mod source;
pub mod yahoo;
