pub mod format;
pub mod month;
pub mod monthly;
pub mod service;

pub use format::{format_analysis, DisplayTable};
pub use monthly::{compute_analysis, AnalysisTable, ReturnGrid};
pub use service::AnalysisService;
