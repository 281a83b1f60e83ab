//! Drive verification: per-file health, numeric gaps and the pipeline tying
//! them together.

pub mod gaps;
pub mod pipeline;
pub mod record;

pub use gaps::{GapReport, file_number, find_gaps};
pub use pipeline::{
    DriveReport, NumericRange, VerificationPipeline, VerifyConfig, VerifyFilters, classify,
    latest_file_metadata,
};
pub use record::{FileRecord, Health, Summary};
