pub mod allocator;
pub mod apportion;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod import;
pub mod optimizer;
pub mod population;
pub mod ranking;
pub mod report;
pub mod rules;
pub mod run;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod synthetic;
pub mod tier;
pub mod types;

pub use engine::GradingEngine;
pub use error::{GradingError, GradingResult};
