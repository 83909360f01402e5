pub mod catalog;
pub mod config;
pub mod error;
pub mod submission;
pub mod survey;
pub mod telemetry;
