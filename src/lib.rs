//! askdb library crate.
//!
//! A natural-language query pipeline: questions go to an LLM, the candidate
//! SQL passes through a read-only safety validator, an external query
//! service executes it, and results come back one page at a time. Every
//! turn, allowed or not, is appended to an audit log.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod llm;
pub mod logging;
pub mod paginate;
pub mod pipeline;
pub mod safety;

pub use error::{AskdbError, Result};
