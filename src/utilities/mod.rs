//! Shared utilities.
//!
//! - [`config`] - Environment-sourced configuration
//! - [`errors`] - The crate error type
//! - [`file_handler`] - Locked JSON state files and atomic writes
//! - [`printer`] - User-visible status lines
//! - [`prompts`] - Prompt text for the generation engines
//! - [`string_utils`] - Dedup keys, ASCII sanitizing, length clamping

pub mod config;
pub mod errors;
pub mod file_handler;
pub mod printer;
pub mod prompts;
pub mod string_utils;
