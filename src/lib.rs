//! keyquest library
//!
//! Autocomplete crawling, theme analysis and question generation for SEO
//! research. The binary in `main.rs` is a thin CLI over [`pipeline::Analyzer`].

pub mod allocate;
pub mod cli;
pub mod config;
pub mod consolidate;
pub mod export;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod questions;
pub mod retry;
pub mod state;
pub mod suggest;
pub mod themes;
pub mod volume;
