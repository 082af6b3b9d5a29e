// src/cli/handlers/mod.rs

// One module per CLI action.

pub mod commons;
pub mod list;
pub mod parse;
pub mod preview;
pub mod run;
pub mod trigger;
pub mod variables;
