// src/core/mod.rs

pub mod config_loader;
pub mod escaper;
pub mod events;
pub mod parser;
pub mod paths;
pub mod resolver;
pub mod runner;
pub mod variables;
