//! # shell-commands
//!
//! Named shell commands for a notes vault. A command template such as
//! `echo {{file_name}} {{!suffix}}` is parsed into tokens, every `{{variable}}`
//! is resolved against a [`core::variables::VariableRegistry`], the values are
//! escaped for the target shell's quoting dialect, the composed string is run
//! through that shell and the captured stdout/stderr are routed to the
//! configured output channels.
//!
//! The editor application is abstracted behind the [`host::Host`] trait.

pub mod cli;
pub mod constants;
pub mod core;
pub mod dev_utils;
pub mod host;
pub mod models;
pub mod output;
pub mod system;
