//! # System Interaction Layer
//!
//! This module provides abstractions for interacting with the underlying operating system.
//! It serves as a boundary between the interpolation pipeline and the specifics of process
//! management and shell selection.
//!
//! ## Modules
//!
//! - **`executor`**: Spawns a shell with the composed command string, streams stdout and
//!   stderr concurrently as [`executor::ProcessEvent`]s and collects them into an
//!   [`executor::ExecutionResult`].
//! - **`shell`**: Resolves shell selectors (the platform default, built-in ids such as
//!   `bash` or `pwsh`, or user-defined `[shells]` entries) into a spawnable
//!   [`shell::Shell`] together with its quoting dialect.

pub mod executor;
pub mod shell;
