//! # Output
//!
//! Routes the captured stdout and stderr of a finished command to the output
//! channels the command is configured with. [`dispatcher`] decides what goes
//! where; [`channels`] holds the sinks that perform the delivery.

pub mod channels;
pub mod dispatcher;

pub use channels::{HostSink, OutputSink, Presentation};
pub use dispatcher::{Delivery, dispatch, plan_dispatch};
