//! Hook integration with the agent harness.
//!
//! The harness calls gatekeeper around every file write:
//!
//! - **pre-tool-use**: decides whether the write may proceed
//! - **post-tool-use**: records a pending decision trace for new features

pub mod input;
pub mod output;
pub mod runner;

pub use input::{parse_input, HookInput, ToolInput};
pub use output::{to_json, HookOutput};
pub use runner::{HookRunner, HookType};
