//! Tool system
//!
//! Tools are thin passthroughs to external services or local system reads.
//! Each declares a name, an optional argument schema and whether its results
//! may be cached; the pipeline does everything else.

mod error;
mod registry;
mod traits;

pub mod builtin;

pub use error::{ErrorCategory, ToolError};
pub use registry::{ToolDefinition, ToolEntry, ToolRegistry};
pub use traits::{Arguments, Tool};
