pub mod error;
pub mod handle;
pub mod local;
pub mod registry;
pub mod traits;

// Re-export common types
pub use error::{ToolError, ToolResult};
pub use handle::ToolHandle;
pub use local::{Handler, LocalFunction};
pub use registry::{FunctionModule, FunctionRegistry};
pub use traits::ToolBackend;
