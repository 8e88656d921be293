pub mod error;
pub mod response;

pub use error::{ExecutionError, FailureKind};
pub use response::{ErrorBody, ResponseBody, ToolResponse};
