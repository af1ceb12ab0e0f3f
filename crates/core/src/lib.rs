//! Runs the TrID file identifier and turns its text report into typed records.

pub mod classifier;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod types;

pub use classifier::{classify, ToolDiagnostic};
pub use error::ScanError;
pub use parser::parse_report;
pub use scanner::{build_args, Scanner};
pub use types::*;

pub use trid_executor::{
    ExecutorError, Invocation, ProcessRunner, RunOutput, Termination, TokioCommandExecutor,
};
