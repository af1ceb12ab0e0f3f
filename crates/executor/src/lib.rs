pub mod command_executor;
mod process_group;

pub use command_executor::{
    ExecutorError, Invocation, ProcessRunner, RunOutput, Termination, TokioCommandExecutor,
};
