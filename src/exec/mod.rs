//! External-process execution: the runner and the serializing queue.

pub mod queue;
pub mod runner;

pub use queue::{CommandQueue, QueueContext, QueueRuntime, QueueTask};
pub use runner::{CapturedOutput, CommandSpec, ProcessRunner};
