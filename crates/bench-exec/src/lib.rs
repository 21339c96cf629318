mod recording;
mod runner;
mod spec;

pub use recording::{DryRunRunner, RecordingRunner};
pub use runner::{CommandFailure, CommandOutput, CommandRunner, SystemRunner};
pub use spec::CommandSpec;
