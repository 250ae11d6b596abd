pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, DepsArgs, ModuleSelector, ProjectArgs, PropertiesArgs, TreeArgs};
pub use output::{OutputFormat, OutputFormatter};
