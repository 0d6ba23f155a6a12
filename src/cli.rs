mod args;

pub use args::{Cli, Command, ResourceArgs, ResourceCommand};
