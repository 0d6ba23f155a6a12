use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const STATE_ENV: &str = "DEBUG_PROVIDER_STATE";

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the debug Terraform provider's resources and data sources locally")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every resource and data source type.
    List,
    /// Show the attribute schema of one type, or of all of them.
    Schema {
        /// Full type name, e.g. `debug_cpu_hog`.
        name: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Read a data source and print its state.
    Data {
        name: String,

        /// JSON config file, or `-` for stdin.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run one lifecycle step of a managed resource.
    Resource {
        #[command(subcommand)]
        operation: ResourceCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommand {
    Create(ResourceArgs),
    Read(ResourceArgs),
    Update(ResourceArgs),
    Delete(ResourceArgs),
}

impl ResourceCommand {
    pub fn args(&self) -> &ResourceArgs {
        match self {
            ResourceCommand::Create(args)
            | ResourceCommand::Read(args)
            | ResourceCommand::Update(args)
            | ResourceCommand::Delete(args) => args,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ResourceArgs {
    /// Full type name, e.g. `debug_sleep`.
    pub resource_type: String,

    /// Instance name within the state file.
    #[arg(long, default_value = "this")]
    pub name: String,

    /// JSON config file, or `-` for stdin.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = STATE_ENV, default_value = "terraform.tfstate")]
    pub state: PathBuf,
}
