use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_BLUEPRINT;

#[derive(Parser)]
#[command(name = "phoenix")]
#[command(version)]
#[command(about = "A single-binary provisioner for Fedora Workstation")]
#[command(
    long_about = "Fedora Phoenix restores a workstation in a single shot: it unlocks the \
                  encrypted data volume, installs and pins packages, enables services and \
                  restores the user's dotfiles. Every step is idempotent, so a failed run \
                  is recovered by running it again."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the secrets YAML file (required by provision, destroyed after reading)
    #[arg(short, long, global = true)]
    pub secrets: Option<PathBuf>,

    /// Path to the blueprint YAML file
    #[arg(short, long, global = true, default_value = DEFAULT_BLUEPRINT)]
    pub blueprint: PathBuf,

    /// Path to a dotfiles tarball (.tgz) extracted into the stow source directory
    #[arg(short, long, global = true)]
    pub dotfiles_archive: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the full restoration protocol (requires root)
    Provision,

    /// Print the version and build commit
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
