use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dncscan",
    version,
    about = "Divide-and-conquer domain scanning of large fasta files",
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run configuration; `dncscan <CONFIG>` is short for `dncscan run <CONFIG>`.
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The subcommand to execute, with a bare config path treated as `run`.
    pub fn into_command(self) -> Option<Commands> {
        self.command.or_else(|| {
            self.config.map(|config| {
                Commands::Run(RunArgs {
                    config,
                    dry_run: false,
                    manifest_path: None,
                })
            })
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split, scan every chunk, merge, and optionally build xdom records.
    Run(RunArgs),
    /// Build xdom records from an existing merged result file.
    Xdom(XdomArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the YAML run configuration.
    pub config: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct XdomArgs {
    /// Path to the YAML run configuration.
    pub config: PathBuf,

    #[arg(long)]
    pub merged: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Commands> {
        Cli::try_parse_from(args).expect("arguments should parse").into_command()
    }

    #[test]
    fn bare_config_path_runs_the_pipeline() {
        match parse(&["dncscan", "config.yaml"]) {
            Some(Commands::Run(args)) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert!(!args.dry_run);
                assert_eq!(args.manifest_path, None);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn explicit_subcommands_still_parse() {
        match parse(&["dncscan", "run", "config.yaml", "--dry-run"]) {
            Some(Commands::Run(args)) => assert!(args.dry_run),
            other => panic!("expected run, got {other:?}"),
        }
        match parse(&["dncscan", "xdom", "config.yaml", "--merged", "all.pfsout"]) {
            Some(Commands::Xdom(args)) => assert_eq!(args.merged, Some(PathBuf::from("all.pfsout"))),
            other => panic!("expected xdom, got {other:?}"),
        }
    }

    #[test]
    fn missing_arguments_are_a_usage_error() {
        assert!(Cli::try_parse_from(["dncscan"]).is_err());
    }
}
