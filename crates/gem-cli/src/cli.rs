use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gem",
    about = "Gem component model: self-checks and diagnostics",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Self-check configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the lifetime, query, and aggregation scenarios against demo components
    Selfcheck(SelfcheckArgs),
    /// Describe a result code given as a name, decimal, or 0x-prefixed hex value
    Result(ResultArgs),
    /// Mint an interface identity from a contract name, or decode an iid: value
    Iid(IidArgs),
    /// Translate a POSIX errno value into a result code
    Errno(ErrnoArgs),
    /// List the interfaces exposed by the demo components
    Interfaces,
}

#[derive(Args)]
pub struct SelfcheckArgs {
    /// Worker threads for the concurrency scenario
    #[arg(long)]
    pub threads: Option<usize>,
    /// Iterations per worker thread
    #[arg(long)]
    pub iterations: Option<usize>,
    /// Trace every acquire and release
    #[arg(long)]
    pub trace: bool,
    /// Panic on reference-counting discipline violations
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ResultArgs {
    pub code: String,
}

#[derive(Args)]
pub struct IidArgs {
    /// Contract name (e.g. "gem.Counter.v1") or an `iid:<16 hex>` value
    pub value: String,
}

#[derive(Args)]
pub struct ErrnoArgs {
    pub errno: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "gem",
            "selfcheck",
            "--threads",
            "2",
            "--format",
            "json",
            "--config",
            "gem.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("gem.toml")));
        match cli.command {
            Command::Selfcheck(args) => {
                assert_eq!(args.threads, Some(2));
                assert_eq!(args.iterations, None);
            }
            _ => panic!("expected selfcheck"),
        }
    }

    #[test]
    fn negative_errno_parses() {
        let cli = Cli::try_parse_from(["gem", "errno", "--", "-22"]).unwrap();
        assert!(matches!(cli.command, Command::Errno(ErrnoArgs { errno: -22 })));
    }
}
