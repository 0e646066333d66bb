use clap::Parser;

mod cli;
mod commands;
mod config;
mod demo;
mod selfcheck;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let level = commands::log_level(&cli)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    commands::run_command(cli)
}
