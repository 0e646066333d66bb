use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use gem_core::{InterfaceId, ResultCode};
use gem_types::translate;
use serde::Serialize;
use tracing::Level;

use crate::cli::*;
use crate::config::SelfCheckConfig;
use crate::{demo, selfcheck};

const CORE_CODES: [ResultCode; 11] = [
    ResultCode::SUCCESS,
    ResultCode::END,
    ResultCode::FAIL,
    ResultCode::INVALID_ARG,
    ResultCode::NOT_FOUND,
    ResultCode::OUT_OF_MEMORY,
    ResultCode::NO_INTERFACE,
    ResultCode::BAD_POINTER,
    ResultCode::NOT_IMPLEMENTED,
    ResultCode::UNAVAILABLE,
    ResultCode::UNINITIALIZED,
];

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Selfcheck(args) => cmd_selfcheck(cli.config.as_deref(), &args, format),
        Command::Result(args) => cmd_result(&args, format),
        Command::Iid(args) => cmd_iid(&args, format),
        Command::Errno(args) => cmd_errno(&args, format),
        Command::Interfaces => cmd_interfaces(format),
    }
}

/// Subscriber level for `cli`. A self-check that traces lifetime events,
/// whether asked for by flag or by config file, logs at `TRACE`.
pub fn log_level(cli: &Cli) -> anyhow::Result<Level> {
    if let Command::Selfcheck(args) = &cli.command {
        let config = SelfCheckConfig::resolve(cli.config.as_deref(), args)?;
        if config.instrumentation.trace_lifetime {
            return Ok(Level::TRACE);
        }
    }
    Ok(if cli.verbose { Level::DEBUG } else { Level::WARN })
}

#[derive(Debug, Serialize)]
struct CodeReport {
    raw: u32,
    hex: String,
    name: &'static str,
    success: bool,
    extension: bool,
}

impl CodeReport {
    fn new(code: ResultCode) -> Self {
        Self {
            raw: code.raw(),
            hex: format!("{:#010x}", code.raw()),
            name: code.as_str(),
            success: code.is_success(),
            extension: code.is_extension(),
        }
    }

    fn print(&self) {
        let class = if self.success {
            "success".green()
        } else if self.extension {
            "failure (extension)".red()
        } else {
            "failure".red()
        };
        println!("{}  {}  {}", self.hex.yellow(), self.name.bold(), class);
    }
}

#[derive(Debug, Serialize)]
struct IidReport {
    iid: InterfaceId,
    display: String,
    /// Contract name the identity was derived from, if any.
    derived_from: Option<String>,
    generic: bool,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accepts a core code name (case-insensitive), a decimal value, or a
/// `0x`-prefixed hex value.
fn parse_code(input: &str) -> anyhow::Result<ResultCode> {
    let input = input.trim();
    if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        let raw = u32::from_str_radix(&hex.replace('_', ""), 16)
            .with_context(|| format!("invalid hex result code {input:?}"))?;
        return Ok(ResultCode::from_raw(raw));
    }
    if let Ok(raw) = input.parse::<u32>() {
        return Ok(ResultCode::from_raw(raw));
    }
    CORE_CODES
        .into_iter()
        .find(|code| code.as_str().eq_ignore_ascii_case(input))
        .with_context(|| format!("unknown result code {input:?}"))
}

/// `iid:`-prefixed input is decoded; anything else is a contract name.
fn resolve_iid(input: &str) -> anyhow::Result<IidReport> {
    let (iid, derived_from) = if input.starts_with("iid:") {
        let iid = InterfaceId::from_hex(input)
            .with_context(|| format!("invalid interface identity {input:?}"))?;
        (iid, None)
    } else {
        anyhow::ensure!(!input.trim().is_empty(), "contract name is empty");
        (InterfaceId::derive(input), Some(input.to_string()))
    };
    Ok(IidReport {
        iid,
        display: iid.to_string(),
        derived_from,
        generic: iid.is_generic(),
    })
}

fn cmd_selfcheck(
    path: Option<&Path>,
    args: &SelfcheckArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = SelfCheckConfig::resolve(path, args)?;
    gem_core::config::install(config.instrumentation)?;

    let report = selfcheck::run(&config);
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!(
                "Self-check: {} threads, {} iterations",
                config.threads.to_string().bold(),
                config.iterations.to_string().bold()
            );
            for check in &report.checks {
                if check.passed {
                    println!("  {} {:<18} {}", "✓".green().bold(), check.name, check.detail.dimmed());
                } else {
                    println!("  {} {:<18} {}", "✗".red().bold(), check.name, check.detail.red());
                }
            }
        }
    }

    anyhow::ensure!(
        report.passed(),
        "{} of {} self-checks failed",
        report.failures(),
        report.checks.len()
    );
    if format == OutputFormat::Text {
        println!("{} All self-checks passed.", "✓".green().bold());
    }
    Ok(())
}

fn cmd_result(args: &ResultArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = CodeReport::new(parse_code(&args.code)?);
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            report.print();
            Ok(())
        }
    }
}

fn cmd_iid(args: &IidArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = resolve_iid(&args.value)?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("{}", report.display.cyan().bold());
            if let Some(name) = &report.derived_from {
                println!("  Derived from: {}", name.bold());
                println!(
                    "  const IID: InterfaceId = InterfaceId::new({:#018x});",
                    report.iid.value()
                );
            }
            if report.generic {
                println!("  {}", "reserved: universal base capability".yellow());
            }
        }
    }
    Ok(())
}

fn cmd_errno(args: &ErrnoArgs, format: OutputFormat) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct ErrnoReport {
        errno: i32,
        code: CodeReport,
    }

    let report = ErrnoReport {
        errno: args.errno,
        code: CodeReport::new(translate::from_errno(args.errno)),
    };
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("errno {} → ", report.errno.to_string().bold());
            report.code.print();
            Ok(())
        }
    }
}

fn cmd_interfaces(format: OutputFormat) -> anyhow::Result<()> {
    let catalog = demo::catalog()?;
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = catalog
                .into_iter()
                .map(|(name, infos)| -> anyhow::Result<(String, serde_json::Value)> {
                    Ok((name.to_string(), serde_json::to_value(infos)?))
                })
                .collect::<anyhow::Result<_>>()?;
            print_json(&map)
        }
        OutputFormat::Text => {
            for (name, infos) in catalog {
                println!("{}", name.bold());
                if infos.is_empty() {
                    println!("  {}", "(no interfaces)".dimmed());
                }
                for info in infos {
                    let via = if info.delegated { " (delegated)" } else { "" };
                    println!("  {}  {}{}", info.iid.to_string().cyan(), info.name, via.dimmed());
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn level_for(args: &[&str]) -> Level {
        log_level(&Cli::try_parse_from(args.iter().copied()).unwrap()).unwrap()
    }

    #[test]
    fn log_level_follows_flags() {
        assert_eq!(level_for(&["gem", "interfaces"]), Level::WARN);
        assert_eq!(level_for(&["gem", "-v", "interfaces"]), Level::DEBUG);
        assert_eq!(level_for(&["gem", "selfcheck", "--trace"]), Level::TRACE);
    }

    #[test]
    fn log_level_follows_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[instrumentation]\ntrace_lifetime = true").unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(
            level_for(&["gem", "--config", path, "selfcheck"]),
            Level::TRACE
        );
        // The file only configures the self-check.
        assert_eq!(level_for(&["gem", "--config", path, "interfaces"]), Level::WARN);
    }

    #[test]
    fn log_level_reports_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cli = Cli::try_parse_from(["gem", "--config", path.to_str().unwrap(), "selfcheck"])
            .unwrap();
        assert!(log_level(&cli).is_err());
    }

    #[test]
    fn parse_code_by_name() {
        assert_eq!(parse_code("NoInterface").unwrap(), ResultCode::NO_INTERFACE);
        assert_eq!(parse_code("badpointer").unwrap(), ResultCode::BAD_POINTER);
        assert_eq!(parse_code(" End ").unwrap(), ResultCode::END);
    }

    #[test]
    fn parse_code_by_value() {
        assert_eq!(parse_code("0x80000001").unwrap(), ResultCode::INVALID_ARG);
        assert_eq!(parse_code("0x8000_0007").unwrap(), ResultCode::UNAVAILABLE);
        assert_eq!(parse_code("0").unwrap(), ResultCode::SUCCESS);
        assert_eq!(parse_code("2147483656").unwrap(), ResultCode::UNINITIALIZED);
    }

    #[test]
    fn parse_code_rejects_garbage() {
        assert!(parse_code("NoSuchCode").is_err());
        assert!(parse_code("0xzz").is_err());
        // The unknown-code fallback name is not itself a code name.
        assert!(parse_code("(Unknown)").is_err());
    }

    #[test]
    fn code_report_classifies() {
        let report = CodeReport::new(ResultCode::failure(4));
        assert!(!report.success);
        assert!(report.extension);
        assert_eq!(report.name, "(Unknown)");
        assert_eq!(report.hex, "0x80000104");

        let report = CodeReport::new(ResultCode::END);
        assert!(report.success);
        assert_eq!(report.hex, "0x00000001");
    }

    #[test]
    fn iid_derivation_and_decoding_agree() {
        let derived = resolve_iid("gem.demo.Sequencer.v1").unwrap();
        assert_eq!(derived.derived_from.as_deref(), Some("gem.demo.Sequencer.v1"));
        assert!(!derived.generic);

        let decoded = resolve_iid(&derived.display).unwrap();
        assert_eq!(decoded.iid, derived.iid);
        assert!(decoded.derived_from.is_none());
    }

    #[test]
    fn iid_decoding_flags_reserved_value() {
        let report = resolve_iid("iid:ffffffffffffffff").unwrap();
        assert!(report.generic);
    }

    #[test]
    fn iid_rejects_bad_input() {
        assert!(resolve_iid("iid:1234").is_err());
        assert!(resolve_iid("   ").is_err());
    }
}
