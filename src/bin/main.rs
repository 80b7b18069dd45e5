//! mdns-alias binary entry point.

use clap::error::ErrorKind;
use clap::Parser;
use mdns_alias::{alias, signals, telemetry, AliasPublisher, Config};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const USAGE: &str = "mdns-alias foo.local bar.local [...]";

/// Publish CNAME aliases for this host over mDNS via avahi-daemon.
#[derive(Parser, Debug)]
#[command(name = "mdns-alias")]
#[command(about, long_about = None, override_usage = USAGE, disable_version_flag = true)]
struct Args {
    /// Aliases to publish (e.g. printer.local).
    aliases: Vec<String>,

    /// Path to configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print version.
    #[arg(short = 'v', long)]
    version: bool,
}

/// What to do after looking at the command line.
#[derive(Debug)]
enum Invocation {
    Run(Args),
    Exit(u8),
}

fn parse_invocation<I, T>(argv: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            let _ = e.print();
            return Invocation::Exit(0);
        }
        Err(_) => {
            println!("Usage: {USAGE}");
            return Invocation::Exit(1);
        }
    };

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Invocation::Exit(0);
    }

    if args.aliases.is_empty() {
        println!("Usage: {USAGE}");
        return Invocation::Exit(1);
    }

    Invocation::Run(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match parse_invocation(std::env::args_os()) {
        Invocation::Run(args) => args,
        Invocation::Exit(code) => return ExitCode::from(code),
    };

    // Load configuration
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize telemetry
    if let Err(e) = telemetry::init(&config.telemetry) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let aliases = match alias::publishable_aliases(args.aliases, &config.publish) {
        Ok(aliases) => aliases,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        config_file = ?args.config,
        suffix = %config.publish.suffix,
        ttl = config.publish.ttl,
        aliases = ?aliases.iter().map(|a| a.name()).collect::<Vec<_>>(),
        "Starting mdns-alias"
    );

    // Setup graceful shutdown
    let shutdown = CancellationToken::new();
    if let Err(e) = signals::cancel_on_signals(shutdown.clone()) {
        error!("Failed to install signal handlers: {}", e);
        return ExitCode::FAILURE;
    }

    // Errors are logged where they happen
    match AliasPublisher::new(config, aliases).run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_usage_error() {
        assert!(matches!(parse_invocation(["mdns-alias"]), Invocation::Exit(1)));
    }

    #[test]
    fn test_unknown_flag_is_usage_error() {
        assert!(matches!(
            parse_invocation(["mdns-alias", "-x", "foo.local"]),
            Invocation::Exit(1)
        ));
    }

    #[test]
    fn test_help_exits_zero() {
        assert!(matches!(
            parse_invocation(["mdns-alias", "-h"]),
            Invocation::Exit(0)
        ));
    }

    #[test]
    fn test_version_exits_zero() {
        assert!(matches!(
            parse_invocation(["mdns-alias", "-v"]),
            Invocation::Exit(0)
        ));
    }

    #[test]
    fn test_aliases_run_in_order() {
        match parse_invocation(["mdns-alias", "foo.local", "bar.local"]) {
            Invocation::Run(args) => {
                assert_eq!(args.aliases, ["foo.local", "bar.local"]);
                assert!(args.config.is_none());
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_config_flag() {
        match parse_invocation(["mdns-alias", "-c", "/etc/mdns-alias.toml", "foo.local"]) {
            Invocation::Run(args) => {
                assert_eq!(args.config, Some(PathBuf::from("/etc/mdns-alias.toml")));
                assert_eq!(args.aliases, ["foo.local"]);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }
}
