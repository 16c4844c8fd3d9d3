use std::process;

use orchard::config::{DEFAULT_CAPACITY, DEFAULT_FRUITS, DEFAULT_PICKERS};
use orchard::{OrchardConfig, Simulation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
                eprintln!();
            }
            print_usage();
            process::exit(if msg.is_empty() { 0 } else { 2 });
        }
    };

    if let Err(e) = Simulation::new(config).run().await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: orchard [OPTIONS]");
    eprintln!();
    eprintln!("Run the orchard simulation, writing its event stream to stdout.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f, --fruits <N>    Fruits on the tree [default: {DEFAULT_FRUITS}]");
    eprintln!("  -p, --pickers <N>   Picker workers [default: {DEFAULT_PICKERS}]");
    eprintln!("  -c, --capacity <N>  Crate slots [default: {DEFAULT_CAPACITY}]");
    eprintln!("      --seed <S>      Seed the pickers' fruit selection");
    eprintln!("  -h, --help          Show this help");
}

fn parse_args(args: &[String]) -> Result<OrchardConfig, String> {
    let mut config = OrchardConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--fruits" | "-f" => {
                i += 1;
                config.fruits = parse_value(args.get(i), "--fruits")?;
            }
            "--pickers" | "-p" => {
                i += 1;
                config.pickers = parse_value(args.get(i), "--pickers")?;
            }
            "--capacity" | "-c" => {
                i += 1;
                config.capacity = parse_value(args.get(i), "--capacity")?;
            }
            "--seed" => {
                i += 1;
                config.seed = Some(parse_value(args.get(i), "--seed")?);
            }
            "--help" | "-h" => return Err(String::new()),
            arg => return Err(format!("unknown argument: {arg}")),
        }
        i += 1;
    }

    Ok(config)
}

fn parse_value<T: std::str::FromStr>(arg: Option<&String>, flag: &str) -> Result<T, String> {
    let raw = arg.ok_or_else(|| format!("{flag} requires a value"))?;
    raw.parse()
        .map_err(|_| format!("{flag}: invalid value '{raw}'"))
}

/// Diagnostics go to stderr; stdout belongs to the event stream the
/// visualizer consumes. `RUST_LOG` takes precedence when set, otherwise
/// `ORCHARD_LOG` picks the level for this crate. `LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("ORCHARD_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("orchard={level}"))
    };

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("orchard")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_args_yields_defaults() {
        let config = parse_args(&args(&[])).unwrap();
        assert_eq!(config, OrchardConfig::default());
    }

    #[test]
    fn long_flags_parse() {
        let config =
            parse_args(&args(&["--fruits", "40", "--pickers", "5", "--capacity", "8"])).unwrap();
        assert_eq!(config.fruits, 40);
        assert_eq!(config.pickers, 5);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn short_flags_and_seed_parse() {
        let config = parse_args(&args(&["-f", "9", "-p", "2", "-c", "3", "--seed", "17"])).unwrap();
        assert_eq!(config.fruits, 9);
        assert_eq!(config.pickers, 2);
        assert_eq!(config.capacity, 3);
        assert_eq!(config.seed, Some(17));
    }

    #[test]
    fn help_maps_to_empty_error() {
        assert_eq!(parse_args(&args(&["--help"])), Err(String::new()));
        assert_eq!(parse_args(&args(&["-h"])), Err(String::new()));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = parse_args(&args(&["--baskets"])).unwrap_err();
        assert!(err.contains("--baskets"));
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = parse_args(&args(&["--fruits"])).unwrap_err();
        assert!(err.contains("--fruits"));
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = parse_args(&args(&["--pickers", "many"])).unwrap_err();
        assert!(err.contains("many"));
    }
}
