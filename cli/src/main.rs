//! outcomes CLI — inspect consumer defaults and configuration.
//!
//! Usage:
//! ```bash
//! outcomes info
//! outcomes config
//! outcomes version
//! ```

use std::env;
use std::process;

use outcomes_consumer::ConsumerConfig;

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "info" => cmd_info(),
        "config" => cmd_config(),
        "version" | "--version" | "-V" => {
            println!("outcomes {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

fn print_usage() {
    println!("outcomes {}", env!("CARGO_PKG_VERSION"));
    println!("Idempotent signal-forwarding consumer for the event-outcome stream\n");
    println!("USAGE:");
    println!("    outcomes <COMMAND>\n");
    println!("COMMANDS:");
    println!("    info     Show consumer defaults");
    println!("    config   Print the default configuration as JSON");
    println!("    version  Print version");
    println!("    help     Print this help");
}

fn cmd_info() {
    let defaults = ConsumerConfig::default();
    println!("OutcomeForge v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default topic: {}", defaults.topic);
    println!("  Default concurrency: {} workers", defaults.concurrency);
    println!(
        "  Batch flush: {} records or {} ms",
        defaults.max_batch_size, defaults.max_batch_time_ms
    );
    println!("  Dedup marker TTL: {} s", defaults.dedup_ttl_secs);
    println!("  Actionable outcomes: filtered, rate_limited");
}

fn cmd_config() {
    let defaults = ConsumerConfig::default();
    match serde_json::to_string_pretty(&defaults) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            process::exit(1);
        }
    }
}
