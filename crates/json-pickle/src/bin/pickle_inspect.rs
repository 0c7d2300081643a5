//! `pickle-inspect`: validate a json-pickle payload (stdin) and describe it.
//!
//! Usage:
//!   pickle-inspect [--table] [-v | -vv]
//!
//! Prints a per-kind node summary, or one line per slot with `--table`.
//! Exits with status 1 if the payload is malformed.

use std::io::{self, Read, Write};

use json_pickle::inspect::{render_table, summarize};
use tracing_subscriber::EnvFilter;

// The library logs at debug and trace only.
fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn main() {
    let mut table = false;
    let mut verbose: u8 = 0;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--table" => table = true,
            "-v" => verbose = verbose.saturating_add(1),
            "-vv" => verbose = verbose.saturating_add(2),
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level(verbose)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut buf = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let result = if table {
        render_table(&buf)
    } else {
        summarize(&buf)
    };
    match result {
        Ok(text) => {
            if let Err(e) = io::stdout().write_all(text.as_bytes()) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::log_level;

    #[test]
    fn each_verbosity_step_enables_library_events() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "debug");
        assert_eq!(log_level(2), "trace");
        assert_eq!(log_level(5), "trace");
    }
}
