//! gorepl: an interactive read-eval-print loop for Go.

use gorepl_cli::colors::error_label;
use gorepl_cli::config::ReplConfig;
use gorepl_cli::{logging, repl};

fn main() {
    let config = match ReplConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {}", error_label("error"), err);
            std::process::exit(1);
        }
    };
    logging::init(&config.log_filter);
    tracing::debug!(?config, "starting");

    if let Err(err) = repl::run_repl(config) {
        eprintln!("{} {}", error_label("error"), err);
        std::process::exit(1);
    }
}
