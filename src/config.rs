//! Bridge configuration.
//!
//! The adapter itself takes a plain [`Config`] value; there is no env/file
//! layer beyond what [`clap`] parses on the CLI - flags are the whole of
//! the configuration surface.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "dap-cdp-bridge")]
#[command(about = "DAP-to-CDP debug adapter bridge", version, long_about = None)]
pub struct Config {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level when `--verbose` is not set (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Automatically step over frames with no source-map mapping.
    #[arg(long, default_value_t = true)]
    pub smart_step: bool,
}

impl Config {
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}
