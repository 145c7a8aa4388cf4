use clap::{Parser, ValueEnum};

/// Lifetime rating and leaderboard service for the club score tracker.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Log output format; defaults to pretty in debug builds and JSON in release builds.
    #[arg(long, value_enum, default_value_t = TracingFormat::default())]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            TracingFormat::Pretty
        } else {
            TracingFormat::Json
        }
    }
}
