//! CLI for the `sift` binary.
//!
//! A thin wrapper around the research core: parse arguments, run one
//! research pass, print the report. Uses clap for argument parsing and
//! owo-colors for terminal output.

pub mod output;

use clap::Parser;

/// SIFT - cited research from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "sift",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "SIFT - cited research from the command line",
    long_about = "Decomposes a research query into sub-questions, gathers and\n\
                  cross-validates web evidence concurrently, and prints an\n\
                  evidence-backed markdown report with numbered citations.",
    after_help = "EXAMPLES:\n    \
                  sift \"What is artificial intelligence?\"\n    \
                  sift \"Solid state battery outlook\" --sub-questions 3\n    \
                  sift \"Rust async runtimes compared\" --verbose"
)]
pub struct Cli {
    /// The research query.
    pub query: String,

    /// Number of sub-questions to research (clamped to the configured
    /// bounds).
    #[arg(short = 'n', long)]
    pub sub_questions: Option<usize>,

    /// Enable verbose tracing output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_and_flags() {
        let cli = Cli::parse_from(["sift", "what is rust", "-n", "3", "--no-color"]);
        assert_eq!(cli.query, "what is rust");
        assert_eq!(cli.sub_questions, Some(3));
        assert!(cli.no_color);
        assert!(!cli.verbose);
    }

    #[test]
    fn sub_questions_defaults_to_none() {
        let cli = Cli::parse_from(["sift", "query"]);
        assert_eq!(cli.sub_questions, None);
    }
}
