//! Colored output helpers for the CLI.

use crate::types::ResearchResult;
use owo_colors::OwoColorize;

/// Output style configuration.
pub struct Output {
    /// Whether to use colored output.
    pub colored: bool,
}

impl Output {
    /// Create a new output helper.
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Print an info line.
    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "→".cyan().bold(), message);
        } else {
            eprintln!("  {message}");
        }
    }

    /// Print a warning line.
    pub fn warn(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "!".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {message}");
        }
    }

    /// Print the report body, reference list, and run metrics.
    pub fn report(&self, result: &ResearchResult) {
        println!("{}", result.body_text);

        if !result.citations.is_empty() {
            if self.colored {
                println!("\n{}", "## References".bold());
            } else {
                println!("\n## References");
            }
            for citation in &result.citations {
                if self.colored {
                    println!(
                        "[{}] {} {}",
                        citation.index,
                        citation.title.bold(),
                        citation.url.dimmed()
                    );
                } else {
                    println!("[{}] {} {}", citation.index, citation.title, citation.url);
                }
            }
        }

        let summary = format!(
            "{} sources, {} sub-questions, {:.1}s{}",
            result.metrics.source_count,
            result.metrics.sub_question_count,
            result.metrics.elapsed_ms as f64 / 1000.0,
            if result.metrics.degraded {
                " (degraded)"
            } else {
                ""
            }
        );
        if self.colored {
            eprintln!("\n  {}", summary.dimmed());
        } else {
            eprintln!("\n  {summary}");
        }
    }
}
