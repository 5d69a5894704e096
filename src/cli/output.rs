//! Output formatting for CLI commands

use serde::Serialize;

pub use crate::storage::OutputFormat;

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message (text only; JSON commands report through `data`)
    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Text {
            println!("{}", message);
        }
    }

    /// Prints an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "error": message
                    })
                );
            }
        }
    }

    /// Prints a warning on stderr, one line per warning
    pub fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Warning: {}", message),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({ "warning": message }));
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}
