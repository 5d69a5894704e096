//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `status [document]` | What a build would execute or re-render |
//! | `layout [order...] [--submenu tab]` | Show or reorder navigation tabs |
//! | `mv <src...> <dest>` | Move files, keeping the report consistent |
//! | `add <doc...> [-d dep...]` | Declare documents and dependencies |
//! | `del <doc...> [-d dep...]` | Remove documents or dependencies |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and the full status listing:
//! ```bash
//! sk status -v
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod edit_cmd;
mod layout_cmd;
mod mv_cmd;
mod output;
mod status_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
