use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Regenerate the content of comment blocks in markdown and source files.",
	long_about = "docgen finds comment blocks such as `<!-- doc-gen TOC -->` ... `<!-- \
	              end-doc-gen -->` in your files and replaces the content between the tags \
	              with the output of the named transform.\n\nFiles that reference each other \
	              through a `src` option are processed dependencies first.\n\nQuick start:\n  \
	              docgen run    Regenerate every block\n  docgen check  Verify everything is up \
	              to date\n  docgen list   Show every block and its transform"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct DocgenCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Override the word that opens a block (`open_word` in docgen.toml).
	#[arg(long, global = true)]
	pub open_word: Option<String>,

	/// Override the word that closes a block (`close_word` in docgen.toml).
	#[arg(long, global = true)]
	pub close_word: Option<String>,

	/// Fail when a block names a transform that is not registered.
	#[arg(long, global = true, default_value_t = false)]
	pub fail_on_missing: bool,

	/// Write transformed files below this directory instead of in place.
	#[arg(long, global = true)]
	pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Regenerate the content of every block.
	///
	/// Scans the configured files, orders them so that files referenced
	/// through a `src` option are processed first, runs each block's
	/// transform and writes the changed files.
	Run {
		/// Show a diff of what would change without writing any files.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Only process these files. Relative paths are resolved against the
		/// project root. Defaults to every file matched by `files` in
		/// docgen.toml.
		files: Vec<PathBuf>,
	},
	/// Check that every block is up to date.
	///
	/// Runs every transform without writing anything and exits with status 1
	/// if any file would change or any block names an unknown transform.
	/// Ideal for CI pipelines.
	Check,
	/// List every block in the project.
	///
	/// Prints each block with its transform, line, options and the files it
	/// depends on.
	List {
		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
