use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use docgen_cli::Commands;
use docgen_cli::DocgenCli;
use docgen_cli::OutputFormat;
use docgen_core::AnyEmptyResult;
use docgen_core::AnyResult;
use docgen_core::DiscoveryOptions;
use docgen_core::DocgenConfig;
use docgen_core::DocgenError;
use docgen_core::DocgenResult;
use docgen_core::Options;
use docgen_core::Pipeline;
use docgen_core::PipelineResult;
use docgen_core::RunStatus;
use docgen_core::SourceFile;
use docgen_core::builtins::builtin_registry;
use docgen_core::collect_files;
use docgen_core::load_sources;
use docgen_core::to_argument_string;
use docgen_core::write_updates;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = DocgenCli::parse();

	// Respect NO_COLOR, --no-color and terminals without color support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Run { dry_run, files }) => run_run(&args, *dry_run, files),
		Some(Commands::Check) => run_check(&args),
		Some(Commands::List { format }) => run_list(&args, *format),
		None => {
			eprintln!("No subcommand specified. Run `docgen --help` for usage.");
			process::exit(2);
		}
	};

	if let Err(e) = result {
		match e.downcast::<DocgenError>() {
			Ok(docgen_err) => {
				let report: miette::Report = (*docgen_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Library logs go to stderr. `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.with_target(false)
		.try_init();
}

fn resolve_root(args: &DocgenCli) -> AnyResult<PathBuf> {
	let root = args
		.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
	Ok(root.canonicalize()?)
}

/// Load docgen.toml and apply the command line overrides.
fn load_config(args: &DocgenCli, root: &Path) -> DocgenResult<DocgenConfig> {
	let mut config = DocgenConfig::load_or_default(root)?;

	if let Some(open_word) = &args.open_word {
		config.open_word.clone_from(open_word);
	}
	if let Some(close_word) = &args.close_word {
		config.close_word.clone_from(close_word);
	}
	if args.fail_on_missing {
		config.fail_on_missing_transforms = true;
	}
	if let Some(output_dir) = &args.output_dir {
		config.output_dir = Some(output_dir.clone());
	}

	Ok(config)
}

struct Project {
	root: PathBuf,
	pipeline: Pipeline,
	sources: Vec<SourceFile>,
}

fn load_project(args: &DocgenCli, files: &[PathBuf]) -> AnyResult<Project> {
	let root = resolve_root(args)?;
	let config = load_config(args, &root)?;

	let paths = if files.is_empty() {
		collect_files(&root, &DiscoveryOptions::from_config(&config))?
	} else {
		files
			.iter()
			.map(|file| root.join(file).canonicalize())
			.collect::<Result<Vec<_>, _>>()?
	};
	let sources = load_sources(&paths, config.max_file_size)?;
	tracing::debug!(
		root = %root.display(),
		open_word = %config.open_word,
		close_word = %config.close_word,
		files = sources.len(),
		"loaded project"
	);

	if args.verbose {
		println!("Scanning {} file(s) in {}", sources.len(), root.display());
	}

	Ok(Project {
		pipeline: Pipeline::new(&root, config, builtin_registry()),
		root,
		sources,
	})
}

fn run_pipeline(args: &DocgenCli, files: &[PathBuf]) -> AnyResult<(PathBuf, PipelineResult)> {
	let Project {
		root,
		pipeline,
		sources,
	} = load_project(args, files)?;

	let runtime = tokio::runtime::Runtime::new()?;
	let result = runtime.block_on(pipeline.run(sources))?;
	report_problems(&result, &root);

	Ok((root, result))
}

/// Print skipped files and missing transforms.
fn report_problems(result: &PipelineResult, root: &Path) {
	for error in &result.errors {
		eprintln!("{} {error}", colored!("error:", red));
	}

	for missing in &result.missing_transforms {
		eprintln!(
			"{} no transform named `{}` ({}:{})",
			colored!("warning:", yellow),
			missing.transform,
			make_relative(&missing.file, root),
			missing.line
		);
	}
}

fn run_run(args: &DocgenCli, dry_run: bool, files: &[PathBuf]) -> AnyEmptyResult {
	let (root, result) = run_pipeline(args, files)?;

	if result.status() == RunStatus::NothingToDo {
		println!("No blocks found.");
		return Ok(());
	}

	let changed: Vec<_> = result.changed_files().collect();
	if changed.is_empty() {
		println!("All blocks are already up to date.");
		return Ok(());
	}

	if dry_run {
		println!("Dry run: would update {} file(s):", changed.len());
		for file in &changed {
			println!("  {}", make_relative(&file.output_path, &root));
			print_diff(&file.original_contents, &file.updated_contents);
		}
		return Ok(());
	}

	let written = write_updates(&result)?;
	tracing::debug!(written, "wrote updated files");
	for file in &changed {
		println!("  {}", make_relative(&file.output_path, &root));
	}
	println!("{} Updated {written} file(s).", colored!("✓", green));

	Ok(())
}

fn run_check(args: &DocgenCli) -> AnyEmptyResult {
	let (root, result) = run_pipeline(args, &[])?;

	if result.status() == RunStatus::NothingToDo {
		println!("No blocks found.");
		return Ok(());
	}

	let stale: Vec<_> = result.changed_files().collect();
	if stale.is_empty() && result.status() == RunStatus::Complete {
		println!("All blocks are up to date.");
		return Ok(());
	}

	for file in &stale {
		eprintln!(
			"{} {} is out of date",
			colored!("stale:", yellow),
			make_relative(&file.path, &root)
		);
		if args.verbose {
			print_diff(&file.original_contents, &file.updated_contents);
		}
	}

	eprintln!();
	eprintln!(
		"{} {} stale file(s), {} missing transform(s), {} file(s) that failed to parse. Run \
		 `docgen run` to update.",
		colored!("Check failed:", red),
		stale.len(),
		result.missing_transforms.len(),
		result.errors.len()
	);
	process::exit(1);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedFile<'a> {
	file: String,
	dependencies: Vec<String>,
	blocks: Vec<ListedBlock<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedBlock<'a> {
	transform: Option<&'a str>,
	line: usize,
	lines: (usize, usize),
	options: &'a Options,
	is_legacy: bool,
	is_missing: bool,
}

fn run_list(args: &DocgenCli, format: OutputFormat) -> AnyEmptyResult {
	let Project {
		root,
		pipeline,
		sources,
	} = load_project(args, &[])?;
	let outcome = pipeline.scan(&sources)?;

	for error in &outcome.errors {
		eprintln!("{} {error}", colored!("error:", red));
	}

	let listed: Vec<ListedFile<'_>> = outcome
		.items
		.iter()
		.filter(|item| !item.blocks.is_empty())
		.map(|item| {
			ListedFile {
				file: make_relative(&item.id, &root),
				dependencies: item
					.dependencies
					.iter()
					.map(|dependency| make_relative(dependency, &root))
					.collect(),
				blocks: item
					.blocks
					.iter()
					.map(|block| {
						ListedBlock {
							transform: block.transform.as_deref(),
							line: block.line(),
							lines: block.span.lines,
							options: &block.options,
							is_legacy: block.context.is_legacy,
							is_missing: block
								.transform
								.as_deref()
								.is_some_and(|name| pipeline.registry().get(name).is_none()),
						}
					})
					.collect(),
			}
		})
		.collect();

	if matches!(format, OutputFormat::Json) {
		println!("{}", serde_json::to_string_pretty(&listed)?);
		return Ok(());
	}

	if listed.is_empty() {
		println!("No blocks found.");
		return Ok(());
	}

	let mut block_count = 0;
	for file in &listed {
		println!("{}", colored!(file.file, bold));
		for block in &file.blocks {
			block_count += 1;
			let name = block.transform.unwrap_or("(none)");
			let options = to_argument_string(block.options);
			let status = if block.is_missing {
				format!(" {}", colored!("[missing]", yellow))
			} else {
				String::new()
			};
			if options.is_empty() {
				println!("  line {:<4} {name}{status}", block.line);
			} else {
				println!("  line {:<4} {name} {options}{status}", block.line);
			}
		}
		if !file.dependencies.is_empty() {
			println!("  depends on: {}", file.dependencies.join(", "));
		}
	}

	println!("\n{block_count} block(s) in {} file(s)", listed.len());

	Ok(())
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				print!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				print!("   {change}");
			}
		}
	}
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
