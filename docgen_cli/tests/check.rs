mod common;

use clap::Parser;
use docgen_cli::Commands;
use docgen_cli::DocgenCli;
use docgen_cli::OutputFormat;
use docgen_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;

#[test]
fn check_passes_when_up_to_date() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(
		tmp.path(),
		&[
			("partial.md", "Hello world!\n"),
			(
				"readme.md",
				"# Readme\n\n<!-- doc-gen FILE src=./partial.md -->\nHello world!\n<!-- \
				 end-doc-gen -->\n",
			),
		],
	)?;

	common::docgen_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("All blocks are up to date."));

	Ok(())
}

#[test]
fn check_fails_when_stale() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let readme = "# Readme\n\n<!-- doc-gen FILE src=./partial.md -->\nOld content.\n<!-- \
	              end-doc-gen -->\n";
	common::write_files(
		tmp.path(),
		&[("partial.md", "Hello world!\n"), ("readme.md", readme)],
	)?;

	common::docgen_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(
			predicates::str::contains("readme.md is out of date")
				.and(predicates::str::contains("1 stale file(s)")),
		);

	// Check never writes.
	let content = std::fs::read_to_string(tmp.path().join("readme.md"))?;
	assert_eq!(content, readme);

	Ok(())
}

#[test]
fn check_verbose_prints_diff() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(
		tmp.path(),
		&[
			("partial.md", "Hello world!\n"),
			(
				"readme.md",
				"<!-- doc-gen FILE src=./partial.md -->\nOld content.\n<!-- end-doc-gen -->\n",
			),
		],
	)?;

	common::docgen_cmd()
		.arg("check")
		.arg("--verbose")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(
			predicates::str::contains("-Old content.")
				.and(predicates::str::contains("+Hello world!")),
		);

	Ok(())
}

#[test]
fn check_fails_on_missing_transforms() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(
		tmp.path(),
		&[("readme.md", "<!-- doc-gen UNKNOWN -->\nkeep\n<!-- end-doc-gen -->\n")],
	)?;

	common::docgen_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(
			predicates::str::contains("no transform named `UNKNOWN`")
				.and(predicates::str::contains("1 missing transform(s)")),
		);

	Ok(())
}

#[test]
fn check_reports_unclosed_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(
		tmp.path(),
		&[
			("broken.md", "<!-- doc-gen FILE src=./partial.md -->\nnever closed\n"),
			("partial.md", "text\n"),
		],
	)?;

	common::docgen_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(
			predicates::str::contains("missing closing tag")
				.and(predicates::str::contains("1 file(s) that failed to parse")),
		);

	Ok(())
}

#[test]
fn check_uses_config_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(
		tmp.path(),
		&[
			(
				"docgen.toml",
				"open_word = \"DOCS:START\"\nclose_word = \"DOCS:END\"\nfiles = [\"docs/**/*.md\"]\n",
			),
			("docs/partial.md", "Hello\n"),
			(
				"docs/readme.md",
				"<!-- DOCS:START FILE src=./partial.md -->\nHello\n<!-- DOCS:END -->\n",
			),
			// Outside of `files`, so the stale block is never looked at.
			(
				"readme.md",
				"<!-- DOCS:START FILE src=./docs/partial.md -->\nstale\n<!-- DOCS:END -->\n",
			),
		],
	)?;

	common::docgen_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("All blocks are up to date."));

	Ok(())
}

#[test]
fn check_rejects_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(tmp.path(), &[("docgen.toml", "open_word = [")])?;

	common::docgen_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("docgen::config_parse"));

	Ok(())
}

#[test]
fn cli_parses_global_flags_after_subcommand() -> AnyEmptyResult {
	let cli = DocgenCli::try_parse_from([
		"docgen",
		"list",
		"--format",
		"json",
		"--open-word",
		"DOCS:START",
		"--fail-on-missing",
	])?;

	assert!(matches!(
		cli.command,
		Some(Commands::List {
			format: OutputFormat::Json
		})
	));
	assert_eq!(cli.open_word.as_deref(), Some("DOCS:START"));
	assert!(cli.fail_on_missing);
	assert!(cli.close_word.is_none());

	let cli = DocgenCli::try_parse_from(["docgen", "run", "--dry-run", "a.md", "b.md"])?;
	let Some(Commands::Run { dry_run, files }) = cli.command else {
		panic!("expected the run command");
	};
	assert!(dry_run);
	assert_eq!(files.len(), 2);

	Ok(())
}
