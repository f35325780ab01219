mod common;

use docgen_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use serde_json::json;

fn write_project(root: &std::path::Path) -> std::io::Result<()> {
	common::write_files(
		root,
		&[
			("partial.md", "Shared\n"),
			(
				"readme.md",
				"# Readme\n\n<!-- doc-gen FILE src=./partial.md -->\n<!-- end-doc-gen -->\n\n<!-- \
				 doc-gen (TOC:collapse=true&depth=2) -->\n<!-- end-doc-gen -->\n",
			),
		],
	)
}

#[test]
fn list_prints_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_project(tmp.path())?;

	common::docgen_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(
			predicates::str::contains("readme.md")
				.and(predicates::str::contains("line 3    FILE src=\"./partial.md\""))
				.and(predicates::str::contains("line 6    TOC collapse=true depth=2 [missing]"))
				.and(predicates::str::contains("depends on: partial.md"))
				.and(predicates::str::contains("2 block(s) in 1 file(s)")),
		);

	Ok(())
}

#[test]
fn list_json_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_project(tmp.path())?;

	let output = common::docgen_cmd()
		.arg("list")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let listed: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(
		listed,
		json!([
			{
				"file": "readme.md",
				"dependencies": ["partial.md"],
				"blocks": [
					{
						"transform": "FILE",
						"line": 3,
						"lines": [3, 4],
						"options": { "src": "./partial.md" },
						"isLegacy": false,
						"isMissing": false,
					},
					{
						"transform": "TOC",
						"line": 6,
						"lines": [6, 7],
						"options": { "collapse": true, "depth": 2 },
						"isLegacy": true,
						"isMissing": true,
					},
				],
			},
		])
	);

	Ok(())
}

#[test]
fn list_without_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_files(tmp.path(), &[("readme.md", "# Plain\n")])?;

	common::docgen_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No blocks found."));

	Ok(())
}

#[test]
fn list_never_writes() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_project(tmp.path())?;
	let before = std::fs::read_to_string(tmp.path().join("readme.md"))?;

	common::docgen_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(tmp.path().join("readme.md"))?, before);

	Ok(())
}
