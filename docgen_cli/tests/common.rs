use std::path::Path;

use assert_cmd::Command;

pub fn docgen_cmd() -> Command {
	let mut cmd = Command::cargo_bin("docgen").expect("the docgen binary should be built");
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}

/// Write `files` (relative path, contents) below `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) -> std::io::Result<()> {
	for (path, contents) in files {
		let path = root.join(path);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, contents)?;
	}

	Ok(())
}
