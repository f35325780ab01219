use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CommentDelimiters;
use crate::DEFAULT_CLOSE_WORD;
use crate::DEFAULT_OPEN_WORD;
use crate::DocgenError;
use crate::DocgenResult;
use crate::TagSyntax;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["docgen.toml", ".docgen.toml", ".config/docgen.toml"];

/// Files scanned when `files` is not configured.
pub const DEFAULT_INCLUDE_PATTERN: &str = "**/*.md";

/// Configuration loaded from `docgen.toml`.
///
/// ```toml
/// open_word = "doc-gen"
/// close_word = "end-doc-gen"
/// files = ["**/*.md", "src/**/*.ts"]
/// fail_on_missing_transforms = true
/// output_dir = "dist"
///
/// [exclude]
/// patterns = ["CHANGELOG.md", "vendor/"]
///
/// [syntax.ts]
/// open = "/*"
/// close = "*/"
///
/// [settings]
/// repo = "docgen-rs/docgen"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DocgenConfig {
	#[serde(default = "default_open_word")]
	pub open_word: String,
	#[serde(default = "default_close_word")]
	pub close_word: String,
	/// Glob patterns, relative to the project root, of the files to scan.
	#[serde(default = "default_files")]
	pub files: Vec<String>,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// When true, `.gitignore` files are not used for filtering.
	#[serde(default)]
	pub disable_gitignore: bool,
	/// Files larger than this many bytes are rejected. Defaults to 10 MB.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// Fail the run when any block names a transform that is not
	/// registered. Otherwise missing transforms are only reported.
	#[serde(default)]
	pub fail_on_missing_transforms: bool,
	/// Abort the whole run on the first file that fails to parse instead of
	/// skipping that file.
	#[serde(default)]
	pub fail_fast: bool,
	/// Write transformed files below this directory, mirroring their path
	/// relative to the project root, instead of in place.
	#[serde(default)]
	pub output_dir: Option<PathBuf>,
	/// Comment delimiters per file extension, overriding the built-in
	/// table.
	#[serde(default)]
	pub syntax: BTreeMap<String, CommentDelimiters>,
	/// Arbitrary values handed to every transform.
	#[serde(default)]
	pub settings: toml::Table,
}

/// Exclusion configuration using gitignore-style patterns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Patterns relative to the project root, e.g. `"build/"` or
	/// `"!important.md"`.
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl Default for DocgenConfig {
	fn default() -> Self {
		Self {
			open_word: default_open_word(),
			close_word: default_close_word(),
			files: default_files(),
			exclude: ExcludeConfig::default(),
			disable_gitignore: false,
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			fail_on_missing_transforms: false,
			fail_fast: false,
			output_dir: None,
			syntax: BTreeMap::new(),
			settings: toml::Table::new(),
		}
	}
}

fn default_open_word() -> String {
	DEFAULT_OPEN_WORD.to_string()
}

fn default_close_word() -> String {
	DEFAULT_CLOSE_WORD.to_string()
}

fn default_files() -> Vec<String> {
	vec![DEFAULT_INCLUDE_PATTERN.to_string()]
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

impl DocgenConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> DocgenResult<Option<DocgenConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::from_toml(&content).map(Some)
	}

	/// Load the config at `root`, falling back to the defaults.
	pub fn load_or_default(root: &Path) -> DocgenResult<DocgenConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn from_toml(content: &str) -> DocgenResult<DocgenConfig> {
		toml::from_str(content).map_err(|e| DocgenError::ConfigParse(e.to_string()))
	}

	/// The tag vocabulary for `path`, taking per-extension overrides into
	/// account.
	pub fn syntax_for(&self, path: &Path) -> TagSyntax {
		TagSyntax::for_path(path, &self.open_word, &self.close_word, &self.syntax)
	}

	/// The `[settings]` table as JSON, ready to hand to transforms.
	pub fn settings_json(&self) -> DocgenResult<serde_json::Value> {
		toml_to_json(toml::Value::Table(self.settings.clone()), "settings")
	}
}

/// Convert a `toml::Value` to a `serde_json::Value`.
fn toml_to_json(value: toml::Value, path_display: &str) -> DocgenResult<serde_json::Value> {
	let json = match value {
		toml::Value::String(s) => serde_json::Value::String(s),
		toml::Value::Integer(i) => serde_json::Value::from(i),
		toml::Value::Float(f) => {
			serde_json::Value::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
				DocgenError::UnconvertibleFloat {
					path: path_display.to_string(),
					value: f.to_string(),
				}
			})?)
		}
		toml::Value::Boolean(b) => serde_json::Value::Bool(b),
		toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
		toml::Value::Array(arr) => {
			let items: DocgenResult<Vec<serde_json::Value>> = arr
				.into_iter()
				.map(|v| toml_to_json(v, path_display))
				.collect();
			serde_json::Value::Array(items?)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (k, v) in table {
				map.insert(k.clone(), toml_to_json(v, &format!("{path_display}.{k}"))?);
			}
			serde_json::Value::Object(map)
		}
	};

	Ok(json)
}
