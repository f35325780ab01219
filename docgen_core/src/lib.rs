//! `docgen_core` is the engine behind [docgen](https://github.com/docgen-rs/docgen). It finds comment blocks in markdown and source files, parses the arguments of each block's open tag, orders files by the dependencies between them, and replaces block content with the output of named transforms.
//!
//! ## Processing Pipeline
//!
//! ```text
//! files on disk
//!   -> project discovery (include globs, .gitignore, exclude patterns)
//!   -> block scanner (open/close tag pairs, one vocabulary per file type)
//!   -> argument parser (free-form `key=value` literals into JSON values)
//!   -> dependency graph (`src` options pointing at other scanned files)
//!   -> topological sort (dependencies first, cycles are fatal)
//!   -> transform executor (one block at a time, output spliced back in place)
//! ```
//!
//! ## Block Syntax
//!
//! ```markdown
//! <!-- doc-gen (TOC) depth=2 title="Contents" -->
//! generated content
//! <!-- end-doc-gen -->
//! ```
//!
//! The transform name may be bare (`TOC`) or wrapped in `()`, `[]`, `{}`,
//! `(())` or `{{}}`. The legacy `(TOC:depth=2&title=Contents)` form is also
//! accepted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use docgen_core::DiscoveryOptions;
//! use docgen_core::DocgenConfig;
//! use docgen_core::Pipeline;
//! use docgen_core::builtins::builtin_registry;
//! use docgen_core::collect_files;
//! use docgen_core::load_sources;
//! use docgen_core::write_updates;
//!
//! # async fn run() -> docgen_core::DocgenResult<()> {
//! let root = Path::new(".");
//! let config = DocgenConfig::load_or_default(root)?;
//! let files = collect_files(root, &DiscoveryOptions::from_config(&config))?;
//! let sources = load_sources(&files, config.max_file_size)?;
//!
//! let pipeline = Pipeline::new(root, config, builtin_registry());
//! let result = pipeline.run(sources).await?;
//! write_updates(&result)?;
//! # Ok(())
//! # }
//! ```

pub use arguments::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use graph::*;
pub use pipeline::*;
pub use project::*;
pub use scanner::*;
pub use syntax::*;

mod arguments;
pub mod builtins;
pub mod config;
mod engine;
mod error;
mod graph;
pub(crate) mod literal;
mod pipeline;
pub mod project;
mod scanner;
mod syntax;
