use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::Block;
use crate::DocgenError;
use crate::DocgenResult;

/// A directed edge `(dependent, dependency)`: the first file reads the
/// second one.
pub type Edge = (PathBuf, PathBuf);

/// A scanned file and the files it depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileItem {
	/// Absolute path of the file.
	pub id: PathBuf,
	pub blocks: Vec<Block>,
	/// Absolute paths referenced through `src` options, in block order and
	/// without duplicates.
	pub dependencies: Vec<PathBuf>,
}

impl FileItem {
	/// Collect the `src` option of every block, resolved against the
	/// directory of `id`. Remote URLs are never dependencies.
	pub fn new(id: impl Into<PathBuf>, blocks: Vec<Block>) -> Self {
		let id = id.into();
		let base = id.parent().map(Path::to_path_buf).unwrap_or_default();
		let mut dependencies: Vec<PathBuf> = Vec::new();

		for src in blocks.iter().filter_map(Block::src) {
			if src.contains("://") {
				continue;
			}

			let resolved = normalize_path(&base.join(src));
			if resolved != id && !dependencies.contains(&resolved) {
				dependencies.push(resolved);
			}
		}

		Self {
			id,
			blocks,
			dependencies,
		}
	}

	/// Drop dependencies that are not part of the scanned file set.
	pub fn retain_known(&mut self, known: &HashSet<PathBuf>) {
		self.dependencies.retain(|dependency| known.contains(dependency));
	}
}

/// Build the dependency edges between `items`. Dependencies outside the set
/// of item ids are external resources and are left out of the graph.
pub fn build_graph(items: &[FileItem]) -> Vec<Edge> {
	let known: HashSet<&Path> = items.iter().map(|item| item.id.as_path()).collect();

	items
		.iter()
		.flat_map(|item| {
			item.dependencies
				.iter()
				.filter(|dependency| known.contains(dependency.as_path()))
				.map(|dependency| (item.id.clone(), dependency.clone()))
		})
		.collect()
}

/// Order the files mentioned in `edges` so that every dependency comes
/// before the files depending on it.
pub fn toposort(edges: &[Edge]) -> DocgenResult<Vec<PathBuf>> {
	execution_order(&[], edges)
}

/// Like [`toposort`] but also places `nodes` without any edges. Nodes keep
/// their input order unless an edge forces otherwise, so the same input
/// always produces the same order.
pub fn execution_order(nodes: &[PathBuf], edges: &[Edge]) -> DocgenResult<Vec<PathBuf>> {
	let mut ordered_nodes: Vec<&Path> = Vec::new();
	let mut seen: HashSet<&Path> = HashSet::new();
	let mut dependencies: HashMap<&Path, Vec<&Path>> = HashMap::new();

	for node in nodes {
		if seen.insert(node.as_path()) {
			ordered_nodes.push(node.as_path());
		}
	}

	for (from, to) in edges {
		for node in [from.as_path(), to.as_path()] {
			if seen.insert(node) {
				ordered_nodes.push(node);
			}
		}
		dependencies.entry(from.as_path()).or_default().push(to.as_path());
	}

	let mut visited: HashSet<&Path> = HashSet::new();
	let mut path: Vec<&Path> = Vec::new();
	let mut sorted: Vec<PathBuf> = Vec::with_capacity(ordered_nodes.len());

	fn visit<'a>(
		node: &'a Path,
		dependencies: &HashMap<&'a Path, Vec<&'a Path>>,
		visited: &mut HashSet<&'a Path>,
		path: &mut Vec<&'a Path>,
		sorted: &mut Vec<PathBuf>,
	) -> DocgenResult<()> {
		if visited.contains(node) {
			return Ok(());
		}

		if let Some(position) = path.iter().position(|entry| *entry == node) {
			let files = path[position..]
				.iter()
				.chain(std::iter::once(&node))
				.map(|entry| entry.display().to_string())
				.collect();
			return Err(DocgenError::DependencyCycle { files });
		}

		path.push(node);
		for dependency in dependencies.get(node).into_iter().flatten() {
			visit(*dependency, dependencies, visited, path, sorted)?;
		}
		path.pop();

		visited.insert(node);
		sorted.push(node.to_path_buf());
		Ok(())
	}

	for node in ordered_nodes.iter().copied() {
		visit(node, &dependencies, &mut visited, &mut path, &mut sorted)?;
	}

	Ok(sorted)
}

/// Resolve `.` and `..` components without touching the file system, so
/// paths that do not exist yet still compare equal.
pub fn normalize_path(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();

	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				if !normalized.pop() {
					normalized.push(component);
				}
			}
			other => normalized.push(other),
		}
	}

	normalized
}
