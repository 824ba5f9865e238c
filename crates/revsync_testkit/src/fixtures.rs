//! Test fixtures for object graphs and repository trees.
//!
//! Provides named graph construction over [`InMemoryStore`] and writers for
//! the reference files the reachability scanner reads.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use revsync_protocol::ObjectId;
use revsync_store::InMemoryStore;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Builds a graph of named objects in an in-memory store.
///
/// # Example
///
/// ```rust
/// use revsync_testkit::GraphBuilder;
///
/// let mut graph = GraphBuilder::new();
/// graph.commit("base", &[]);
/// graph.commit("tip", &["base"]);
/// assert!(graph.store().contains(&graph.id("tip")));
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    store: Arc<InMemoryStore>,
    names: HashMap<String, ObjectId>,
}

impl GraphBuilder {
    /// Creates a builder over an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that adds to an existing store.
    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            names: HashMap::new(),
        }
    }

    /// Adds an object named `name` whose parents are earlier names.
    ///
    /// The object's payload is its name, so equal names and parents give
    /// equal identifiers across builders. A matching ref `refs/heads/<name>`
    /// is set.
    pub fn commit(&mut self, name: &str, parents: &[&str]) -> ObjectId {
        let parent_ids: Vec<ObjectId> = parents.iter().map(|p| self.id(p)).collect();
        let id = self
            .store
            .insert(&parent_ids, name.as_bytes())
            .expect("parents were inserted first");
        self.store.set_ref(format!("refs/heads/{name}"), id);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Adds an object with explicit parent identifiers.
    pub fn commit_with_ids(&mut self, name: &str, parents: &[ObjectId]) -> ObjectId {
        let id = self
            .store
            .insert(parents, name.as_bytes())
            .expect("parents must already be in the store");
        self.names.insert(name.to_string(), id);
        id
    }

    /// Returns the identifier recorded for `name`.
    ///
    /// # Panics
    ///
    /// Panics if no object of that name was added.
    pub fn id(&self, name: &str) -> ObjectId {
        *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("unknown object name {name:?}"))
    }

    /// Returns identifiers for several names.
    pub fn ids(&self, names: &[&str]) -> Vec<ObjectId> {
        names.iter().map(|n| self.id(n)).collect()
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Consumes the builder and returns the store.
    pub fn into_store(self) -> Arc<InMemoryStore> {
        self.store
    }
}

/// Inserts a linear chain of `len` objects and returns them root first.
pub fn chain(store: &InMemoryStore, prefix: &str, len: usize) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = Vec::with_capacity(len);
    for i in 0..len {
        let parents: Vec<ObjectId> = ids.last().copied().into_iter().collect();
        let id = store
            .insert(&parents, format!("{prefix}{i}").as_bytes())
            .expect("chain parent exists");
        ids.push(id);
    }
    ids
}

/// Builds a layered random graph of `width` x `height` objects.
///
/// Each object past the first row takes two distinct parents from the row
/// above. The layout is deterministic for a given size. Objects are named
/// `r<row>c<col>` (1-based) with a ref for each, and rows are returned top
/// to bottom.
///
/// # Panics
///
/// Panics if `width < 2` and `height > 1`.
pub fn grid(graph: &mut GraphBuilder, width: usize, height: usize) -> Vec<Vec<ObjectId>> {
    assert!(width >= 2 || height <= 1, "grid rows need two parents");
    let seed = (width * height * (width + height)) as u64;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows: Vec<Vec<ObjectId>> = Vec::with_capacity(height);
    let mut last: Vec<String> = Vec::new();

    for row in 1..=height {
        let mut current = Vec::with_capacity(width);
        let mut ids = Vec::with_capacity(width);
        for col in 1..=width {
            let name = format!("r{row}c{col}");
            let parents: Vec<&str> = last
                .choose_multiple(&mut rng, 2)
                .map(String::as_str)
                .collect();
            ids.push(graph.commit(&name, &parents));
            current.push(name);
        }
        rows.push(ids);
        last = current;
    }
    rows
}

/// A scratch repository directory holding reference files.
///
/// The layout mirrors a bare git repository: `refs/`, `logs/`, and
/// top-level files such as `HEAD` and `packed-refs`.
#[derive(Debug)]
pub struct RefTree {
    _temp_dir: Option<TempDir>,
    root: PathBuf,
}

impl RefTree {
    /// Creates an empty tree in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: Some(temp_dir),
            root,
        }
    }

    /// Uses an existing directory, creating it if needed.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).expect("Failed to create repository directory");
        Self {
            _temp_dir: None,
            root,
        }
    }

    /// Returns the repository directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Writes a raw file relative to the repository directory.
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, contents).expect("Failed to write file");
        self
    }

    /// Writes a loose ref such as `refs/heads/main`.
    pub fn write_ref(&self, name: &str, id: ObjectId) -> &Self {
        self.write(name, format!("{id}\n"))
    }

    /// Writes a reflog under `logs/` with one line per `(old, new)` entry.
    pub fn write_reflog(&self, name: &str, entries: &[(ObjectId, ObjectId)]) -> &Self {
        let mut contents = String::new();
        for (old, new) in entries {
            contents.push_str(&format!(
                "{old} {new} Test User <test@example.com> 1700000000 +0000\tupdate\n"
            ));
        }
        self.write(&format!("logs/{name}"), contents)
    }

    /// Writes `packed-refs`; entries with a peeled id get a `^` line.
    pub fn write_packed_refs(&self, entries: &[(&str, ObjectId, Option<ObjectId>)]) -> &Self {
        let mut contents = String::from("# pack-refs with: peeled fully-peeled sorted \n");
        for (name, id, peeled) in entries {
            contents.push_str(&format!("{id} {name}\n"));
            if let Some(peeled) = peeled {
                contents.push_str(&format!("^{peeled}\n"));
            }
        }
        self.write("packed-refs", contents)
    }
}

impl Default for RefTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a temporary directory containing the given relative directories.
pub fn dir_tree(dirs: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    for dir in dirs {
        fs::create_dir_all(temp_dir.path().join(dir)).expect("Failed to create directory");
    }
    temp_dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_store::ObjectStore;

    #[test]
    fn builder_names_objects() {
        let mut graph = GraphBuilder::new();
        let base = graph.commit("base", &[]);
        let tip = graph.commit("tip", &["base"]);
        assert_eq!(graph.store().immediate_parents(&tip).unwrap(), vec![base]);
        assert_eq!(graph.store().get_ref("refs/heads/tip"), Some(tip));
    }

    #[test]
    fn equal_graphs_share_ids() {
        let mut a = GraphBuilder::new();
        let mut b = GraphBuilder::new();
        a.commit("x", &[]);
        b.commit("x", &[]);
        assert_eq!(a.id("x"), b.id("x"));
    }

    #[test]
    fn chain_links_each_object() {
        let store = InMemoryStore::new();
        let ids = chain(&store, "c", 4);
        assert_eq!(ids.len(), 4);
        assert_eq!(store.immediate_parents(&ids[3]).unwrap(), vec![ids[2]]);
        assert!(store.immediate_parents(&ids[0]).unwrap().is_empty());
    }

    #[test]
    fn grid_is_deterministic() {
        let mut a = GraphBuilder::new();
        let mut b = GraphBuilder::new();
        let rows_a = grid(&mut a, 4, 3);
        let rows_b = grid(&mut b, 4, 3);
        assert_eq!(rows_a, rows_b);
        assert_eq!(a.store().len(), 12);

        let parents = a.store().immediate_parents(&rows_a[2][0]).unwrap();
        assert_eq!(parents.len(), 2);
        assert!(parents.iter().all(|p| rows_a[1].contains(p)));
    }

    #[test]
    fn ref_tree_writes_files() {
        let tree = RefTree::new();
        let id = ObjectId::from_bytes([7; 20]);
        tree.write_ref("refs/heads/main", id)
            .write_packed_refs(&[("refs/tags/v1", id, Some(id))]);
        let head = fs::read_to_string(tree.path().join("refs/heads/main")).unwrap();
        assert_eq!(head.trim(), id.to_hex());
        let packed = fs::read_to_string(tree.path().join("packed-refs")).unwrap();
        assert!(packed.contains(&format!("^{id}")));
    }
}
