//! Flattening of nested dependency trees into a node list.
//!
//! The dependency extractor produces a nested map `path -> subtree` in which
//! a file imported from several places appears several times. Clients want
//! each file exactly once, with a stable id, every importer that reached it,
//! and its source text. [`DependencyGraphBuilder::flatten`] does that in one
//! depth-first pass.
//!
//! # Traversal rules
//!
//! - Ids are dense, start at 1, and follow first-discovery order
//! - A node's `parents` are the ids of every ancestor on every path that
//!   reached it, never its own id
//! - Non-empty object values are descended into. The first non-empty subtree
//!   seen for a file is remembered, and a later `{}` for the same file stands
//!   for it, which is how the extractor writes shared and cyclic imports
//! - A key already on the ancestor stack is recorded but not descended into
//!   again, so cyclic input terminates
//! - Each file is read at most once per flatten; a failed read becomes
//!   [`FILE_NOT_FOUND_SENTINEL`] and the traversal carries on
//!
//! # Shared subtrees
//!
//! A subtree reached again under ancestors it has already carried down
//! cannot add a parent anywhere below it, so it is skipped. A descent that
//! ran into an ancestor cycle only vouches for later stacks that contain the
//! same ancestors, since those cut the walk in the same places. Stacked
//! diamonds and similar acyclic sharing then cost polynomial rather than
//! exponential time. Heavily cyclic graphs can still be expensive: parents
//! are defined over simple paths, and those do not compress in general.
//!
//! # Example
//!
//! ```rust,no_run
//! use codebase_mcp::graph::{DependencyGraphBuilder, DependencyTree};
//! use serde_json::json;
//!
//! # async fn example() {
//! let tree: DependencyTree = serde_json::from_value(json!({
//!     "/p/a.ts": { "/p/b.ts": {}, "/p/c.ts": {} }
//! })).unwrap();
//!
//! let nodes = DependencyGraphBuilder::new().flatten(&tree).await;
//! assert_eq!(nodes.len(), 3);
//! # }
//! ```

mod content;

pub use content::{ContentSource, FsContentSource};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::FILE_NOT_FOUND_SENTINEL;

/// Nested dependency structure: file path mapped to the tree of its imports.
///
/// Key order is insertion order, which is the order imports were discovered.
pub type DependencyTree = Map<String, Value>;

/// A single file in a flattened dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    /// Sequential id, starting at 1.
    pub id: usize,
    /// Path of the file as it appeared in the tree.
    pub file_path: String,
    /// Ids of every ancestor that reached this node.
    pub parents: BTreeSet<usize>,
    /// File text, or [`FILE_NOT_FOUND_SENTINEL`].
    pub content: String,
}

type SharedRead = Shared<BoxFuture<'static, Arc<str>>>;

/// Flattens [`DependencyTree`]s, reading node content through a [`ContentSource`].
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder<S = FsContentSource> {
    source: Arc<S>,
}

impl DependencyGraphBuilder<FsContentSource> {
    /// Builder that reads content from the local filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(FsContentSource)
    }
}

impl<S: ContentSource> DependencyGraphBuilder<S> {
    /// Builder that reads content through `source`.
    pub fn with_source(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Flatten `tree` into a deduplicated node list in first-discovery order.
    ///
    /// Never fails: unreadable files get the sentinel content.
    pub async fn flatten(&self, tree: &DependencyTree) -> Vec<DependencyNode> {
        let Traversal {
            nodes, reads, steps, ..
        } = self.walk(tree);
        debug!(
            "Flattened dependency tree into {} nodes ({} reads, {} steps)",
            nodes.len(),
            reads.len(),
            steps
        );

        let contents = join_all(nodes.iter().map(|node| node.content.clone())).await;
        nodes
            .into_iter()
            .zip(contents)
            .map(|(node, content)| DependencyNode {
                id: node.id,
                file_path: node.file_path,
                parents: node.parents,
                content: content.to_string(),
            })
            .collect()
    }

    fn walk<'a>(&'a self, tree: &'a DependencyTree) -> Traversal<'a, S> {
        let mut traversal = Traversal {
            source: self.source.as_ref(),
            nodes: Vec::new(),
            index: HashMap::new(),
            reads: HashMap::new(),
            ancestors: Vec::new(),
            subtrees: HashMap::new(),
            descents: HashMap::new(),
            reached: HashSet::new(),
            steps: 0,
        };
        traversal.visit(tree);
        traversal
    }
}

struct PendingNode {
    id: usize,
    file_path: String,
    parents: BTreeSet<usize>,
    content: SharedRead,
}

/// A subtree is identified by the node that owns it and the address of its map.
type SubtreeKey = (usize, usize);

/// What earlier descents into one subtree established.
///
/// Descents are grouped by the set of ancestors they ran into. Every node
/// below the subtree already has each id in `ancestors` as a parent, as long
/// as the current stack holds every id in `cuts`.
struct Descent {
    cuts: BTreeSet<usize>,
    ancestors: HashSet<usize>,
    /// Ids met by every descent in the group.
    reach: HashSet<usize>,
}

struct Traversal<'a, S> {
    source: &'a S,
    nodes: Vec<PendingNode>,
    index: HashMap<String, usize>,
    reads: HashMap<String, SharedRead>,
    ancestors: Vec<usize>,
    /// First non-empty subtree of each node.
    subtrees: HashMap<usize, &'a DependencyTree>,
    descents: HashMap<SubtreeKey, Vec<Descent>>,
    /// Ids met since the innermost descent started.
    reached: HashSet<usize>,
    steps: usize,
}

impl<'a, S: ContentSource> Traversal<'a, S> {
    fn visit(&mut self, tree: &'a DependencyTree) {
        for (file_path, subtree) in tree {
            self.steps += 1;
            let id = self.record(file_path);
            self.reached.insert(id);

            if self.ancestors.contains(&id) {
                continue;
            }

            let children = match subtree {
                Value::Object(children) if !children.is_empty() => {
                    self.subtrees.entry(id).or_insert(children);
                    children
                }
                Value::Object(_) => match self.subtrees.get(&id) {
                    Some(&children) => children,
                    None => continue,
                },
                _ => continue,
            };
            self.descend(id, children);
        }
    }

    fn descend(&mut self, id: usize, children: &'a DependencyTree) {
        let key = (id, std::ptr::from_ref(children).addr());
        if let Some(reach) = self.covered(key) {
            self.reached.extend(reach);
            return;
        }

        let outer = std::mem::take(&mut self.reached);
        self.ancestors.push(id);
        self.visit(children);
        self.ancestors.pop();
        let reached = std::mem::replace(&mut self.reached, outer);

        let cuts: BTreeSet<usize> = self
            .ancestors
            .iter()
            .copied()
            .filter(|ancestor| reached.contains(ancestor))
            .collect();
        let descents = self.descents.entry(key).or_default();
        match descents.iter_mut().find(|descent| descent.cuts == cuts) {
            Some(descent) => {
                descent.ancestors.extend(self.ancestors.iter().copied());
                descent.reach.retain(|met| reached.contains(met));
            }
            None => descents.push(Descent {
                cuts,
                ancestors: self.ancestors.iter().copied().collect(),
                reach: reached.clone(),
            }),
        }
        self.reached.extend(reached);
    }

    /// If descending into `key` again could not change any parent set,
    /// returns a superset of the ids that descent would meet.
    fn covered(&self, key: SubtreeKey) -> Option<HashSet<usize>> {
        let mut carried = HashSet::new();
        let mut reach: Option<HashSet<usize>> = None;
        let applicable = self
            .descents
            .get(&key)?
            .iter()
            .filter(|descent| descent.cuts.iter().all(|cut| self.ancestors.contains(cut)));
        for descent in applicable {
            carried.extend(descent.ancestors.iter().copied());
            reach = Some(match reach {
                Some(reach) => reach.intersection(&descent.reach).copied().collect(),
                None => descent.reach.clone(),
            });
        }

        if self.ancestors.iter().all(|ancestor| carried.contains(ancestor)) {
            reach
        } else {
            None
        }
    }

    /// Create the node on first sight, otherwise merge the current ancestors
    /// into its parents. Returns the node id.
    fn record(&mut self, file_path: &str) -> usize {
        if let Some(&position) = self.index.get(file_path) {
            let node = &mut self.nodes[position];
            let own_id = node.id;
            node.parents
                .extend(self.ancestors.iter().copied().filter(|&id| id != own_id));
            return own_id;
        }

        let id = self.nodes.len() + 1;
        let content = self.read(file_path);
        self.index.insert(file_path.to_string(), self.nodes.len());
        self.nodes.push(PendingNode {
            id,
            file_path: file_path.to_string(),
            parents: self.ancestors.iter().copied().collect(),
            content,
        });
        id
    }

    fn read(&mut self, file_path: &str) -> SharedRead {
        if let Some(read) = self.reads.get(file_path) {
            return read.clone();
        }

        let pending = self.source.read_to_string(Path::new(file_path));
        let path_for_log = file_path.to_string();
        let read = async move {
            match pending.await {
                Ok(text) => Arc::<str>::from(text),
                Err(e) => {
                    debug!("Could not read {}: {}", path_for_log, e);
                    Arc::from(FILE_NOT_FOUND_SENTINEL)
                }
            }
        }
        .boxed()
        .shared();

        self.reads.insert(file_path.to_string(), read.clone());
        read
    }
}
