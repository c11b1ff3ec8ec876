// Scope tree construction and position → scope lookup.
//
// Scope-creating captures are folded into a nested tree rooted at a synthetic
// module scope. Nodes live in an arena (numeric indices); each node also
// carries a deterministic string id of the form
// `kind:file:row:col:end_row:end_col[:name]` so downstream consumers and tests
// can match scopes without holding the arena.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureCategory, CaptureEntity, NormalizedCapture};
use crate::definitions::SymbolDefinition;
use crate::{Position, Range};

/// Kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Method,
    Constructor,
    Block,
}

impl ScopeKind {
    /// Map a scope-creating capture entity to its scope kind.
    pub fn from_entity(entity: &CaptureEntity) -> Option<Self> {
        match entity {
            CaptureEntity::Module | CaptureEntity::Namespace => Some(Self::Module),
            CaptureEntity::Class | CaptureEntity::Interface | CaptureEntity::Enum => {
                Some(Self::Class)
            }
            CaptureEntity::Function | CaptureEntity::Closure => Some(Self::Function),
            CaptureEntity::Method => Some(Self::Method),
            CaptureEntity::Constructor => Some(Self::Constructor),
            CaptureEntity::Block => Some(Self::Block),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Block => "block",
        }
    }

    /// Scopes that hoisted declarations attach to.
    fn is_hoist_boundary(self) -> bool {
        matches!(
            self,
            Self::Module | Self::Function | Self::Method | Self::Constructor
        )
    }
}

/// Arena index of a scope node.
pub type ScopeIdx = usize;

/// One node of the scope tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeNode {
    /// Deterministic string id (`kind:file:row:col:end_row:end_col[:name]`).
    pub id: String,
    pub parent: Option<ScopeIdx>,
    pub kind: ScopeKind,
    pub name: Option<String>,
    pub range: Range,
    pub children: Vec<ScopeIdx>,
    /// Symbols declared directly in this scope, by name.
    pub symbols: HashMap<String, SymbolDefinition>,
}

/// The scope tree of a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTree {
    file_path: PathBuf,
    nodes: Vec<ScopeNode>,
    by_id: HashMap<String, ScopeIdx>,
}

/// Index of the root module scope.
pub const ROOT_SCOPE: ScopeIdx = 0;

impl ScopeTree {
    /// Create a tree holding only the root module scope, spanning the origin
    /// to an effectively infinite end.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let range = Range::new(
            Position::new(0, 0),
            Position::new(usize::MAX, usize::MAX),
        );
        let id = format!("module:{}", file_path.display());
        let root = ScopeNode {
            id: id.clone(),
            parent: None,
            kind: ScopeKind::Module,
            name: None,
            range,
            children: Vec::new(),
            symbols: HashMap::new(),
        };
        Self {
            file_path,
            nodes: vec![root],
            by_id: HashMap::from([(id, ROOT_SCOPE)]),
        }
    }

    /// Fold scope-creating captures into a tree in a single pass.
    ///
    /// Captures are sorted by (row, column, end row, end column); each is
    /// appended under the smallest-area existing scope containing it.
    pub fn from_captures(
        file_path: impl Into<PathBuf>,
        captures: &[NormalizedCapture],
    ) -> Self {
        let mut tree = Self::new(file_path);

        let mut scoped: Vec<(&NormalizedCapture, ScopeKind)> = captures
            .iter()
            .filter_map(|c| {
                let creates_scope = c.category == CaptureCategory::Scope
                    || ScopeKind::from_entity(&c.entity).is_some();
                if !creates_scope {
                    return None;
                }
                ScopeKind::from_entity(&c.entity).map(|kind| (c, kind))
            })
            .collect();

        scoped.sort_by_key(|(c, _)| {
            let r = scope_capture_range(c);
            (r.start.row, r.start.column, r.end.row, r.end.column)
        });

        for (capture, kind) in scoped {
            let range = scope_capture_range(capture);
            let name = if capture.symbol_name.is_empty() {
                None
            } else {
                Some(capture.symbol_name.clone())
            };
            tree.insert_scope(kind, name, range);
        }

        tree
    }

    /// Insert a scope under the smallest-area existing scope containing it.
    pub fn insert_scope(
        &mut self,
        kind: ScopeKind,
        name: Option<String>,
        range: Range,
    ) -> ScopeIdx {
        let parent = self.smallest_containing(range.start);
        let id = scope_id_string(kind, &self.file_path, range, name.as_deref());

        // Re-captured scope at the same position updates in place.
        if let Some(&existing) = self.by_id.get(&id) {
            return existing;
        }

        let idx = self.nodes.len();
        self.nodes.push(ScopeNode {
            id: id.clone(),
            parent: Some(parent),
            kind,
            name,
            range,
            children: Vec::new(),
            symbols: HashMap::new(),
        });
        self.nodes[parent].children.push(idx);
        self.by_id.insert(id, idx);
        idx
    }

    /// The smallest-area scope whose range contains the position.
    fn smallest_containing(&self, pos: Position) -> ScopeIdx {
        let mut best = ROOT_SCOPE;
        let mut best_area = usize::MAX;
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.range.contains(pos) {
                let area = node.range.area();
                if area < best_area {
                    best = idx;
                    best_area = area;
                }
            }
        }
        best
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn root(&self) -> &ScopeNode {
        &self.nodes[ROOT_SCOPE]
    }

    pub fn node(&self, idx: ScopeIdx) -> &ScopeNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: ScopeIdx) -> &mut ScopeNode {
        &mut self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeIdx, &ScopeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Look up a scope by its deterministic string id.
    pub fn get(&self, id: &str) -> Option<&ScopeNode> {
        self.by_id.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn index_of(&self, id: &str) -> Option<ScopeIdx> {
        self.by_id.get(id).copied()
    }

    /// Register a symbol in the scope with the given arena index.
    pub fn insert_symbol(&mut self, scope: ScopeIdx, symbol: SymbolDefinition) {
        self.nodes[scope]
            .symbols
            .insert(symbol.name.clone(), symbol);
    }

    /// Nearest enclosing function-or-module scope, used as the attachment
    /// point for hoisted declarations. The scope itself qualifies.
    pub fn hoist_target(&self, mut idx: ScopeIdx) -> ScopeIdx {
        loop {
            let node = &self.nodes[idx];
            if node.kind.is_hoist_boundary() {
                return idx;
            }
            match node.parent {
                Some(parent) => idx = parent,
                None => return ROOT_SCOPE,
            }
        }
    }

    /// Iterate the scope chain from a node to the root, inclusive.
    pub fn chain(&self, start: ScopeIdx) -> ScopeChain<'_> {
        ScopeChain {
            tree: self,
            next: Some(start),
        }
    }
}

/// Upward iterator over a scope chain.
#[derive(Debug)]
pub struct ScopeChain<'a> {
    tree: &'a ScopeTree,
    next: Option<ScopeIdx>,
}

impl<'a> Iterator for ScopeChain<'a> {
    type Item = (ScopeIdx, &'a ScopeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = &self.tree.nodes[idx];
        self.next = node.parent;
        Some((idx, node))
    }
}

fn scope_capture_range(capture: &NormalizedCapture) -> Range {
    capture
        .location
        .enclosing_range
        .unwrap_or(capture.location.range)
}

fn scope_id_string(kind: ScopeKind, file: &Path, range: Range, name: Option<&str>) -> String {
    let base = format!(
        "{}:{}:{}:{}:{}:{}",
        kind.label(),
        file.display(),
        range.start.row,
        range.start.column,
        range.end.row,
        range.end.column,
    );
    match name {
        Some(n) => format!("{base}:{n}"),
        None => base,
    }
}

// ── Processing context ─────────────────────────────────────────────

/// Pre-computed depths over a scope tree plus deepest-scope position lookup.
#[derive(Debug)]
pub struct ProcessingContext<'a> {
    tree: &'a ScopeTree,
    depths: Vec<usize>,
}

impl<'a> ProcessingContext<'a> {
    pub fn new(tree: &'a ScopeTree) -> Self {
        let n = tree.len();
        let mut depths = vec![0usize; n];
        for idx in 0..n {
            depths[idx] = Self::depth_of(tree, idx);
        }
        Self { tree, depths }
    }

    // Walks the parent chain counting hops. Revisiting a node means the chain
    // is cyclic; the walk stops at the first revisit.
    fn depth_of(tree: &ScopeTree, idx: ScopeIdx) -> usize {
        let mut seen = vec![false; tree.len()];
        let mut depth = 0;
        let mut current = idx;
        seen[current] = true;
        while let Some(parent) = tree.node(current).parent {
            if seen[parent] {
                break;
            }
            seen[parent] = true;
            depth += 1;
            current = parent;
        }
        depth
    }

    pub fn depth(&self, idx: ScopeIdx) -> usize {
        self.depths[idx]
    }

    /// Arena index of the deepest scope containing the position; ties broken
    /// by greatest depth.
    pub fn scope_at(&self, pos: Position) -> ScopeIdx {
        let mut best = ROOT_SCOPE;
        let mut best_depth = 0;
        for (idx, node) in self.tree.iter() {
            if node.range.contains(pos) && self.depths[idx] >= best_depth {
                best = idx;
                best_depth = self.depths[idx];
            }
        }
        best
    }

    /// Deterministic id of the deepest scope containing the position.
    pub fn scope_id_at(&self, pos: Position) -> &'a str {
        &self.tree.node(self.scope_at(pos)).id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(sr: usize, sc: usize, er: usize, ec: usize) -> Range {
        Range::new(Position::new(sr, sc), Position::new(er, ec))
    }

    #[test]
    fn root_spans_everything() {
        let tree = ScopeTree::new("a.py");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().kind, ScopeKind::Module);
        assert!(tree.root().range.contains(Position::new(99_999, 3)));
    }

    #[test]
    fn nesting_follows_containment() {
        let mut tree = ScopeTree::new("a.py");
        let class = tree.insert_scope(ScopeKind::Class, Some("C".into()), range(1, 0, 10, 0));
        let method = tree.insert_scope(ScopeKind::Method, Some("m".into()), range(2, 4, 5, 4));
        let other = tree.insert_scope(ScopeKind::Function, Some("f".into()), range(12, 0, 20, 0));

        assert_eq!(tree.node(method).parent, Some(class));
        assert_eq!(tree.node(other).parent, Some(ROOT_SCOPE));
        assert_eq!(tree.node(class).children, vec![method]);
    }

    #[test]
    fn deterministic_ids_include_name() {
        let mut tree = ScopeTree::new("src/a.py");
        let idx = tree.insert_scope(ScopeKind::Class, Some("C".into()), range(1, 0, 10, 0));
        assert_eq!(tree.node(idx).id, "class:src/a.py:1:0:10:0:C");
        assert!(tree.get("class:src/a.py:1:0:10:0:C").is_some());
    }

    #[test]
    fn duplicate_scope_capture_reuses_node() {
        let mut tree = ScopeTree::new("a.py");
        let a = tree.insert_scope(ScopeKind::Function, Some("f".into()), range(1, 0, 4, 0));
        let b = tree.insert_scope(ScopeKind::Function, Some("f".into()), range(1, 0, 4, 0));
        assert_eq!(a, b);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn deepest_scope_lookup() {
        let mut tree = ScopeTree::new("a.py");
        let class = tree.insert_scope(ScopeKind::Class, Some("C".into()), range(1, 0, 10, 0));
        let method = tree.insert_scope(ScopeKind::Method, Some("m".into()), range(2, 4, 5, 4));

        let ctx = ProcessingContext::new(&tree);
        assert_eq!(ctx.scope_at(Position::new(3, 8)), method);
        assert_eq!(ctx.scope_at(Position::new(8, 0)), class);
        assert_eq!(ctx.scope_at(Position::new(50, 0)), ROOT_SCOPE);
        assert_eq!(ctx.depth(method), 2);
    }

    #[test]
    fn hoist_target_skips_blocks_and_classes() {
        let mut tree = ScopeTree::new("a.js");
        let func = tree.insert_scope(ScopeKind::Function, Some("f".into()), range(1, 0, 20, 0));
        let block = tree.insert_scope(ScopeKind::Block, None, range(2, 2, 10, 2));
        let inner = tree.insert_scope(ScopeKind::Block, None, range(3, 4, 8, 4));

        assert_eq!(tree.hoist_target(inner), func);
        assert_eq!(tree.hoist_target(block), func);
        assert_eq!(tree.hoist_target(func), func);
        assert_eq!(tree.hoist_target(ROOT_SCOPE), ROOT_SCOPE);
    }

    #[test]
    fn chain_walks_to_root() {
        let mut tree = ScopeTree::new("a.py");
        let class = tree.insert_scope(ScopeKind::Class, Some("C".into()), range(1, 0, 10, 0));
        let method = tree.insert_scope(ScopeKind::Method, Some("m".into()), range(2, 4, 5, 4));

        let chain: Vec<ScopeIdx> = tree.chain(method).map(|(idx, _)| idx).collect();
        assert_eq!(chain, vec![method, class, ROOT_SCOPE]);
    }

    proptest! {
        // Over any properly nested input (ranges pairwise disjoint or
        // contained, as real syntax trees are), every inserted scope's range
        // is contained by its parent's, and position lookup at a scope's
        // start never lands above it in the chain.
        #[test]
        fn parent_always_contains_child(
            raw in proptest::collection::vec((0usize..40, 1usize..20), 1..12)
        ) {
            let mut accepted: Vec<Range> = Vec::new();
            for (start, len) in raw {
                let r = range(start, 0, start + len, 0);
                let well_nested = accepted.iter().all(|a| {
                    a.start != r.start
                        && (a.contains_range(&r)
                            || r.contains_range(a)
                            || a.end < r.start
                            || r.end < a.start)
                });
                if well_nested {
                    accepted.push(r);
                }
            }

            let mut tree = ScopeTree::new("prop.py");
            for r in &accepted {
                tree.insert_scope(ScopeKind::Block, None, *r);
            }

            let ctx = ProcessingContext::new(&tree);
            for (idx, node) in tree.iter() {
                if let Some(parent) = node.parent {
                    prop_assert!(tree.node(parent).range.contains_range(&node.range));
                }
                let found = ctx.scope_at(node.range.start);
                prop_assert!(ctx.depth(found) >= ctx.depth(idx));
            }
        }
    }
}
