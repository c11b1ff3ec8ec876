// The queryable call graph: nodes, edges, and top-level entry points.
//
// Flattened from per-file analyses in file-path order, then source order, so
// two builds over the same inputs produce structurally equal graphs. Edge
// targets may be `<builtin>#…` ids without a node; module-level callers
// (`file#<module>`) appear as edge sources without a node.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use skein_graphs::extract::FileGraph;
use skein_graphs::symbol_id::SymbolId;
use skein_graphs::{DefinitionKind, Range};

use crate::analysis::FunctionCall;

/// How an edge was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEdgeKind {
    Direct,
    Method,
}

/// One call site attached to its caller node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub symbol: String,
    pub range: Range,
    pub kind: CallEdgeKind,
    pub resolved_definition: Option<SymbolId>,
}

/// A graph node: one enumerated function, class, method, enum, or namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNode {
    pub id: SymbolId,
    pub label: String,
    pub file: PathBuf,
    pub kind: DefinitionKind,
    pub range: Range,
    pub is_exported: bool,
    pub calls: Vec<CallSite>,
    pub called_by: Vec<SymbolId>,
}

/// A directed caller→callee edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub from: SymbolId,
    pub to: SymbolId,
    pub location: Range,
    pub call_type: CallEdgeKind,
}

/// The project call graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub nodes: Vec<CallNode>,
    pub edges: Vec<CallEdge>,
    pub top_level_nodes: Vec<SymbolId>,
    #[serde(skip)]
    index: HashMap<SymbolId, usize>,
}

impl CallGraph {
    pub fn node(&self, id: &SymbolId) -> Option<&CallNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &SymbolId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    /// Serialize for hosts and visualizers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a graph serialized with [`CallGraph::to_json`].
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut graph: Self = serde_json::from_str(text)?;
        graph.reindex();
        Ok(graph)
    }
}

/// Query options for [`flatten_call_graph`].
#[derive(Clone, Default)]
pub struct CallGraphOptions {
    /// Keep only nodes from files passing the predicate.
    pub file_filter: Option<Arc<dyn Fn(&Path) -> bool + Send + Sync>>,
    /// Keep only nodes reachable from `top_level_nodes` within this many hops.
    pub max_depth: Option<usize>,
    /// Include non-exported definitions (default true).
    pub include_private: Option<bool>,
    /// Include test files (default true).
    pub include_tests: Option<bool>,
}

impl std::fmt::Debug for CallGraphOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallGraphOptions")
            .field("file_filter", &self.file_filter.is_some())
            .field("max_depth", &self.max_depth)
            .field("include_private", &self.include_private)
            .field("include_tests", &self.include_tests)
            .finish()
    }
}

impl CallGraphOptions {
    pub fn with_file_filter(
        mut self,
        filter: impl Fn(&Path) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.file_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Flatten per-file calls into the final graph.
pub fn flatten_call_graph(
    graphs: &BTreeMap<PathBuf, FileGraph>,
    calls: &BTreeMap<PathBuf, Vec<FunctionCall>>,
    options: &CallGraphOptions,
) -> CallGraph {
    let include_private = options.include_private.unwrap_or(true);
    let include_tests = options.include_tests.unwrap_or(true);

    // Nodes, file order then source order.
    let mut nodes: Vec<CallNode> = Vec::new();
    let mut index: HashMap<SymbolId, usize> = HashMap::new();
    for (path, graph) in graphs {
        let exports = graph.export_names();
        for callable in graph.callables() {
            if index.contains_key(&callable.id) {
                continue;
            }
            let exported = callable.symbol.is_exported
                || exports.contains(&callable.symbol.name)
                || callable
                    .owner
                    .as_ref()
                    .is_some_and(|o| exports.contains(o));
            let node = CallNode {
                id: callable.id.clone(),
                label: match &callable.owner {
                    Some(owner) => format!("{owner}.{}", callable.symbol.name),
                    None => callable.symbol.name.clone(),
                },
                file: path.clone(),
                kind: callable.symbol.kind,
                range: callable.symbol.range,
                is_exported: exported,
                calls: Vec::new(),
                called_by: Vec::new(),
            };
            index.insert(node.id.clone(), nodes.len());
            nodes.push(node);
        }
    }

    // Edges, file order then call order.
    let mut edges: Vec<CallEdge> = Vec::new();
    for file_calls in calls.values() {
        for call in file_calls {
            let kind = if call.is_method_call {
                CallEdgeKind::Method
            } else {
                CallEdgeKind::Direct
            };
            edges.push(CallEdge {
                from: call.caller.clone(),
                to: call.callee.id.clone(),
                location: call.call_range,
                call_type: kind,
            });
            if let Some(&caller_idx) = index.get(&call.caller) {
                nodes[caller_idx].calls.push(CallSite {
                    symbol: call.callee.name.clone(),
                    range: call.call_range,
                    kind,
                    resolved_definition: Some(call.callee.id.clone()),
                });
            }
            if let Some(&callee_idx) = index.get(&call.callee.id) {
                if !nodes[callee_idx].called_by.contains(&call.caller) {
                    nodes[callee_idx].called_by.push(call.caller.clone());
                }
            }
        }
    }

    // Node-level filters. A file passing the file-level filters keeps its
    // module-caller edges even when it contributes no nodes of its own.
    let file_passes = |path: &Path| -> bool {
        if !include_tests && is_test_file(path) {
            return false;
        }
        if let Some(filter) = &options.file_filter {
            if !filter(path) {
                return false;
            }
        }
        true
    };
    let retained: HashSet<SymbolId> = nodes
        .iter()
        .filter(|n| file_passes(&n.file) && (include_private || n.is_exported))
        .map(|n| n.id.clone())
        .collect();
    let retained_files: HashSet<PathBuf> = graphs
        .keys()
        .filter(|p| file_passes(p))
        .cloned()
        .collect();

    nodes.retain(|n| retained.contains(&n.id));
    edges.retain(|e| {
        let from_ok = retained.contains(&e.from)
            || (e.from.is_module_caller()
                && retained_files.contains(Path::new(e.from.file_part())));
        let to_ok = retained.contains(&e.to) || e.to.is_builtin();
        from_ok && to_ok
    });
    prune_node_links(&mut nodes, &retained);

    let mut graph = CallGraph {
        top_level_nodes: compute_top_level(&nodes, &edges),
        nodes,
        edges,
        index: HashMap::new(),
    };

    if let Some(depth) = options.max_depth {
        apply_max_depth(&mut graph, depth);
    }

    graph.reindex();
    graph
}

/// `top_level_nodes` = nodes with no incoming edge from a different node.
fn compute_top_level(nodes: &[CallNode], edges: &[CallEdge]) -> Vec<SymbolId> {
    let called: HashSet<&SymbolId> = edges
        .iter()
        .filter(|e| e.from != e.to)
        .map(|e| &e.to)
        .collect();
    nodes
        .iter()
        .map(|n| &n.id)
        .filter(|id| !called.contains(id))
        .cloned()
        .collect()
}

/// Breadth-first descent from the top-level nodes, retaining nodes within
/// `max_depth` hops.
fn apply_max_depth(graph: &mut CallGraph, max_depth: usize) {
    let mut petgraph: DiGraph<SymbolId, ()> = DiGraph::new();
    let mut node_idx: HashMap<SymbolId, NodeIndex> = HashMap::new();
    for node in &graph.nodes {
        let idx = petgraph.add_node(node.id.clone());
        node_idx.insert(node.id.clone(), idx);
    }
    for edge in &graph.edges {
        if let (Some(&a), Some(&b)) = (node_idx.get(&edge.from), node_idx.get(&edge.to)) {
            petgraph.add_edge(a, b, ());
        }
    }

    let mut depth_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut frontier: Vec<NodeIndex> = graph
        .top_level_nodes
        .iter()
        .filter_map(|id| node_idx.get(id).copied())
        .collect();
    for &idx in &frontier {
        depth_of.insert(idx, 0);
    }
    let mut depth = 0;
    while !frontier.is_empty() && depth < max_depth {
        depth += 1;
        let mut next = Vec::new();
        for &idx in &frontier {
            for neighbor in petgraph.neighbors(idx) {
                if !depth_of.contains_key(&neighbor) {
                    depth_of.insert(neighbor, depth);
                    next.push(neighbor);
                }
            }
        }
        frontier = next;
    }

    let reachable: HashSet<SymbolId> = depth_of
        .keys()
        .map(|idx| petgraph[*idx].clone())
        .collect();

    graph.nodes.retain(|n| reachable.contains(&n.id));
    graph.edges.retain(|e| {
        let from_ok = reachable.contains(&e.from) || e.from.is_module_caller();
        let to_ok = reachable.contains(&e.to) || e.to.is_builtin();
        from_ok && to_ok
    });
    prune_node_links(&mut graph.nodes, &reachable);
    graph.top_level_nodes = compute_top_level(&graph.nodes, &graph.edges);
}

/// Drop call-site and called-by entries pointing outside the retained set.
fn prune_node_links(nodes: &mut [CallNode], retained: &HashSet<SymbolId>) {
    for node in nodes.iter_mut() {
        node.calls.retain(|c| {
            c.resolved_definition
                .as_ref()
                .is_none_or(|id| retained.contains(id) || id.is_builtin())
        });
        node.called_by
            .retain(|id| retained.contains(id) || id.is_module_caller());
    }
}

/// Conventional test-file detection across the four languages.
pub fn is_test_file(path: &Path) -> bool {
    let text = path.to_string_lossy();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    text.contains("/tests/")
        || text.contains("/test/")
        || text.starts_with("tests/")
        || name.starts_with("test_")
        || name.ends_with("_test.rs")
        || name.ends_with("_test.py")
        || name.contains(".test.")
        || name.contains(".spec.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, file: &str) -> CallNode {
        CallNode {
            id: SymbolId(id.to_string()),
            label: id.split('#').next_back().unwrap_or(id).to_string(),
            file: PathBuf::from(file),
            kind: DefinitionKind::Function,
            range: Range::default(),
            is_exported: false,
            calls: Vec::new(),
            called_by: Vec::new(),
        }
    }

    fn edge(from: &str, to: &str) -> CallEdge {
        CallEdge {
            from: SymbolId(from.to_string()),
            to: SymbolId(to.to_string()),
            location: Range::default(),
            call_type: CallEdgeKind::Direct,
        }
    }

    fn graph_of(nodes: Vec<CallNode>, edges: Vec<CallEdge>) -> CallGraph {
        let mut g = CallGraph {
            top_level_nodes: compute_top_level(&nodes, &edges),
            nodes,
            edges,
            index: HashMap::new(),
        };
        g.reindex();
        g
    }

    #[test]
    fn top_level_excludes_called_nodes() {
        let g = graph_of(
            vec![node("a#f", "a"), node("a#g", "a")],
            vec![edge("a#f", "a#g")],
        );
        assert_eq!(g.top_level_nodes, vec![SymbolId("a#f".into())]);
    }

    #[test]
    fn self_recursion_keeps_top_level() {
        let g = graph_of(vec![node("a#f", "a")], vec![edge("a#f", "a#f")]);
        assert_eq!(g.top_level_nodes, vec![SymbolId("a#f".into())]);
    }

    #[test]
    fn module_caller_removes_top_level() {
        let g = graph_of(
            vec![node("util#add", "util")],
            vec![edge("app#<module>", "util#add")],
        );
        assert!(g.top_level_nodes.is_empty());
    }

    #[test]
    fn max_depth_truncates_chain() {
        // A→B→C→D with max_depth 2 keeps {A, B, C} and edges A→B, B→C.
        let mut g = graph_of(
            vec![
                node("f#A", "f"),
                node("f#B", "f"),
                node("f#C", "f"),
                node("f#D", "f"),
            ],
            vec![edge("f#A", "f#B"), edge("f#B", "f#C"), edge("f#C", "f#D")],
        );
        apply_max_depth(&mut g, 2);
        g.reindex();

        let ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["f#A", "f#B", "f#C"]);
        assert_eq!(g.edges.len(), 2);
        assert_eq!(g.top_level_nodes, vec![SymbolId("f#A".into())]);
    }

    #[test]
    fn builtin_targets_survive_edge_pruning() {
        let g = graph_of(
            vec![node("m#f", "m")],
            vec![edge("m#f", "<builtin>#print")],
        );
        assert_eq!(g.edges.len(), 1);
        assert!(g.top_level_nodes.contains(&SymbolId("m#f".into())));
    }

    #[test]
    fn test_file_detection() {
        assert!(is_test_file(Path::new("tests/app.rs")));
        assert!(is_test_file(Path::new("src/parse_test.rs")));
        assert!(is_test_file(Path::new("pkg/test_helpers.py")));
        assert!(is_test_file(Path::new("ui/button.test.tsx")));
        assert!(!is_test_file(Path::new("src/app.rs")));
    }
}
