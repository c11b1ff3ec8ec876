// Whole-pipeline behavior over a mixed-language project: graph invariants,
// determinism, filters, async parity, and host-side file loading.

use std::collections::HashSet;
use std::io::Write;

use skein_core::{CallGraphBuilder, CallGraphOptions};
use skein_graphs::symbol_id::SymbolId;
use skein_test::{load_dir, mixed_project, TestProject};

#[test]
fn edge_integrity_and_top_level_invariants() -> anyhow::Result<()> {
    let snapshot = mixed_project().build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());

    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    for edge in &graph.edges {
        assert!(
            node_ids.contains(edge.to.as_str()) || edge.to.is_builtin(),
            "edge target {} is neither a node nor a builtin",
            edge.to
        );
        assert!(
            node_ids.contains(edge.from.as_str()) || edge.from.is_module_caller(),
            "edge source {} is neither a node nor a module caller",
            edge.from
        );
    }

    // id ∈ top_level_nodes iff no edge targets it from a different source.
    let called: HashSet<&SymbolId> = graph
        .edges
        .iter()
        .filter(|e| e.from != e.to)
        .map(|e| &e.to)
        .collect();
    for node in &graph.nodes {
        let is_top = graph.top_level_nodes.contains(&node.id);
        assert_eq!(
            is_top,
            !called.contains(&node.id),
            "top-level membership wrong for {}",
            node.id
        );
    }
    Ok(())
}

#[test]
fn deterministic_across_builds() -> anyhow::Result<()> {
    let a = mixed_project().build()?;
    let b = mixed_project().build()?;

    let ga = a.get_call_graph(&CallGraphOptions::default());
    let gb = b.get_call_graph(&CallGraphOptions::default());

    let ids = |g: &skein_core::CallGraph| -> Vec<String> {
        g.nodes.iter().map(|n| n.id.to_string()).collect()
    };
    assert_eq!(ids(&ga), ids(&gb));
    assert_eq!(ga.edges, gb.edges);
    assert_eq!(ga.top_level_nodes, gb.top_level_nodes);
    Ok(())
}

#[tokio::test]
async fn async_build_matches_sync_on_mixed_project() -> anyhow::Result<()> {
    let sync = mixed_project().build()?;
    let async_snapshot = mixed_project().build_async().await?;

    let ga = sync.get_call_graph(&CallGraphOptions::default());
    let gb = async_snapshot.get_call_graph(&CallGraphOptions::default());
    assert_eq!(ga.edges, gb.edges);
    assert_eq!(ga.top_level_nodes, gb.top_level_nodes);
    Ok(())
}

#[test]
fn file_filter_prunes_whole_languages() -> anyhow::Result<()> {
    let snapshot = mixed_project().build()?;
    let options = CallGraphOptions::default()
        .with_file_filter(|path| path.extension().is_some_and(|e| e == "rs"));
    let graph = snapshot.get_call_graph(&options);

    assert!(!graph.nodes.is_empty());
    assert!(
        graph
            .nodes
            .iter()
            .all(|n| n.file.extension().is_some_and(|e| e == "rs")),
        "only Rust nodes should remain"
    );
    Ok(())
}

#[test]
fn include_private_hides_unexported_nodes() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "lib.ts",
            "export function api() { internal(); }\nfunction internal() {}\n",
        )
        .build()?;
    let options = CallGraphOptions {
        include_private: Some(false),
        ..Default::default()
    };
    let graph = snapshot.get_call_graph(&options);

    assert!(graph.contains(&SymbolId("lib.ts#api".into())));
    assert!(!graph.contains(&SymbolId("lib.ts#internal".into())));
    Ok(())
}

#[test]
fn include_tests_hides_test_files() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("src/app.js", "export function run() {}\n")
        .file("src/app.test.js", "function checkRun() {}\n")
        .build()?;
    let options = CallGraphOptions {
        include_tests: Some(false),
        ..Default::default()
    };
    let graph = snapshot.get_call_graph(&options);

    assert!(graph.contains(&SymbolId("src/app.js#run".into())));
    assert!(!graph.contains(&SymbolId("src/app.test.js#checkRun".into())));
    Ok(())
}

#[test]
fn incremental_update_preserves_old_snapshot() -> anyhow::Result<()> {
    let builder = CallGraphBuilder::new();
    let v1 = builder.build(
        TestProject::new()
            .file("util.js", "export function add(a, b) { return a + b; }\n")
            .file("app.js", "import { add } from './util';\nadd(1, 2);\n")
            .sources(),
    )?;

    let v2 = builder.update_file(
        &v1,
        "util.js".into(),
        "export function add(a, b) { return a + b; }\nexport function sub(a, b) { return a - b; }\n"
            .to_string(),
    )?;

    let g1 = v1.get_call_graph(&CallGraphOptions::default());
    let g2 = v2.get_call_graph(&CallGraphOptions::default());

    assert!(!g1.contains(&SymbolId("util.js#sub".into())));
    assert!(g2.contains(&SymbolId("util.js#sub".into())));
    // The import edge survives the update.
    assert!(g2.edges.iter().any(|e| {
        e.from.as_str() == "app.js#<module>" && e.to.as_str() == "util.js#add"
    }));
    Ok(())
}

#[test]
fn incremental_remove_unresolves_importers() -> anyhow::Result<()> {
    let builder = CallGraphBuilder::new();
    let v1 = builder.build(
        TestProject::new()
            .file("util.js", "export function add(a, b) { return a + b; }\n")
            .file("app.js", "import { add } from './util';\nadd(1, 2);\n")
            .sources(),
    )?;
    let v2 = builder.remove_file(&v1, &"util.js".into());

    let graph = v2.get_call_graph(&CallGraphOptions::default());
    assert!(!graph.contains(&SymbolId("util.js#add".into())));
    assert!(
        graph.edges.is_empty(),
        "imports into a removed file resolve to nothing"
    );
    Ok(())
}

#[test]
fn builder_honours_config() -> anyhow::Result<()> {
    let config = skein_core::SkeinConfig::from_toml_str(
        "[build]\nmax_concurrent_files = 2\n",
    )?;
    config.validate()?;
    let snapshot = CallGraphBuilder::with_config(&config).build(mixed_project().sources())?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph.node_count() > 0);
    Ok(())
}

#[test]
fn graph_json_export_round_trips() -> anyhow::Result<()> {
    let snapshot = mixed_project().build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());

    let json = graph.to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert!(value["nodes"].is_array());
    assert!(value["edges"].is_array());

    let back = skein_core::CallGraph::from_json(&json)?;
    assert_eq!(back.node_count(), graph.node_count());
    assert_eq!(back.edges, graph.edges);
    assert_eq!(back.top_level_nodes, graph.top_level_nodes);
    Ok(())
}

#[test]
fn loads_sources_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("src"))?;

    let mut util = std::fs::File::create(dir.path().join("src/util.ts"))?;
    writeln!(util, "export function add(a, b) {{ return a + b; }}")?;
    let mut app = std::fs::File::create(dir.path().join("src/app.ts"))?;
    writeln!(app, "import {{ add }} from './util';\nadd(1, 2);")?;
    std::fs::write(dir.path().join("README.md"), "not source\n")?;

    let sources = load_dir(dir.path())?;
    assert_eq!(sources.len(), 2, "markdown files are skipped");

    let snapshot = CallGraphBuilder::new().build(sources)?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "src/app.ts#<module>" && e.to.as_str() == "src/util.ts#add"
    }));
    Ok(())
}
