// The literal pipeline scenarios: one test per expected end-to-end behavior,
// from raw source text to the flattened call graph.

use std::path::Path;

use skein_core::{CallGraphOptions, DefinitionHost};
use skein_graphs::symbol_id::SymbolId;
use skein_graphs::{Diagnostic, Position};
use skein_test::TestProject;

fn id(s: &str) -> SymbolId {
    SymbolId(s.to_string())
}

// JS method call resolves via local type tracking.
#[test]
fn js_method_call_via_local_type() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "a.js",
            "class C { greet() { return 1; } } function f() { const c = new C(); c.greet(); }",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());

    assert!(graph.contains(&id("a.js#C")));
    assert!(graph.contains(&id("a.js#C.greet")));
    assert!(graph.contains(&id("a.js#f")));

    let edge = graph
        .edges
        .iter()
        .find(|e| e.from.as_str() == "a.js#f" && e.to.as_str() == "a.js#C.greet")
        .expect("f -> C.greet edge");
    assert_eq!(edge.call_type, skein_core::CallEdgeKind::Method);

    assert!(graph.top_level_nodes.contains(&id("a.js#f")));
    assert!(!graph.top_level_nodes.contains(&id("a.js#C.greet")));
    Ok(())
}

// Python LEGB with a `global` pragma: x inside inner() is the module x.
#[test]
fn python_legb_with_global() -> anyhow::Result<()> {
    let source = "x = 1\ndef outer():\n    x = 2\n    def inner():\n        global x\n        return x\n    return inner()\n";
    let snapshot = TestProject::new().file("m.py", source).build()?;

    // `return x` sits at row 5; the x expression starts at column 15.
    let resolved = snapshot
        .go_to_definition(Path::new("m.py"), Position::new(5, 15))
        .expect("x should resolve");
    assert_eq!(
        resolved.range.start.row, 0,
        "global x resolves to the module-scope definition on line 1, got {resolved:?}"
    );
    Ok(())
}

// Rust associated function across files, flagged as a constructor call.
#[test]
fn rust_associated_function_across_files() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "lib.rs",
            "pub struct Cfg;\nimpl Cfg {\n    pub fn new() -> Self { Cfg }\n}\n",
        )
        .file(
            "main.rs",
            "use crate::Cfg;\nfn main() {\n    let c = Cfg::new();\n}\n",
        )
        .build()?;

    let calls = snapshot.get_calls_from_definition(&id("main.rs#main"));
    let call = calls
        .iter()
        .find(|c| c.callee.id.as_str() == "lib.rs#Cfg.new")
        .expect("main -> Cfg::new call");
    assert!(call.is_constructor_call);

    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from.as_str() == "main.rs#main" && e.to.as_str() == "lib.rs#Cfg.new"),
        "expected cross-file edge, got {:?}",
        graph.edges
    );
    assert!(graph.top_level_nodes.contains(&id("main.rs#main")));
    Ok(())
}

// TS namespace import: U.add resolves through util's export table.
#[test]
fn ts_namespace_import() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("util.ts", "export function add(x, y) { return x + y; }\n")
        .file("app.ts", "import * as U from './util';\nU.add(1, 2);\n")
        .build()?;

    let module_calls = snapshot.get_module_level_calls(Path::new("app.ts"));
    assert!(
        module_calls
            .iter()
            .any(|c| c.callee.id.as_str() == "util.ts#add"),
        "expected module-level call to util.ts#add, got {module_calls:?}"
    );

    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "app.ts#<module>" && e.to.as_str() == "util.ts#add"
    }));
    assert!(!graph.top_level_nodes.contains(&id("util.ts#add")));
    Ok(())
}

// Duplicate export conflict: smaller path wins, diagnostic recorded.
#[test]
fn duplicate_export_conflict() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("aaa.ts", "export class Widget {\n  render() {}\n}\n")
        .file("bbb.ts", "export class Widget {\n  render() {}\n}\n")
        .build()?;

    let registry = snapshot.type_registry();
    let widget = registry.get("Widget").expect("Widget registered");
    assert_eq!(widget.source_file, Path::new("aaa.ts"));

    assert!(
        snapshot.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::RegistryConflict { name, winner, loser }
                if name == "Widget"
                    && winner == Path::new("aaa.ts")
                    && loser == Path::new("bbb.ts")
        )),
        "expected RegistryConflict, got {:?}",
        snapshot.diagnostics()
    );
    Ok(())
}

// max_depth filter over a call chain A→B→C→D.
#[test]
fn max_depth_filter() -> anyhow::Result<()> {
    let source = "function A() { B(); }\nfunction B() { C(); }\nfunction C() { D(); }\nfunction D() {}\n";
    let snapshot = TestProject::new().file("chain.js", source).build()?;

    let graph = snapshot.get_call_graph(&CallGraphOptions::default().with_max_depth(2));
    let mut ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["chain.js#A", "chain.js#B", "chain.js#C"]);

    let edge_pairs: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    assert_eq!(
        edge_pairs,
        vec![
            ("chain.js#A", "chain.js#B"),
            ("chain.js#B", "chain.js#C")
        ]
    );
    Ok(())
}
