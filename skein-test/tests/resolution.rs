// Cross-file and language-specific resolution behavior over real sources.

use std::path::Path;

use skein_core::{CallGraphOptions, DefinitionHost};
use skein_graphs::symbol_id::SymbolId;
use skein_test::TestProject;

fn id(s: &str) -> SymbolId {
    SymbolId(s.to_string())
}

#[test]
fn js_hoisting_allows_call_before_definition() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("a.js", "function early() { late(); }\nfunction late() {}\n")
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from.as_str() == "a.js#early" && e.to.as_str() == "a.js#late"));
    Ok(())
}

#[test]
fn js_optional_chain_is_informational() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "a.js",
            "class C { greet() {} }\nfunction f() {\n  const c = new C();\n  c?.greet();\n}\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from.as_str() == "a.js#f" && e.to.as_str() == "a.js#C.greet"),
        "?. must not change resolution, got {:?}",
        graph.edges
    );
    Ok(())
}

#[test]
fn js_this_call_and_super_constructor() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "a.js",
            "class Base {\n  constructor() {}\n}\nclass Child extends Base {\n  constructor() { super(); this.setup(); }\n  setup() {}\n}\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());

    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "a.js#Child.constructor" && e.to.as_str() == "a.js#Child.setup"
    }));
    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "a.js#Child.constructor" && e.to.as_str() == "a.js#Base.constructor"
    }));
    Ok(())
}

#[test]
fn python_nonlocal_and_builtin_edges() -> anyhow::Result<()> {
    let source = "def outer():\n    count = 0\n    def bump():\n        nonlocal count\n        print(count)\n    bump()\n";
    let snapshot = TestProject::new().file("m.py", source).build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());

    // bump() resolves within outer; print goes to the builtin pseudo-file.
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from.as_str() == "m.py#outer" && e.to.as_str() == "m.py#bump"));
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from.as_str() == "m.py#bump" && e.to.as_str() == "<builtin>#print"));
    // Builtin targets never become nodes.
    assert!(!graph.contains(&id("<builtin>#print")));
    Ok(())
}

#[test]
fn python_cross_file_import() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("helpers.py", "def format_name(n):\n    return n.title()\n")
        .file(
            "main.py",
            "from helpers import format_name\n\ndef run():\n    return format_name('x')\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "main.py#run" && e.to.as_str() == "helpers.py#format_name"
    }));
    Ok(())
}

#[test]
fn python_all_restricts_cross_file_resolution() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "helpers.py",
            "__all__ = ['shown']\n\ndef shown():\n    pass\n\ndef hidden():\n    pass\n",
        )
        .file(
            "main.py",
            "from helpers import shown, hidden\n\ndef run():\n    shown()\n    hidden()\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());

    assert!(graph
        .edges
        .iter()
        .any(|e| e.to.as_str() == "helpers.py#shown"));
    assert!(
        !graph
            .edges
            .iter()
            .any(|e| e.to.as_str() == "helpers.py#hidden"),
        "__all__ must hide non-listed names from the export table"
    );
    Ok(())
}

#[test]
fn python_imported_class_method_call() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "service.py",
            "class Service:\n    def run(self):\n        return 1\n",
        )
        .file(
            "main.py",
            "from service import Service\n\ndef main():\n    s = Service()\n    s.run()\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from.as_str() == "main.py#main" && e.to.as_str() == "service.py#Service.run"),
        "imported-class receiver should resolve, got {:?}",
        graph.edges
    );
    Ok(())
}

#[test]
fn rust_self_method_and_impl_lookup() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file(
            "lib.rs",
            "pub struct Engine;\nimpl Engine {\n    pub fn start(&self) { self.warm_up(); }\n    fn warm_up(&self) {}\n}\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "lib.rs#Engine.start" && e.to.as_str() == "lib.rs#Engine.warm_up"
    }));
    Ok(())
}

#[test]
fn rust_use_group_and_free_function() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("util.rs", "pub fn tick() {}\npub fn tock() {}\n")
        .file(
            "main.rs",
            "use crate::util::{tick, tock};\nfn main() {\n    tick();\n    tock();\n}\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from.as_str() == "main.rs#main" && e.to.as_str() == "util.rs#tick"));
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from.as_str() == "main.rs#main" && e.to.as_str() == "util.rs#tock"));
    Ok(())
}

#[test]
fn default_export_resolves_through_default_import() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("render.ts", "export default function render() {}\n")
        .file("app.ts", "import paint from './render';\npaint();\n")
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(
        graph.edges.iter().any(|e| {
            e.from.as_str() == "app.ts#<module>" && e.to.as_str() == "render.ts#render"
        }),
        "default import should resolve to the default export, got {:?}",
        graph.edges
    );
    Ok(())
}

#[test]
fn ts_reexport_chain_resolves() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("core.ts", "export function compute() { return 1; }\n")
        .file("index.ts", "export { compute } from './core';\n")
        .file(
            "app.ts",
            "import { compute } from './index';\nexport function main() { compute(); }\n",
        )
        .build()?;
    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from.as_str() == "app.ts#main" && e.to.as_str() == "core.ts#compute"),
        "re-export chains should land on the original definition, got {:?}",
        graph.edges
    );
    Ok(())
}

#[test]
fn circular_reexports_terminate_as_unresolved() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("aa.ts", "export { x } from './bb';\n")
        .file("bb.ts", "export { x } from './aa';\n")
        .file("app.ts", "import { x } from './aa';\nx();\n")
        .build()?;

    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(
        graph.edges.iter().any(|e| {
            e.from.as_str() == "app.ts#<module>" && e.to.as_str() == "<builtin>#unresolved"
        }),
        "cyclic import chains end at the unresolved marker, got {:?}",
        graph.edges
    );
    assert!(snapshot
        .diagnostics()
        .iter()
        .any(|d| matches!(d, skein_graphs::Diagnostic::ResolverCycle { name, .. } if name == "x")));
    Ok(())
}

#[test]
fn imports_with_definitions_resolves_alias() -> anyhow::Result<()> {
    let snapshot = TestProject::new()
        .file("util.ts", "export function add(a, b) { return a + b; }\n")
        .file("app.ts", "import { add as plus } from './util';\nplus(1, 2);\n")
        .build()?;

    let imports = snapshot.get_imports_with_definitions(Path::new("app.ts"));
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].local_name, "plus");
    assert_eq!(imports[0].imported_name.as_deref(), Some("add"));
    assert_eq!(
        imports[0].resolved.as_ref().map(|r| r.id.as_str()),
        Some("util.ts#add")
    );

    let graph = snapshot.get_call_graph(&CallGraphOptions::default());
    assert!(graph.edges.iter().any(|e| {
        e.from.as_str() == "app.ts#<module>" && e.to.as_str() == "util.ts#add"
    }));
    Ok(())
}
