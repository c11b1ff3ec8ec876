// Phase 1: per-file analysis.
//
// A pure function of the file's graph plus the project file list. Fixed step
// order: exports, imports, constructor discovery, per-definition reference
// resolution, module-level resolution. Anything that needs another file's
// export table stays pending for Phase 2.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use skein_graphs::definitions::{Definition, SymbolDefinition};
use skein_graphs::extract::FileGraph;
use skein_graphs::references::{ReferenceKind, SymbolReference, TypeCertainty};
use skein_graphs::resolver::{
    strategy_for, ImportRecord, ProjectView, ResolutionContext, ResolvedSymbol,
};
use skein_graphs::symbol_id::SymbolId;
use skein_graphs::type_tracking::{
    DiscoveryScope, FileTypeTracker, LocalTypeTracker, TypeDiscovery, TypeInfo,
};
use skein_graphs::{Availability, DefinitionKind, Diagnostic, Language, Position, Range};

use crate::module_resolution::resolve_specifier;

/// One export a file makes visible to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDetection {
    pub export_name: String,
    /// The flat definition behind the export, when it lives in this file.
    pub definition: Option<SymbolDefinition>,
    pub is_default: bool,
    pub is_reexport: bool,
    /// Module specifier for re-exports.
    pub reexport_source: Option<String>,
}

/// A resolved caller→callee relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub caller: SymbolId,
    pub callee: ResolvedSymbol,
    pub call_location: Position,
    pub call_range: Range,
    pub is_method_call: bool,
    pub is_constructor_call: bool,
}

/// A reference whose first-pass resolution failed; retried in Phase 2 once
/// cross-file import tables are complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReference {
    pub reference: SymbolReference,
    pub caller: SymbolId,
}

/// Everything Phase 1 learns about one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file_path: PathBuf,
    pub language: Language,
    pub exports: Vec<ExportDetection>,
    pub imports: Vec<ImportRecord>,
    pub calls: Vec<FunctionCall>,
    pub pending: Vec<PendingReference>,
    pub type_tracker: FileTypeTracker,
    /// Per-callable local type bindings, kept for Phase 2 re-resolution.
    pub local_trackers: HashMap<SymbolId, LocalTypeTracker>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run Phase 1 over one file.
///
/// `files` is the sorted project file list (module resolution input).
/// `project` is absent on the initial pass and present when Phase 2 re-runs
/// the analysis of an updated file.
pub fn analyze_file(
    graph: &FileGraph,
    files: &[PathBuf],
    project: Option<&dyn ProjectView>,
) -> FileAnalysis {
    let span = tracing::debug_span!("analyze_file", file = %graph.file_path.display());
    let _guard = span.enter();

    let mut diagnostics = graph.diagnostics.clone();
    let mut tracker = graph.seed_type_tracker();

    let exports = detect_exports(graph);
    let imports = detect_imports(graph, files);

    let bodies = callable_bodies(graph);
    let module_id = SymbolId::module(&graph.file_path);
    let caller_of = |r: &SymbolReference| caller_for(&bodies, &module_id, r);

    let mut local_trackers: HashMap<SymbolId, LocalTypeTracker> = HashMap::new();
    let strategy = strategy_for(graph.language);

    // First pass: constructor discovery populates the trackers.
    discover_types_pass(graph, &imports, &mut tracker, &mut local_trackers, project);
    let empty_local = LocalTypeTracker::new();

    // Second pass: resolve calls, callables in source order, then module
    // level last.
    let mut calls = Vec::new();
    let mut pending = Vec::new();

    let mut ordered: Vec<&SymbolReference> = graph.references.iter().collect();
    ordered.sort_by_key(|r| {
        let caller = caller_of(r);
        (caller == module_id, r.location.range.start)
    });

    for reference in ordered {
        if !reference.is_call() {
            continue;
        }
        let caller = caller_of(reference);
        let local = local_trackers.get(&caller).unwrap_or(&empty_local);
        let ctx = ResolutionContext {
            file: graph,
            imports: &imports,
            local_types: local,
            file_types: &tracker,
            project,
        };

        match strategy.resolve_reference(reference, &ctx, &mut diagnostics) {
            Some(resolved) if resolved.is_callable() || resolved.is_builtin => {
                calls.push(make_call(reference, &caller, &resolved, graph.language));
            }
            _ => pending.push(PendingReference {
                reference: reference.clone(),
                caller,
            }),
        }
    }

    tracing::debug!(
        calls = calls.len(),
        pending = pending.len(),
        exports = exports.len(),
        "file analyzed"
    );

    FileAnalysis {
        file_path: graph.file_path.clone(),
        language: graph.language,
        exports,
        imports,
        calls,
        pending,
        type_tracker: tracker,
        local_trackers,
        diagnostics,
    }
}

/// Callables with bodies; references resolve against the deepest callable
/// whose extent contains them.
pub(crate) fn callable_bodies(graph: &FileGraph) -> Vec<(SymbolId, Range)> {
    graph
        .callables()
        .into_iter()
        .filter(|c| {
            matches!(
                c.symbol.kind,
                DefinitionKind::Function | DefinitionKind::Method | DefinitionKind::Constructor
            )
        })
        .map(|c| (c.id, c.symbol.extent()))
        .collect()
}

pub(crate) fn caller_for(
    bodies: &[(SymbolId, Range)],
    module_id: &SymbolId,
    reference: &SymbolReference,
) -> SymbolId {
    bodies
        .iter()
        .filter(|(_, extent)| extent.contains(reference.location.range.start))
        .min_by_key(|(_, extent)| extent.area())
        .map_or_else(|| module_id.clone(), |(id, _)| id.clone())
}

/// Constructor-discovery pass: fold every discovery into the right tracker.
/// Run once in Phase 1 and again in Phase 2 after import wiring, when
/// imported classes become discoverable.
pub(crate) fn discover_types_pass(
    graph: &FileGraph,
    imports: &[ImportRecord],
    tracker: &mut FileTypeTracker,
    local_trackers: &mut HashMap<SymbolId, LocalTypeTracker>,
    project: Option<&dyn ProjectView>,
) {
    let bodies = callable_bodies(graph);
    let module_id = SymbolId::module(&graph.file_path);
    let empty_local = LocalTypeTracker::new();

    for reference in &graph.references {
        let caller = caller_for(&bodies, &module_id, reference);
        let ctx = ResolutionContext {
            file: graph,
            imports,
            local_types: &empty_local,
            file_types: tracker,
            project,
        };
        let discovery = discover_type(reference, &caller, &module_id, graph, &ctx);
        if let Some(discovery) = discovery {
            let local = local_trackers.entry(caller).or_default();
            tracker.apply_discovery(local, discovery);
        }
    }
}

fn detect_exports(graph: &FileGraph) -> Vec<ExportDetection> {
    let mut out = Vec::new();
    for name in graph.export_names() {
        let clause = graph
            .export_clauses
            .iter()
            .find(|c| c.export_name == name);
        let definition = match clause {
            Some(c) => graph.find_definition(&c.local_name),
            None => graph.find_definition(&name),
        };
        let (is_default, is_reexport, source) = match (clause, definition) {
            (Some(c), _) => (c.is_default, c.is_reexport, c.source.clone()),
            (None, Some(d)) => match &d.symbol().availability {
                Availability::FileExport {
                    is_default,
                    is_reexport,
                    ..
                } => (*is_default, *is_reexport, None),
                _ => (false, false, None),
            },
            _ => (false, false, None),
        };
        out.push(ExportDetection {
            export_name: name,
            definition: definition.map(|d| d.symbol().clone()),
            is_default,
            is_reexport,
            reexport_source: source,
        });
    }
    out
}

fn detect_imports(graph: &FileGraph, files: &[PathBuf]) -> Vec<ImportRecord> {
    graph
        .definitions
        .iter()
        .filter_map(|d| match d {
            Definition::Import(import) => {
                let target_file = import.source.as_deref().and_then(|specifier| {
                    resolve_specifier(&graph.file_path, specifier, graph.language, files)
                });
                // Default imports look up the well-known `default` key.
                let imported_name = import.imported_name.clone().or_else(|| {
                    import.is_default.then(|| "default".to_string())
                });
                Some(ImportRecord {
                    local_name: import.def.name.clone(),
                    statement_range: import.def.range,
                    source: import.source.clone(),
                    imported_name,
                    is_namespace: import.is_namespace,
                    target_file,
                    resolved: None,
                })
            }
            _ => None,
        })
        .collect()
}

/// The constructor-discovery rule: a constructor-style call (or annotated
/// assignment) bound to an identifier yields a type binding for it.
fn discover_type(
    reference: &SymbolReference,
    caller: &SymbolId,
    module_id: &SymbolId,
    graph: &FileGraph,
    ctx: &ResolutionContext<'_>,
) -> Option<TypeDiscovery> {
    let variable = reference.assigned_to.clone()?;
    let scope = if caller == module_id {
        DiscoveryScope::File
    } else {
        DiscoveryScope::Local
    };

    let class_name = match reference.kind {
        // `new C()` — the reference names the class directly.
        ReferenceKind::ConstructorCall => Some(reference.name.clone()),
        // `c = C()` (Python) / `let c = Cfg::new()` (Rust).
        ReferenceKind::FunctionCall => constructor_like_target(reference, graph, ctx),
        // `let c: Cfg = …` / `const c: Widget = …` — declared annotation.
        ReferenceKind::Assignment => reference
            .type_info
            .as_ref()
            .filter(|t| t.certainty == TypeCertainty::Declared)
            .map(|t| bare_head(&t.type_name)),
        _ => None,
    }?;

    // Imported classes contribute their own type info; the binding may be an
    // alias of the real class name.
    let (class_name, class_def) = match ctx.file_types.imported_class(&class_name) {
        Some(info) => (info.class_name.clone(), info.class_def.clone()),
        None => {
            let def = graph.find_class(&class_name).map(|c| c.def.clone());
            (class_name, def)
        }
    };

    Some(TypeDiscovery {
        variable,
        type_info: TypeInfo {
            class_name,
            class_def,
            declaration_position: reference.location.range.start,
        },
        scope,
    })
}

/// Whether a plain call is constructor-like: a Python class call, or a Rust
/// `Type::new` associated call.
fn constructor_like_target(
    reference: &SymbolReference,
    graph: &FileGraph,
    ctx: &ResolutionContext<'_>,
) -> Option<String> {
    match graph.language {
        Language::Python => {
            let name = &reference.name;
            if graph.find_class(name).is_some() {
                return Some(name.clone());
            }
            if ctx.file_types.imported_class(name).is_some() {
                return Some(name.clone());
            }
            // Imported but not yet wired as a class: leave undiscovered.
            None
        }
        Language::Rust => {
            let head = reference.property_chain.first()?;
            if reference.property_chain.len() != 2 {
                return None;
            }
            if graph.find_class(head).is_some()
                || ctx.file_types.imported_class(head).is_some()
                || head.chars().next().is_some_and(char::is_uppercase)
            {
                return Some(head.clone());
            }
            None
        }
        _ => None,
    }
}

pub(crate) fn make_call(
    reference: &SymbolReference,
    caller: &SymbolId,
    resolved: &ResolvedSymbol,
    language: Language,
) -> FunctionCall {
    let scoped_path = reference.property_chain.len() >= 2;
    let is_method_call = reference.kind == ReferenceKind::MethodCall
        || reference.receiver_location.is_some()
        || (scoped_path && resolved.kind == DefinitionKind::Method);

    let rust_idiomatic_ctor = language == Language::Rust
        && resolved.kind == DefinitionKind::Method
        && reference.name == "new"
        && scoped_path;
    let is_constructor_call = reference.kind == ReferenceKind::ConstructorCall
        || matches!(resolved.kind, DefinitionKind::Class | DefinitionKind::Constructor)
        || rust_idiomatic_ctor;

    FunctionCall {
        caller: caller.clone(),
        callee: resolved.clone(),
        call_location: reference.location.range.start,
        call_range: reference.location.range,
        is_method_call,
        is_constructor_call,
    }
}

/// `Vec<u8>` / `&mut Cfg` → `Vec` / `Cfg`.
fn bare_head(annotation: &str) -> String {
    annotation
        .trim_start_matches('&')
        .trim_start()
        .trim_start_matches("mut ")
        .split('<')
        .next()
        .unwrap_or(annotation)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_graphs::languages::{parse_source, LanguageRegistry};
    use std::path::Path;

    fn analyze(path: &str, source: &str) -> FileAnalysis {
        let registry = LanguageRegistry::new();
        let support = registry.for_file(Path::new(path)).unwrap();
        let tree = parse_source(support.as_ref(), source, Path::new(path)).unwrap();
        let graph = FileGraph::extract(support.as_ref(), &tree, source, Path::new(path));
        analyze_file(&graph, &[PathBuf::from(path)], None)
    }

    #[test]
    fn js_local_method_call_resolves() {
        let source = "class C {\n  greet() { return 1; }\n}\nfunction f() {\n  const c = new C();\n  c.greet();\n}\n";
        let analysis = analyze("a.js", source);

        let edge = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "a.js#C.greet")
            .expect("f -> C.greet");
        assert_eq!(edge.caller.as_str(), "a.js#f");
        assert!(edge.is_method_call);
        assert!(!edge.is_constructor_call);

        let ctor = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "a.js#C")
            .expect("f -> new C()");
        assert!(ctor.is_constructor_call);
    }

    #[test]
    fn module_level_calls_use_synthetic_caller() {
        let source = "function setup() {}\nsetup();\n";
        let analysis = analyze("a.js", source);
        let call = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "a.js#setup")
            .expect("module-level call");
        assert_eq!(call.caller.as_str(), "a.js#<module>");
    }

    #[test]
    fn nested_function_gets_deepest_caller() {
        let source = "function outer() {\n  function inner() { target(); }\n}\nfunction target() {}\n";
        let analysis = analyze("a.js", source);
        let call = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "a.js#target")
            .expect("call");
        assert_eq!(call.caller.as_str(), "a.js#inner");
    }

    #[test]
    fn python_class_call_discovers_type() {
        let source = "class Service:\n    def run(self):\n        pass\n\ndef main():\n    svc = Service()\n    svc.run()\n";
        let analysis = analyze("m.py", source);

        let edge = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "m.py#Service.run")
            .expect("main -> Service.run");
        assert_eq!(edge.caller.as_str(), "m.py#main");
        assert!(edge.is_method_call);

        let ctor = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "m.py#Service")
            .expect("constructor call");
        assert!(ctor.is_constructor_call);
    }

    #[test]
    fn rust_associated_new_is_constructor() {
        let source = "pub struct Cfg;\nimpl Cfg {\n    pub fn new() -> Self { Cfg }\n}\nfn main() {\n    let c = Cfg::new();\n}\n";
        let analysis = analyze("lib.rs", source);
        let call = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "lib.rs#Cfg.new")
            .expect("main -> Cfg::new");
        assert_eq!(call.caller.as_str(), "lib.rs#main");
        assert!(call.is_constructor_call);
        assert!(call.is_method_call);
    }

    #[test]
    fn unresolved_import_call_stays_pending() {
        let source = "import { add } from './util';\nadd(1, 2);\n";
        let analysis = analyze("app.ts", source);
        assert!(analysis.calls.iter().all(|c| c.callee.name != "add"));
        assert!(
            analysis
                .pending
                .iter()
                .any(|p| p.reference.name == "add"),
            "imported call should wait for Phase 2"
        );
    }

    #[test]
    fn exports_detected_with_flags() {
        let source = "export default function main() {}\nexport function helper() {}\n";
        let analysis = analyze("app.ts", source);

        let main = analysis
            .exports
            .iter()
            .find(|e| e.export_name == "main")
            .expect("default export");
        assert!(main.is_default);

        let helper = analysis
            .exports
            .iter()
            .find(|e| e.export_name == "helper")
            .expect("named export");
        assert!(!helper.is_default);
        assert!(helper.definition.is_some());
    }

    #[test]
    fn imports_detected_with_module_resolution() {
        let files = vec![PathBuf::from("src/util.ts"), PathBuf::from("src/app.ts")];
        let registry = LanguageRegistry::new();
        let support = registry.for_file(Path::new("src/app.ts")).unwrap();
        let source = "import { add } from './util';\n";
        let tree = parse_source(support.as_ref(), source, Path::new("src/app.ts")).unwrap();
        let graph = FileGraph::extract(support.as_ref(), &tree, source, Path::new("src/app.ts"));
        let analysis = analyze_file(&graph, &files, None);

        assert_eq!(analysis.imports.len(), 1);
        assert_eq!(
            analysis.imports[0].target_file,
            Some(PathBuf::from("src/util.ts"))
        );
    }

    #[test]
    fn python_builtin_call_is_edge_to_builtin() {
        let source = "def f():\n    print('x')\n";
        let analysis = analyze("m.py", source);
        let call = analysis
            .calls
            .iter()
            .find(|c| c.callee.id.as_str() == "<builtin>#print")
            .expect("builtin call");
        assert!(call.callee.is_builtin);
    }
}
