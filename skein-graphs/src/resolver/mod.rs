// Symbol resolution: a generic scope-chain core plus per-language strategies.
//
// Generic resolution of a name N at scope S walks the chain from S to the
// root and returns the first matching symbol; import bindings are followed
// through the project's import/export tables, bounded at depth 16. When the
// chain turns up nothing, the project-wide export registry is the fallback.

pub mod ecma;
pub mod python;
pub mod rust;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::definitions::SymbolDefinition;
use crate::extract::FileGraph;
use crate::references::SymbolReference;
use crate::scope::ScopeKind;
use crate::symbol_id::SymbolId;
use crate::type_tracking::{FileTypeTracker, LocalTypeTracker, TypeInfo};
use crate::{DefinitionKind, Diagnostic, Language, Range};

/// Import chains deeper than this terminate as unresolved.
pub const MAX_IMPORT_DEPTH: usize = 16;

// ── Resolution results ─────────────────────────────────────────────

/// A definition a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSymbol {
    pub id: SymbolId,
    pub file: PathBuf,
    pub name: String,
    pub kind: DefinitionKind,
    pub range: Range,
    pub is_builtin: bool,
}

impl ResolvedSymbol {
    /// Resolve from a flat definition, with the owning class when known.
    pub fn from_definition(file: &Path, def: &SymbolDefinition, owner: Option<&str>) -> Self {
        let id = match owner {
            Some(owner) => SymbolId::method(file, owner, &def.name),
            None => SymbolId::top_level(file, &def.name),
        };
        Self {
            id,
            file: file.to_path_buf(),
            name: def.name.clone(),
            kind: def.kind,
            range: def.range,
            is_builtin: false,
        }
    }

    /// A language builtin (terminal fallback).
    pub fn builtin(name: &str) -> Self {
        Self {
            id: SymbolId::builtin(name),
            file: PathBuf::from(crate::symbol_id::BUILTIN_FILE),
            name: name.to_string(),
            kind: DefinitionKind::Function,
            range: Range::default(),
            is_builtin: true,
        }
    }

    /// The well-known unresolved marker (cycles, exhausted chains).
    pub fn unresolved() -> Self {
        Self {
            id: SymbolId::unresolved(),
            file: PathBuf::from(crate::symbol_id::BUILTIN_FILE),
            name: "unresolved".to_string(),
            kind: DefinitionKind::Function,
            range: Range::default(),
            is_builtin: true,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.kind.is_callable()
    }
}

// ── Import records ─────────────────────────────────────────────────

/// One import binding of a file, wired to its target during Phase 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Name the binding introduces locally.
    pub local_name: String,
    /// Range of the import statement's binding.
    pub statement_range: Range,
    /// Module specifier text (`'./util'`, `helpers`, `crate::graph`).
    pub source: Option<String>,
    /// Original exported name when aliased.
    pub imported_name: Option<String>,
    /// Whether this binds a whole module (`import * as ns`, `import os`).
    pub is_namespace: bool,
    /// File the specifier resolved to, when module resolution succeeded.
    pub target_file: Option<PathBuf>,
    /// The definition the import resolved to, when Phase 2 found one.
    pub resolved: Option<ResolvedSymbol>,
}

/// Where a file's import binding points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub file: PathBuf,
    pub exported_name: String,
    pub is_namespace: bool,
}

// ── Project view ───────────────────────────────────────────────────

/// Cross-file lookups available to the resolver. Implemented by the project
/// assembly; absent during Phase 1, present during Phase 2 re-resolution.
pub trait ProjectView {
    /// The definition `file` exports under `name`.
    fn export(&self, file: &Path, name: &str) -> Option<ResolvedSymbol>;

    /// A definition for an exported type name anywhere in the project.
    fn exported_type(&self, name: &str) -> Option<ResolvedSymbol>;

    /// Where `file`'s import binding `local_name` points.
    fn import_target(&self, file: &Path, local_name: &str) -> Option<ImportTarget>;

    /// Another file's graph, for method-range searches.
    fn file_graph(&self, file: &Path) -> Option<&FileGraph>;
}

/// Everything a strategy needs to resolve names in one file.
pub struct ResolutionContext<'a> {
    pub file: &'a FileGraph,
    pub imports: &'a [ImportRecord],
    pub local_types: &'a LocalTypeTracker,
    pub file_types: &'a FileTypeTracker,
    pub project: Option<&'a dyn ProjectView>,
}

impl std::fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("file", &self.file.file_path)
            .field("imports", &self.imports.len())
            .field("project", &self.project.is_some())
            .finish()
    }
}

// ── Strategy trait ─────────────────────────────────────────────────

/// Per-language resolution strategy, selected by file extension.
pub trait ResolverStrategy: Send + Sync + std::fmt::Debug {
    fn language(&self) -> Language;

    /// Resolve a plain name visible at a scope.
    fn resolve_name(
        &self,
        name: &str,
        scope_id: &str,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol>;

    /// Resolve a full reference, including method calls on tracked receivers.
    fn resolve_reference(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol>;
}

static JS: ecma::EcmaResolver = ecma::EcmaResolver {
    language: Language::JavaScript,
};
static TS: ecma::EcmaResolver = ecma::EcmaResolver {
    language: Language::TypeScript,
};
static PY: python::PythonResolver = python::PythonResolver;
static RS: rust::RustResolver = rust::RustResolver;

/// The strategy for a language.
pub fn strategy_for(language: Language) -> &'static dyn ResolverStrategy {
    match language {
        Language::JavaScript => &JS,
        Language::TypeScript => &TS,
        Language::Python => &PY,
        Language::Rust => &RS,
    }
}

// ── Generic core ───────────────────────────────────────────────────

/// Walk the scope chain from `scope_id` to the root, returning the first
/// symbol whose name matches. Import bindings are followed.
pub fn resolve_lexical(
    name: &str,
    scope_id: &str,
    ctx: &ResolutionContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ResolvedSymbol> {
    let start = ctx.file.scopes.index_of(scope_id)?;
    for (_, node) in ctx.file.scopes.chain(start) {
        if let Some(sym) = node.symbols.get(name) {
            return finish(sym, ctx, diagnostics);
        }
    }
    None
}

/// Turn a matched flat symbol into a resolution, following imports.
pub fn finish(
    sym: &SymbolDefinition,
    ctx: &ResolutionContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ResolvedSymbol> {
    if sym.kind == DefinitionKind::Import {
        return follow_import(&sym.name, ctx, diagnostics);
    }
    let owner = owner_of(ctx.file, sym);
    Some(ResolvedSymbol::from_definition(
        &ctx.file.file_path,
        sym,
        owner.as_deref(),
    ))
}

/// The owning class name for a member symbol, read off its scope chain.
pub fn owner_of(file: &FileGraph, sym: &SymbolDefinition) -> Option<String> {
    if !matches!(
        sym.kind,
        DefinitionKind::Method | DefinitionKind::Constructor | DefinitionKind::Property
    ) {
        return None;
    }
    let idx = file.scopes.index_of(&sym.scope_id)?;
    for (_, node) in file.scopes.chain(idx) {
        if node.kind == ScopeKind::Class {
            return node.name.clone();
        }
    }
    None
}

/// Follow an import binding to its target definition, bounded at
/// [`MAX_IMPORT_DEPTH`] hops. Cycles terminate as the unresolved marker plus
/// a diagnostic.
pub fn follow_import(
    local_name: &str,
    ctx: &ResolutionContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ResolvedSymbol> {
    let record = ctx.imports.iter().find(|r| r.local_name == local_name)?;
    if let Some(resolved) = &record.resolved {
        if resolved.kind != DefinitionKind::Import {
            return Some(resolved.clone());
        }
        // A wired re-export: keep hopping through the project tables.
    }
    let project = ctx.project?;
    let (mut file, mut name) = match &record.resolved {
        Some(resolved) => {
            let target = project.import_target(&resolved.file, &resolved.name)?;
            (target.file, target.exported_name)
        }
        None => {
            let file = record.target_file.clone()?;
            let name = record
                .imported_name
                .clone()
                .unwrap_or_else(|| local_name.to_string());
            (file, name)
        }
    };

    let mut depth = 0;
    loop {
        depth += 1;
        if depth > MAX_IMPORT_DEPTH {
            tracing::warn!(name = local_name, file = %ctx.file.file_path.display(), "import chain exceeded depth bound");
            diagnostics.push(Diagnostic::ResolverCycle {
                file: ctx.file.file_path.clone(),
                name: local_name.to_string(),
            });
            return Some(ResolvedSymbol::unresolved());
        }
        let resolved = project.export(&file, &name)?;
        if resolved.kind != DefinitionKind::Import {
            return Some(resolved);
        }
        // Re-export: hop to the next file in the chain.
        let target = project.import_target(&resolved.file, &resolved.name)?;
        file = target.file;
        name = target.exported_name;
    }
}

/// Resolve `binding.member` where `binding` is a namespace import.
pub fn resolve_namespace_member(
    binding: &str,
    member: &str,
    ctx: &ResolutionContext<'_>,
) -> Option<ResolvedSymbol> {
    let record = ctx
        .imports
        .iter()
        .find(|r| r.local_name == binding && r.is_namespace)?;
    let target_file = record.target_file.as_ref()?;
    ctx.project?.export(target_file, member)
}

/// Look up the receiver's tracked type, local bindings first.
pub fn receiver_type<'a>(
    receiver: &str,
    ctx: &'a ResolutionContext<'_>,
) -> Option<&'a TypeInfo> {
    crate::type_tracking::lookup_type(ctx.local_types, ctx.file_types, receiver)
}

/// Resolve a method on a tracked type: the receiver's class file is searched
/// by owner name first, then by the class's enclosing range.
pub fn resolve_method_on_type(
    info: &TypeInfo,
    method: &str,
    ctx: &ResolutionContext<'_>,
) -> Option<ResolvedSymbol> {
    let class_name = &info.class_name;

    // Same-file methods.
    if let Some(m) = ctx.file.find_method(class_name, method) {
        return Some(ResolvedSymbol::from_definition(
            &ctx.file.file_path,
            &m.def,
            Some(class_name),
        ));
    }
    // Enclosing-range search within the class body.
    if let Some(class_def) = &info.class_def {
        if let Some(er) = class_def.enclosing_range {
            if let Some(m) = ctx.file.find_method_in_range(er, method) {
                let owner = m.owner.clone().unwrap_or_else(|| class_name.clone());
                return Some(ResolvedSymbol::from_definition(
                    &ctx.file.file_path,
                    &m.def,
                    Some(&owner),
                ));
            }
        }
    }
    // The class may live in another file (imported class binding).
    let imported = ctx.file_types.imported_class_by_name(class_name)?;
    let project = ctx.project?;
    let graph = project.file_graph(&imported.source_file)?;
    let m = graph.find_method(class_name, method)?;
    Some(ResolvedSymbol::from_definition(
        &graph.file_path,
        &m.def,
        Some(class_name),
    ))
}

/// Name of the class enclosing a scope, for `this`/`self` receivers.
pub fn enclosing_class_name(file: &FileGraph, scope_id: &str) -> Option<String> {
    let idx = file.scopes.index_of(scope_id)?;
    for (_, node) in file.scopes.chain(idx) {
        if node.kind == ScopeKind::Class {
            return node.name.clone();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::{parse_source, LanguageRegistry};

    fn graph(path: &str, source: &str) -> FileGraph {
        let registry = LanguageRegistry::new();
        let support = registry.for_file(Path::new(path)).unwrap();
        let tree = parse_source(support.as_ref(), source, Path::new(path)).unwrap();
        FileGraph::extract(support.as_ref(), &tree, source, Path::new(path))
    }

    fn empty_ctx<'a>(
        file: &'a FileGraph,
        local: &'a LocalTypeTracker,
        tracker: &'a FileTypeTracker,
    ) -> ResolutionContext<'a> {
        ResolutionContext {
            file,
            imports: &[],
            local_types: local,
            file_types: tracker,
            project: None,
        }
    }

    #[test]
    fn lexical_walks_to_module_scope() {
        let file = graph("a.js", "function target() {}\nfunction caller() { target(); }\n");
        let local = LocalTypeTracker::new();
        let tracker = FileTypeTracker::new();
        let ctx = empty_ctx(&file, &local, &tracker);

        let call = file
            .references
            .iter()
            .find(|r| r.name == "target")
            .unwrap()
            .clone();
        let mut diags = Vec::new();
        let resolved = resolve_lexical(&call.name, &call.scope_id, &ctx, &mut diags).unwrap();
        assert_eq!(resolved.id.as_str(), "a.js#target");
        assert!(diags.is_empty());
    }

    #[test]
    fn inner_shadowing_wins() {
        let source = "function f() {}\nfunction g() {\n  function f() {}\n  f();\n}\n";
        let file = graph("a.js", source);
        let local = LocalTypeTracker::new();
        let tracker = FileTypeTracker::new();
        let ctx = empty_ctx(&file, &local, &tracker);

        let call = file
            .references
            .iter()
            .find(|r| r.name == "f" && r.is_call())
            .unwrap()
            .clone();
        let mut diags = Vec::new();
        let resolved = resolve_lexical("f", &call.scope_id, &ctx, &mut diags).unwrap();
        // The inner f is at row 2.
        assert_eq!(resolved.range.start.row, 2);
    }

    #[test]
    fn method_resolution_through_tracked_type() {
        let source = "class C {\n  greet() { return 1; }\n}\nfunction f() {\n  const c = new C();\n  c.greet();\n}\n";
        let file = graph("a.js", source);
        let class_def = file.find_class("C").unwrap().def.clone();

        let mut local = LocalTypeTracker::new();
        local.assign(
            "c",
            TypeInfo {
                class_name: "C".into(),
                class_def: Some(class_def),
                declaration_position: crate::Position::new(4, 8),
            },
        );
        let tracker = FileTypeTracker::new();
        let ctx = empty_ctx(&file, &local, &tracker);

        let info = receiver_type("c", &ctx).unwrap();
        let resolved = resolve_method_on_type(info, "greet", &ctx).unwrap();
        assert_eq!(resolved.id.as_str(), "a.js#C.greet");
        assert_eq!(resolved.kind, DefinitionKind::Method);
    }

    #[test]
    fn owner_read_from_scope_chain() {
        let source = "class C {\n  greet() {}\n}\n";
        let file = graph("a.js", source);
        let method = file.find_method("C", "greet").unwrap().def.clone();
        assert_eq!(owner_of(&file, &method).as_deref(), Some("C"));
    }
}
