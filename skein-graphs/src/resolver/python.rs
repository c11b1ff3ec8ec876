// Python resolution: LEGB with `global`/`nonlocal` pragmas.
//
// Lookup order is Local, Enclosing non-class scopes, Global (module), then a
// fixed builtin set as the terminal fallback. Class scopes never participate
// in enclosing-scope lookup for nested functions; `self`/`cls` receivers
// resolve to the enclosing class.

use crate::references::{ReferenceKind, SymbolReference};
use crate::scope::ScopeKind;
use crate::{Diagnostic, Language};

use super::{
    enclosing_class_name, finish, receiver_type, resolve_method_on_type,
    resolve_namespace_member, ResolutionContext, ResolvedSymbol, ResolverStrategy,
};

/// Builtins that terminate lookup. Deliberately the common surface, not the
/// full `builtins` module.
const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "callable", "chr", "dict", "dir", "enumerate",
    "filter", "float", "format", "frozenset", "getattr", "hasattr", "hash", "id", "int",
    "isinstance", "issubclass", "iter", "len", "list", "map", "max", "min", "next", "object",
    "open", "ord", "print", "range", "repr", "reversed", "round", "set", "setattr", "sorted",
    "str", "sum", "super", "tuple", "type", "vars", "zip", "Exception", "ValueError",
    "TypeError", "KeyError", "IndexError", "RuntimeError", "StopIteration",
];

#[derive(Debug)]
pub struct PythonResolver;

impl ResolverStrategy for PythonResolver {
    fn language(&self) -> Language {
        Language::Python
    }

    fn resolve_name(
        &self,
        name: &str,
        scope_id: &str,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        // `global x` pins the lookup to the module scope.
        if ctx.file.pragmas.is_global(scope_id, name) {
            if let Some(sym) = ctx.file.scopes.root().symbols.get(name) {
                return finish(sym, ctx, diagnostics);
            }
            return builtin(name);
        }

        // `nonlocal x` skips the local scope and searches enclosing function
        // scopes, never classes, stopping short of the module.
        if ctx.file.pragmas.is_nonlocal(scope_id, name) {
            let start = ctx.file.scopes.index_of(scope_id)?;
            for (idx, node) in ctx.file.scopes.chain(start).skip(1) {
                let _ = idx;
                if node.parent.is_none() {
                    break; // module scope is out of bounds for nonlocal
                }
                if matches!(
                    node.kind,
                    ScopeKind::Function | ScopeKind::Method | ScopeKind::Constructor
                ) {
                    if let Some(sym) = node.symbols.get(name) {
                        return finish(sym, ctx, diagnostics);
                    }
                }
            }
            return None;
        }

        // LEGB proper.
        if let Some(start) = ctx.file.scopes.index_of(scope_id) {
            let mut is_starting_scope = true;
            for (_, node) in ctx.file.scopes.chain(start) {
                let is_module = node.parent.is_none();
                let skip_class = node.kind == ScopeKind::Class && !is_starting_scope && !is_module;
                if !skip_class {
                    if let Some(sym) = node.symbols.get(name) {
                        return finish(sym, ctx, diagnostics);
                    }
                }
                is_starting_scope = false;
            }
        }

        if let Some(resolved) = ctx.project.and_then(|p| p.exported_type(name)) {
            return Some(resolved);
        }
        builtin(name)
    }

    fn resolve_reference(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        match reference.kind {
            ReferenceKind::MethodCall | ReferenceKind::PropertyAccess => {
                self.resolve_member(reference, ctx, diagnostics)
            }
            _ => self.resolve_name(&reference.name, &reference.scope_id, ctx, diagnostics),
        }
    }
}

impl PythonResolver {
    fn resolve_member(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        let member = &reference.name;
        let receiver = reference.receiver_text.as_deref()?;

        // self.method() / cls.method() within the enclosing class.
        if receiver == "self" || receiver == "cls" {
            let class = enclosing_class_name(ctx.file, &reference.scope_id)?;
            let method = ctx.file.find_method(&class, member)?;
            return Some(ResolvedSymbol::from_definition(
                &ctx.file.file_path,
                &method.def,
                Some(&class),
            ));
        }

        // module.func() through `import module`.
        if let Some(resolved) = resolve_namespace_member(receiver, member, ctx) {
            return Some(resolved);
        }

        // Receiver with a tracked type.
        if let Some(info) = receiver_type(receiver, ctx) {
            let info = info.clone();
            if let Some(resolved) = resolve_method_on_type(&info, member, ctx) {
                return Some(resolved);
            }
        }

        // ClassName.method() used statically.
        if let Some(method) = ctx.file.find_method(receiver, member) {
            return Some(ResolvedSymbol::from_definition(
                &ctx.file.file_path,
                &method.def,
                Some(receiver),
            ));
        }
        if let Some(imported) = ctx.file_types.imported_class(receiver) {
            let imported = imported.clone();
            let project = ctx.project?;
            let graph = project.file_graph(&imported.source_file)?;
            let method = graph.find_method(&imported.class_name, member)?;
            return Some(ResolvedSymbol::from_definition(
                &graph.file_path,
                &method.def,
                Some(&imported.class_name),
            ));
        }

        let _ = diagnostics;
        None
    }
}

fn builtin(name: &str) -> Option<ResolvedSymbol> {
    PYTHON_BUILTINS
        .contains(&name)
        .then(|| ResolvedSymbol::builtin(name))
}
