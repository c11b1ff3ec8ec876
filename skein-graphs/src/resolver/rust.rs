// Rust resolution: use-path bindings plus impl-block method search.
//
// Methods on a type live in `impl` blocks textually separate from the type
// definition, so `recv.method()` resolves through the receiver's tracked type
// into a `file#Type.method` lookup or a range search within the impl block.
// `Type::method()` resolves the type first (possibly through `use` imports),
// then searches methods in that type's file. When the receiver is unknown it
// stays unknown; no receiver is ever guessed.

use crate::references::{ReferenceKind, SymbolReference};
use crate::{DefinitionKind, Diagnostic, Language};

use super::{
    enclosing_class_name, receiver_type, resolve_lexical, resolve_method_on_type,
    ResolutionContext, ResolvedSymbol, ResolverStrategy,
};

#[derive(Debug)]
pub struct RustResolver;

impl ResolverStrategy for RustResolver {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn resolve_name(
        &self,
        name: &str,
        scope_id: &str,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        if let Some(resolved) = resolve_lexical(name, scope_id, ctx, diagnostics) {
            return Some(resolved);
        }
        ctx.project.and_then(|p| p.exported_type(name))
    }

    fn resolve_reference(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        match reference.kind {
            ReferenceKind::MethodCall => self.resolve_method(reference, ctx, diagnostics),
            ReferenceKind::FunctionCall if reference.property_chain.len() >= 2 => {
                self.resolve_associated(reference, ctx, diagnostics)
            }
            _ => self.resolve_name(&reference.name, &reference.scope_id, ctx, diagnostics),
        }
    }
}

impl RustResolver {
    /// `recv.method()` — receiver type from tracking, then the owner-keyed
    /// method index, then the impl-block range search.
    fn resolve_method(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        let method = &reference.name;

        if let Some(receiver) = reference.receiver_text.as_deref() {
            if receiver == "self" {
                // The enclosing impl scope carries the target type's name.
                let owner = enclosing_class_name(ctx.file, &reference.scope_id)?;
                let m = ctx.file.find_method(&owner, method)?;
                return Some(ResolvedSymbol::from_definition(
                    &ctx.file.file_path,
                    &m.def,
                    Some(&owner),
                ));
            }

            if let Some(info) = receiver_type(receiver, ctx) {
                let info = info.clone();
                if let Some(resolved) = resolve_method_on_type(&info, method, ctx) {
                    return Some(resolved);
                }
            }

            // The receiver may be a parameter with a declared type.
            if let Some(resolved) =
                self.method_via_declared_param(receiver, method, reference, ctx, diagnostics)
            {
                return Some(resolved);
            }
        }

        // Receiver unknown: symbol-id based fallback across this file's impl
        // blocks. Never guess a receiver.
        ctx.file
            .definitions
            .iter()
            .find_map(|d| match d {
                crate::definitions::Definition::Method(m) if m.def.name == *method => {
                    let owner = m.owner.clone()?;
                    Some(ResolvedSymbol::from_definition(
                        &ctx.file.file_path,
                        &m.def,
                        Some(&owner),
                    ))
                }
                crate::definitions::Definition::Class(c) => {
                    c.methods.iter().find(|m| m.def.name == *method).map(|m| {
                        ResolvedSymbol::from_definition(
                            &ctx.file.file_path,
                            &m.def,
                            Some(&c.def.name),
                        )
                    })
                }
                _ => None,
            })
    }

    /// `Type::method()` — resolve `Type` (through `use` bindings when
    /// needed), then search methods named `method` in that type's file.
    fn resolve_associated(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        let method = &reference.name;
        let head = reference.property_chain.first()?.clone();

        let ty = self.resolve_name(&head, &reference.scope_id, ctx, diagnostics);
        match ty {
            Some(ty) if matches!(ty.kind, DefinitionKind::Class | DefinitionKind::Enum) => {
                let graph = if ty.file == ctx.file.file_path {
                    ctx.file
                } else {
                    ctx.project?.file_graph(&ty.file)?
                };
                let m = graph.find_method(&ty.name, method)?;
                Some(ResolvedSymbol::from_definition(
                    &graph.file_path,
                    &m.def,
                    Some(&ty.name),
                ))
            }
            // Module-qualified free function (`util::helper()`).
            Some(ty) if ty.kind == DefinitionKind::Module => {
                let graph = ctx.project?.file_graph(&ty.file)?;
                let def = graph.find_definition(method)?;
                Some(ResolvedSymbol::from_definition(
                    &graph.file_path,
                    def.symbol(),
                    None,
                ))
            }
            _ => {
                // Head did not resolve; try the type name in the current file
                // anyway — impl blocks are searchable without the struct.
                let m = ctx.file.find_method(&head, method)?;
                Some(ResolvedSymbol::from_definition(
                    &ctx.file.file_path,
                    &m.def,
                    Some(&head),
                ))
            }
        }
    }

    /// `fn run(cfg: Cfg) { cfg.reload() }` — the parameter's declared type
    /// stands in when no constructor assignment was tracked.
    fn method_via_declared_param(
        &self,
        receiver: &str,
        method: &str,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        let scope_idx = ctx.file.scopes.index_of(&reference.scope_id)?;
        let param_type = ctx
            .file
            .scopes
            .chain(scope_idx)
            .find_map(|(_, node)| node.symbols.get(receiver))
            .filter(|sym| sym.kind == DefinitionKind::Parameter)
            .and_then(|_| self.declared_param_type(receiver, reference, ctx))?;

        let ty = self.resolve_name(&param_type, &reference.scope_id, ctx, diagnostics);
        let (graph, type_name) = match ty {
            Some(ty) if matches!(ty.kind, DefinitionKind::Class | DefinitionKind::Enum) => {
                let graph = if ty.file == ctx.file.file_path {
                    ctx.file
                } else {
                    ctx.project?.file_graph(&ty.file)?
                };
                (graph, ty.name)
            }
            _ => (ctx.file, param_type),
        };
        let m = graph.find_method(&type_name, method)?;
        Some(ResolvedSymbol::from_definition(
            &graph.file_path,
            &m.def,
            Some(&type_name),
        ))
    }

    fn declared_param_type(
        &self,
        receiver: &str,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
    ) -> Option<String> {
        let at = reference.location.range.start;
        // Only the function whose body contains the call site can declare the
        // receiver as a parameter.
        ctx.file.definitions.iter().find_map(|d| {
            let (extent, params) = match d {
                crate::definitions::Definition::Function(f) => (f.def.extent(), &f.parameters),
                crate::definitions::Definition::Method(m) => (m.def.extent(), &m.parameters),
                crate::definitions::Definition::Class(c) => {
                    return c.methods.iter().find_map(|m| {
                        if !m.def.extent().contains(at) {
                            return None;
                        }
                        m.parameters
                            .iter()
                            .find(|p| p.def.name == receiver)
                            .and_then(|p| p.type_annotation.as_deref())
                            .map(bare_type_name)
                    });
                }
                _ => return None,
            };
            if !extent.contains(at) {
                return None;
            }
            params
                .iter()
                .find(|p| p.def.name == receiver)
                .and_then(|p| p.type_annotation.as_deref())
                .map(bare_type_name)
        })
    }
}

/// `&mut Cfg` / `Vec<Cfg>` → the head type name.
fn bare_type_name(annotation: &str) -> String {
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
