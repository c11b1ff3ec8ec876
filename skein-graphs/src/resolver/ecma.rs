// ECMAScript resolution, shared by JavaScript and TypeScript.
//
// Hoisting is already baked into the scope tree at registration time, so the
// lexical walk needs no special cases here. Member calls go through receiver
// type tracking; `import * as ns` bindings answer member lookups from the
// target file's export table. Optional chaining never changes resolution.

use crate::references::{ReferenceKind, SymbolReference};
use crate::{DefinitionKind, Diagnostic, Language};

use super::{
    enclosing_class_name, receiver_type, resolve_lexical, resolve_method_on_type,
    resolve_namespace_member, ResolutionContext, ResolvedSymbol, ResolverStrategy,
};

#[derive(Debug)]
pub struct EcmaResolver {
    pub language: Language,
}

impl ResolverStrategy for EcmaResolver {
    fn language(&self) -> Language {
        self.language
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
            ReferenceKind::MethodCall | ReferenceKind::PropertyAccess => {
                self.resolve_member(reference, ctx, diagnostics)
            }
            ReferenceKind::ConstructorCall => {
                self.resolve_name(&reference.name, &reference.scope_id, ctx, diagnostics)
            }
            ReferenceKind::SuperCall => self.resolve_super(reference, ctx, diagnostics),
            _ => self.resolve_name(&reference.name, &reference.scope_id, ctx, diagnostics),
        }
    }
}

impl EcmaResolver {
    fn resolve_member(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        let member = &reference.name;
        let receiver = reference.receiver_text.as_deref()?;

        // this.method() resolves within the enclosing class.
        if receiver == "this" {
            let class = enclosing_class_name(ctx.file, &reference.scope_id)?;
            let method = ctx.file.find_method(&class, member)?;
            return Some(ResolvedSymbol::from_definition(
                &ctx.file.file_path,
                &method.def,
                Some(&class),
            ));
        }

        // ns.member() through a namespace import.
        if let Some(resolved) = resolve_namespace_member(receiver, member, ctx) {
            return Some(resolved);
        }

        // Receiver with a tracked local/file type.
        if let Some(info) = receiver_type(receiver, ctx) {
            let info = info.clone();
            if let Some(resolved) = resolve_method_on_type(&info, member, ctx) {
                return Some(resolved);
            }
        }

        // ClassName.staticMethod() in the same file.
        if let Some(method) = ctx.file.find_method(receiver, member) {
            return Some(ResolvedSymbol::from_definition(
                &ctx.file.file_path,
                &method.def,
                Some(receiver),
            ));
        }

        // Imported class used statically.
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

    /// `super(...)` targets the base class constructor; `super.m()` the base
    /// class method.
    fn resolve_super(
        &self,
        reference: &SymbolReference,
        ctx: &ResolutionContext<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedSymbol> {
        let class_name = enclosing_class_name(ctx.file, &reference.scope_id)?;
        let class = ctx.file.find_class(&class_name)?;
        let base_name = class.extends.first()?.clone();

        let base = self.resolve_name(&base_name, &reference.scope_id, ctx, diagnostics)?;
        if base.kind != DefinitionKind::Class {
            return Some(base);
        }

        // Prefer the constructor (for super()) or the named method (super.m()).
        let member = if reference.name == "super" {
            "constructor"
        } else {
            reference.name.as_str()
        };
        let graph = if base.file == ctx.file.file_path {
            ctx.file
        } else {
            ctx.project?.file_graph(&base.file)?
        };
        if let Some(class) = graph.find_class(&base.name) {
            if member == "constructor" {
                if let Some(ctor) = class.constructors.first() {
                    return Some(ResolvedSymbol::from_definition(
                        &graph.file_path,
                        &ctor.def,
                        Some(&base.name),
                    ));
                }
            } else if let Some(method) = graph.find_method(&base.name, member) {
                return Some(ResolvedSymbol::from_definition(
                    &graph.file_path,
                    &method.def,
                    Some(&base.name),
                ));
            }
        }
        Some(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FileGraph;
    use crate::languages::{parse_source, LanguageRegistry};
    use crate::type_tracking::{FileTypeTracker, LocalTypeTracker, TypeInfo};
    use std::path::Path;

    fn graph(path: &str, source: &str) -> FileGraph {
        let registry = LanguageRegistry::new();
        let support = registry.for_file(Path::new(path)).unwrap();
        let tree = parse_source(support.as_ref(), source, Path::new(path)).unwrap();
        FileGraph::extract(support.as_ref(), &tree, source, Path::new(path))
    }

    fn resolver() -> EcmaResolver {
        EcmaResolver {
            language: Language::JavaScript,
        }
    }

    #[test]
    fn this_method_resolves_in_enclosing_class() {
        let source =
            "class C {\n  helper() {}\n  run() { this.helper(); }\n}\n";
        let file = graph("a.js", source);
        let local = LocalTypeTracker::new();
        let tracker = FileTypeTracker::new();
        let ctx = ResolutionContext {
            file: &file,
            imports: &[],
            local_types: &local,
            file_types: &tracker,
            project: None,
        };

        let call = file
            .references
            .iter()
            .find(|r| r.name == "helper" && r.kind == ReferenceKind::MethodCall)
            .unwrap()
            .clone();
        let mut diags = Vec::new();
        let resolved = resolver()
            .resolve_reference(&call, &ctx, &mut diags)
            .unwrap();
        assert_eq!(resolved.id.as_str(), "a.js#C.helper");
    }

    #[test]
    fn tracked_receiver_resolves_method() {
        let source = "class C {\n  greet() {}\n}\nfunction f() {\n  const c = new C();\n  c.greet();\n}\n";
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
        let ctx = ResolutionContext {
            file: &file,
            imports: &[],
            local_types: &local,
            file_types: &tracker,
            project: None,
        };

        let call = file
            .references
            .iter()
            .find(|r| r.name == "greet" && r.kind == ReferenceKind::MethodCall)
            .unwrap()
            .clone();
        let mut diags = Vec::new();
        let resolved = resolver()
            .resolve_reference(&call, &ctx, &mut diags)
            .unwrap();
        assert_eq!(resolved.id.as_str(), "a.js#C.greet");
    }

    #[test]
    fn hoisted_function_visible_before_definition() {
        let source = "function early() { late(); }\nfunction late() {}\n";
        let file = graph("a.js", source);
        let local = LocalTypeTracker::new();
        let tracker = FileTypeTracker::new();
        let ctx = ResolutionContext {
            file: &file,
            imports: &[],
            local_types: &local,
            file_types: &tracker,
            project: None,
        };

        let call = file
            .references
            .iter()
            .find(|r| r.name == "late")
            .unwrap()
            .clone();
        let mut diags = Vec::new();
        let resolved = resolver()
            .resolve_name(&call.name, &call.scope_id, &ctx, &mut diags)
            .unwrap();
        assert_eq!(resolved.id.as_str(), "a.js#late");
    }

    #[test]
    fn unknown_member_does_not_resolve() {
        let source = "function f(x) { x.mystery(); }\n";
        let file = graph("a.js", source);
        let local = LocalTypeTracker::new();
        let tracker = FileTypeTracker::new();
        let ctx = ResolutionContext {
            file: &file,
            imports: &[],
            local_types: &local,
            file_types: &tracker,
            project: None,
        };

        let call = file
            .references
            .iter()
            .find(|r| r.name == "mystery")
            .unwrap()
            .clone();
        let mut diags = Vec::new();
        assert!(resolver().resolve_reference(&call, &ctx, &mut diags).is_none());
    }
}
