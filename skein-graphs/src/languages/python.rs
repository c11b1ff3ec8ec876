use std::sync::LazyLock;

use tree_sitter::{Node, Tree};

use crate::capture::{
    CaptureCategory, CaptureConfig, CaptureContext, CaptureEntity, CaptureMapping, ModifierValue,
    RawCapture,
};
use crate::Language;

use super::helpers::{
    ancestor_of_kind, assigned_identifier, child_by_field, find_child_by_kind, node_range,
    node_text, string_list_literal,
};
use super::LanguageSupport;

const CONSTRUCT_KINDS: &[&str] = &["function_definition", "class_definition", "lambda"];

static CONFIG: LazyLock<CaptureConfig> = LazyLock::new(|| {
    use CaptureCategory as Cat;
    use CaptureEntity as Ent;

    CaptureConfig::new(vec![
        // Scopes
        ("scope.class", CaptureMapping::new(Cat::Scope, Ent::Class)),
        (
            "scope.function",
            CaptureMapping::new(Cat::Scope, Ent::Function),
        ),
        ("scope.method", CaptureMapping::new(Cat::Scope, Ent::Method)),
        (
            "scope.constructor",
            CaptureMapping::new(Cat::Scope, Ent::Constructor),
        ),
        (
            "scope.lambda",
            CaptureMapping::new(Cat::Scope, Ent::Closure),
        ),
        // Definitions
        (
            "def.class",
            CaptureMapping::new(Cat::Definition, Ent::Class).with_context(class_def_context),
        ),
        (
            "def.function",
            CaptureMapping::new(Cat::Definition, Ent::Function).with_context(def_context),
        ),
        (
            "def.method",
            CaptureMapping::new(Cat::Definition, Ent::Method).with_context(def_context),
        ),
        (
            "def.constructor",
            CaptureMapping::new(Cat::Definition, Ent::Constructor).with_context(def_context),
        ),
        (
            "def.param",
            CaptureMapping::new(Cat::Definition, Ent::Parameter).with_context(param_context),
        ),
        (
            "def.variable",
            CaptureMapping::new(Cat::Definition, Ent::Variable),
        ),
        // Imports / exports
        (
            "import.module",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(import_module_modifiers)
                .with_context(import_module_context),
        ),
        (
            "import.named",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(import_named_modifiers)
                .with_context(import_from_context),
        ),
        (
            "import.star",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(import_star_modifiers)
                .with_context(import_from_context),
        ),
        (
            "export.all",
            CaptureMapping::new(Cat::Export, Ent::Export).with_context(export_all_context),
        ),
        // Resolver pragmas
        (
            "modifier.global",
            CaptureMapping::new(Cat::Modifier, Ent::Global),
        ),
        (
            "modifier.nonlocal",
            CaptureMapping::new(Cat::Modifier, Ent::Nonlocal),
        ),
        // References
        (
            "ref.call",
            CaptureMapping::new(Cat::Reference, Ent::Call).with_context(call_context),
        ),
        (
            "ref.assignment",
            CaptureMapping::new(Cat::Assignment, Ent::Variable).with_context(assignment_context),
        ),
        (
            "ref.return",
            CaptureMapping::new(Cat::Return, Ent::Variable).with_context(return_context),
        ),
        // Decorators
        (
            "decorator",
            CaptureMapping::new(Cat::Decorator, Ent::Decorator),
        ),
    ])
});

#[derive(Debug)]
pub struct PythonSupport;

impl LanguageSupport for PythonSupport {
    fn id(&self) -> &'static str {
        "python"
    }

    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn capture_config(&self) -> &CaptureConfig {
        &CONFIG
    }

    fn collect_captures<'t>(&self, tree: &'t Tree, source: &str) -> Vec<RawCapture<'t>> {
        let mut out = Vec::new();
        walk(tree.root_node(), source, &mut out);
        out
    }
}

fn walk<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    for child in children {
        dispatch(child, source, out);
    }
}

fn dispatch<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    match node.kind() {
        "function_definition" => {
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source);
                let in_class = directly_in_class(node);
                let (def_name, scope_name) = if in_class && name == "__init__" {
                    ("def.constructor", "scope.constructor")
                } else if in_class {
                    ("def.method", "scope.method")
                } else {
                    ("def.function", "scope.function")
                };
                out.push(RawCapture::new(def_name, name_node, source));
                out.push(RawCapture::named(scope_name, node, name.to_string()));
            }
            collect_params(node, source, out);
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "class_definition" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.class", name_node, source));
                out.push(RawCapture::named(
                    "scope.class",
                    node,
                    node_text(name_node, source).to_string(),
                ));
            }
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "decorated_definition" => {
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            for child in children {
                if child.kind() == "decorator" {
                    let target = find_child_by_kind(child, "identifier")
                        .or_else(|| {
                            find_child_by_kind(child, "call")
                                .and_then(|c| child_by_field(c, "function"))
                        })
                        .or_else(|| find_child_by_kind(child, "attribute"))
                        .unwrap_or(child);
                    out.push(RawCapture::new("decorator", target, source));
                } else {
                    dispatch(child, source, out);
                }
            }
        }
        "lambda" => {
            out.push(RawCapture::named("scope.lambda", node, String::new()));
            collect_params(node, source, out);
            if let Some(body) = child_by_field(node, "body") {
                dispatch(body, source, out);
            }
        }
        "assignment" | "augmented_assignment" => {
            if let Some(left) = child_by_field(node, "left") {
                if left.kind() == "identifier" {
                    let name = node_text(left, source);
                    if name == "__all__" {
                        if let Some(right) = child_by_field(node, "right") {
                            out.push(RawCapture::named(
                                "export.all",
                                right,
                                "__all__".to_string(),
                            ));
                        }
                    } else {
                        out.push(RawCapture::new("def.variable", left, source));
                        out.push(RawCapture::new("ref.assignment", left, source));
                    }
                }
            }
            if let Some(right) = child_by_field(node, "right") {
                dispatch(right, source, out);
            }
        }
        "call" => {
            if let Some(func) = child_by_field(node, "function") {
                match func.kind() {
                    "identifier" => out.push(RawCapture::new("ref.call", func, source)),
                    "attribute" => {
                        if let Some(attr) = child_by_field(func, "attribute") {
                            out.push(RawCapture::new("ref.call", attr, source));
                        }
                        if let Some(object) = child_by_field(func, "object") {
                            dispatch(object, source, out);
                        }
                    }
                    _ => dispatch(func, source, out),
                }
            }
            if let Some(args) = child_by_field(node, "arguments") {
                walk(args, source, out);
            }
        }
        "import_statement" => {
            // import foo, foo.bar as baz
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            for child in children {
                match child.kind() {
                    "dotted_name" => {
                        let leaf = find_child_by_kind(child, "identifier").unwrap_or(child);
                        out.push(RawCapture::new("import.module", leaf, source));
                    }
                    "aliased_import" => {
                        if let Some(alias) = child_by_field(child, "alias") {
                            out.push(RawCapture::new("import.module", alias, source));
                        }
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            let mut saw_module = false;
            for child in children {
                match child.kind() {
                    "dotted_name" => {
                        if !saw_module {
                            saw_module = true; // first dotted_name is the module
                            continue;
                        }
                        let leaf = last_child_of_kind(child, "identifier").unwrap_or(child);
                        out.push(RawCapture::new("import.named", leaf, source));
                    }
                    "aliased_import" => {
                        if let Some(alias) = child_by_field(child, "alias") {
                            out.push(RawCapture::new("import.named", alias, source));
                        }
                    }
                    "wildcard_import" => {
                        out.push(RawCapture::named("import.star", child, "*".to_string()));
                    }
                    _ => {}
                }
            }
        }
        "global_statement" | "nonlocal_statement" => {
            let capture_name = if node.kind() == "global_statement" {
                "modifier.global"
            } else {
                "modifier.nonlocal"
            };
            let mut cursor = node.walk();
            let idents: Vec<Node<'t>> = node
                .children(&mut cursor)
                .filter(|c| c.kind() == "identifier")
                .collect();
            for ident in idents {
                out.push(RawCapture::new(capture_name, ident, source));
            }
        }
        "return_statement" => {
            let expr = {
                let mut cursor = node.walk();
                node.named_children(&mut cursor).next()
            };
            match expr {
                Some(e) => {
                    out.push(RawCapture::named(
                        "ref.return",
                        e,
                        node_text(e, source).lines().next().unwrap_or_default().to_string(),
                    ));
                    dispatch(e, source, out);
                }
                None => out.push(RawCapture::named("ref.return", node, String::new())),
            }
        }
        _ => walk(node, source, out),
    }
}

/// Whether a function definition sits directly in a class body (a method)
/// rather than nested inside another function.
fn directly_in_class(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "class_definition" => return true,
            "function_definition" | "lambda" => return false,
            _ => current = n.parent(),
        }
    }
    false
}

fn collect_params<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let Some(params) = child_by_field(node, "parameters") else {
        return;
    };
    let mut cursor = params.walk();
    let children: Vec<Node<'t>> = params.children(&mut cursor).collect();
    for child in children {
        let name = match child.kind() {
            "identifier" => Some(child),
            "typed_parameter" | "typed_default_parameter" | "default_parameter" => {
                child_by_field(child, "name")
                    .or_else(|| find_child_by_kind(child, "identifier"))
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                find_child_by_kind(child, "identifier")
            }
            _ => None,
        };
        if let Some(n) = name {
            out.push(RawCapture::new("def.param", n, source));
        }
    }
}

fn last_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.kind() == kind)
        .last()
}

// ── Extractors ─────────────────────────────────────────────────────

fn def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.enclosing_range = super::helpers::enclosing_construct_range(node, CONSTRUCT_KINDS);
    ctx.owner = super::helpers::enclosing_construct_name(node, &["class_definition"], source);
    ctx.return_type = ancestor_of_kind(node, &["function_definition"])
        .and_then(|f| child_by_field(f, "return_type"))
        .map(|t| node_text(t, source).to_string());
    Some(ctx)
}

fn class_def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = def_context(node, source)?;
    let class = ancestor_of_kind(node, &["class_definition"])?;
    if let Some(superclasses) = child_by_field(class, "superclasses") {
        let mut cursor = superclasses.walk();
        for child in superclasses.children(&mut cursor) {
            if matches!(child.kind(), "identifier" | "attribute") {
                ctx.extends.push(node_text(child, source).to_string());
            }
        }
    }
    Some(ctx)
}

fn param_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    if let Some(typed) = ancestor_of_kind(node, &["typed_parameter", "typed_default_parameter"]) {
        ctx.annotation_type = child_by_field(typed, "type")
            .map(|t| node_text(t, source).to_string());
    }
    Some(ctx)
}

fn import_module_modifiers(_node: Node<'_>, _source: &str) -> Vec<(&'static str, ModifierValue)> {
    // A bare `import foo` binds a module namespace, queried as `foo.member`.
    vec![("is_namespace", ModifierValue::Flag(true))]
}

fn import_module_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    let dotted = ancestor_of_kind(node, &["dotted_name", "aliased_import"]);
    ctx.import_source = match dotted {
        Some(n) if n.kind() == "aliased_import" => {
            child_by_field(n, "name").map(|d| node_text(d, source).to_string())
        }
        Some(n) => Some(node_text(n, source).to_string()),
        None => Some(node_text(node, source).to_string()),
    };
    Some(ctx)
}

fn import_named_modifiers(node: Node<'_>, source: &str) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    if let Some(aliased) = ancestor_of_kind(node, &["aliased_import"]) {
        if let Some(name) = child_by_field(aliased, "name") {
            out.push((
                "imported_name",
                ModifierValue::Text(node_text(name, source).to_string()),
            ));
        }
    }
    out
}

fn import_star_modifiers(_node: Node<'_>, _source: &str) -> Vec<(&'static str, ModifierValue)> {
    vec![("is_wildcard", ModifierValue::Flag(true))]
}

fn import_from_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let statement = ancestor_of_kind(node, &["import_from_statement"])?;
    let mut ctx = CaptureContext::default();
    ctx.import_source = child_by_field(statement, "module_name")
        .map(|m| node_text(m, source).to_string());
    Some(ctx)
}

fn export_all_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.exported_names = string_list_literal(node, source)?;
    Some(ctx)
}

fn call_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    if let Some(attr) = node.parent().filter(|p| p.kind() == "attribute") {
        if let Some(object) = child_by_field(attr, "object") {
            ctx.receiver = Some(node_range(object));
            match object.kind() {
                "identifier" => ctx.receiver_text = Some(node_text(object, source).to_string()),
                _ => {}
            }
        }
        ctx.property_chain = super::helpers::member_chain(attr, source);
    }
    let call = ancestor_of_kind(node, &["call"])?;
    ctx.assigned_to = assigned_identifier(call, source);
    Some(ctx)
}

fn assignment_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.target = Some(node_range(node));
    let assignment = ancestor_of_kind(node, &["assignment", "augmented_assignment"])?;
    ctx.source = child_by_field(assignment, "right").map(node_range);
    ctx.annotation_type = child_by_field(assignment, "type")
        .map(|t| node_text(t, source).to_string());
    ctx.assigned_to = Some(node_text(node, source).to_string());
    Some(ctx)
}

fn return_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.return_type = ancestor_of_kind(node, &["function_definition"])
        .and_then(|f| child_by_field(f, "return_type"))
        .map(|t| node_text(t, source).to_string());
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::normalize_captures;
    use crate::languages::parse_source;
    use std::path::Path;

    fn normalized(source: &str) -> Vec<crate::capture::NormalizedCapture> {
        let lang = PythonSupport;
        let tree = parse_source(&lang, source, Path::new("m.py")).unwrap();
        let raw = lang.collect_captures(&tree, source);
        normalize_captures(lang.capture_config(), &raw, source, Path::new("m.py"))
    }

    #[test]
    fn functions_and_methods_distinguished() {
        let source = "def free():\n    pass\n\nclass C:\n    def method(self):\n        pass\n";
        let caps = normalized(source);
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::Function && c.symbol_name == "free")
        );
        let method = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Method && c.symbol_name == "method")
            .expect("method capture");
        assert_eq!(method.context.owner.as_deref(), Some("C"));
    }

    #[test]
    fn init_is_constructor() {
        let source = "class C:\n    def __init__(self):\n        pass\n";
        let caps = normalized(source);
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::Constructor && c.symbol_name == "__init__")
        );
    }

    #[test]
    fn nested_function_is_not_method() {
        let source = "class C:\n    def m(self):\n        def inner():\n            pass\n";
        let caps = normalized(source);
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::Function && c.symbol_name == "inner")
        );
    }

    #[test]
    fn global_and_nonlocal_pragmas() {
        let source = "x = 1\ndef f():\n    global x\n    def g():\n        nonlocal y\n";
        let caps = normalized(source);
        let global = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Global)
            .expect("global pragma");
        assert_eq!(global.symbol_name, "x");
        assert_eq!(global.category, CaptureCategory::Modifier);
        assert!(caps.iter().any(|c| c.entity == CaptureEntity::Nonlocal && c.symbol_name == "y"));
    }

    #[test]
    fn dunder_all_restricts_exports() {
        let source = "__all__ = ['visible']\ndef visible():\n    pass\ndef hidden():\n    pass\n";
        let caps = normalized(source);
        let export = caps
            .iter()
            .find(|c| c.category == CaptureCategory::Export)
            .expect("export.all capture");
        assert_eq!(export.context.exported_names, vec!["visible"]);
    }

    #[test]
    fn method_call_has_receiver() {
        let source = "svc = Service()\nsvc.run()\n";
        let caps = normalized(source);
        let call = caps
            .iter()
            .find(|c| c.symbol_name == "run" && c.entity == CaptureEntity::Call)
            .expect("method call");
        assert_eq!(call.context.receiver_text.as_deref(), Some("svc"));
    }

    #[test]
    fn constructor_style_call_records_assignment() {
        let source = "svc = Service()\n";
        let caps = normalized(source);
        let call = caps
            .iter()
            .find(|c| c.symbol_name == "Service" && c.entity == CaptureEntity::Call)
            .expect("call");
        assert_eq!(call.context.assigned_to.as_deref(), Some("svc"));
    }

    #[test]
    fn from_import_with_alias() {
        let source = "from helpers import format_name as fmt\n";
        let caps = normalized(source);
        let import = caps
            .iter()
            .find(|c| c.category == CaptureCategory::Import)
            .expect("import");
        assert_eq!(import.symbol_name, "fmt");
        assert_eq!(import.modifier_text("imported_name"), Some("format_name"));
        assert_eq!(import.context.import_source.as_deref(), Some("helpers"));
    }

    #[test]
    fn bare_import_is_namespace() {
        let caps = normalized("import os\n");
        let import = caps
            .iter()
            .find(|c| c.category == CaptureCategory::Import)
            .expect("import");
        assert!(import.modifier_flag("is_namespace"));
        assert_eq!(import.context.import_source.as_deref(), Some("os"));
    }

    #[test]
    fn wildcard_import_flagged() {
        let caps = normalized("from utils import *\n");
        let import = caps
            .iter()
            .find(|c| c.category == CaptureCategory::Import)
            .expect("import");
        assert!(import.modifier_flag("is_wildcard"));
        assert_eq!(import.symbol_name, "*");
    }

    #[test]
    fn class_superclasses_recorded() {
        let caps = normalized("class Base:\n    pass\nclass Child(Base):\n    pass\n");
        let child = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Class && c.symbol_name == "Child")
            .expect("child class");
        assert_eq!(child.context.extends, vec!["Base"]);
    }
}
