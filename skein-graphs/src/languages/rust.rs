use std::sync::LazyLock;

use tree_sitter::{Node, Tree};

use crate::capture::{
    CaptureCategory, CaptureConfig, CaptureContext, CaptureEntity, CaptureMapping, ModifierValue,
    RawCapture,
};
use crate::Language;

use super::helpers::{
    ancestor_of_kind, assigned_identifier, child_by_field, find_child_by_kind, member_chain,
    node_range, node_text,
};
use super::LanguageSupport;

const CONSTRUCT_KINDS: &[&str] = &[
    "function_item",
    "struct_item",
    "enum_item",
    "trait_item",
    "impl_item",
    "mod_item",
    "union_item",
];

static CONFIG: LazyLock<CaptureConfig> = LazyLock::new(|| {
    use CaptureCategory as Cat;
    use CaptureEntity as Ent;

    CaptureConfig::new(vec![
        // Scopes
        (
            "scope.function",
            CaptureMapping::new(Cat::Scope, Ent::Function),
        ),
        ("scope.method", CaptureMapping::new(Cat::Scope, Ent::Method)),
        ("scope.impl", CaptureMapping::new(Cat::Scope, Ent::Class)),
        ("scope.trait", CaptureMapping::new(Cat::Scope, Ent::Class)),
        ("scope.mod", CaptureMapping::new(Cat::Scope, Ent::Module)),
        // Definitions
        (
            "def.struct",
            CaptureMapping::new(Cat::Definition, Ent::Class)
                .with_modifiers(item_modifiers)
                .with_context(def_context),
        ),
        (
            "def.enum",
            CaptureMapping::new(Cat::Definition, Ent::Enum)
                .with_modifiers(item_modifiers)
                .with_context(enum_def_context),
        ),
        (
            "def.trait",
            CaptureMapping::new(Cat::Definition, Ent::Interface)
                .with_modifiers(item_modifiers)
                .with_context(def_context),
        ),
        (
            "def.function",
            CaptureMapping::new(Cat::Definition, Ent::Function)
                .with_modifiers(item_modifiers)
                .with_context(def_context),
        ),
        (
            "def.method",
            CaptureMapping::new(Cat::Definition, Ent::Method)
                .with_modifiers(method_modifiers)
                .with_context(method_context),
        ),
        (
            "def.field",
            CaptureMapping::new(Cat::Definition, Ent::Field)
                .with_modifiers(item_modifiers)
                .with_context(field_context),
        ),
        (
            "def.const",
            CaptureMapping::new(Cat::Definition, Ent::Constant).with_modifiers(item_modifiers),
        ),
        (
            "def.type_alias",
            CaptureMapping::new(Cat::Definition, Ent::TypeAlias).with_modifiers(item_modifiers),
        ),
        (
            "def.mod",
            CaptureMapping::new(Cat::Definition, Ent::Module).with_modifiers(item_modifiers),
        ),
        (
            "def.param",
            CaptureMapping::new(Cat::Definition, Ent::Parameter).with_context(param_context),
        ),
        // Imports
        (
            "import.use",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(use_modifiers)
                .with_context(use_context),
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
    ])
});

#[derive(Debug)]
pub struct RustSupport;

impl LanguageSupport for RustSupport {
    fn id(&self) -> &'static str {
        "rust"
    }

    fn language(&self) -> Language {
        Language::Rust
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
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
        "function_item" | "function_signature_item" => {
            let in_impl_or_trait = node
                .parent()
                .and_then(|p| p.parent())
                .is_some_and(|gp| matches!(gp.kind(), "impl_item" | "trait_item"));
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source);
                if in_impl_or_trait {
                    out.push(RawCapture::new("def.method", name_node, source));
                    out.push(RawCapture::named("scope.method", node, name.to_string()));
                } else {
                    out.push(RawCapture::new("def.function", name_node, source));
                    out.push(RawCapture::named("scope.function", node, name.to_string()));
                }
            }
            collect_params(node, source, out);
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "struct_item" | "union_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.struct", name_node, source));
            }
            if let Some(body) = child_by_field(node, "body") {
                collect_fields(body, source, out);
            }
        }
        "enum_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.enum", name_node, source));
            }
        }
        "trait_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.trait", name_node, source));
                out.push(RawCapture::named(
                    "scope.trait",
                    node,
                    node_text(name_node, source).to_string(),
                ));
            }
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "impl_item" => {
            if let Some(type_node) = child_by_field(node, "type") {
                out.push(RawCapture::named(
                    "scope.impl",
                    node,
                    node_text(type_node, source).to_string(),
                ));
            }
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "mod_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.mod", name_node, source));
                out.push(RawCapture::named(
                    "scope.mod",
                    node,
                    node_text(name_node, source).to_string(),
                ));
            }
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "const_item" | "static_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.const", name_node, source));
            }
        }
        "type_item" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.type_alias", name_node, source));
            }
        }
        "use_declaration" => {
            if let Some(arg) = child_by_field(node, "argument") {
                collect_use(arg, source, out);
            }
        }
        "let_declaration" => {
            if let Some(pattern) = child_by_field(node, "pattern") {
                if pattern.kind() == "identifier" && child_by_field(node, "value").is_some() {
                    out.push(RawCapture::new("ref.assignment", pattern, source));
                }
            }
            if let Some(value) = child_by_field(node, "value") {
                dispatch(value, source, out);
            }
        }
        "assignment_expression" => {
            if let Some(left) = child_by_field(node, "left") {
                if left.kind() == "identifier" {
                    out.push(RawCapture::new("ref.assignment", left, source));
                }
            }
            if let Some(right) = child_by_field(node, "right") {
                dispatch(right, source, out);
            }
        }
        "call_expression" => {
            collect_call(node, source, out);
            if let Some(args) = child_by_field(node, "arguments") {
                walk(args, source, out);
            }
            // Chained receivers (`a.b().c()`) carry inner calls.
            if let Some(func) = child_by_field(node, "function") {
                if func.kind() == "field_expression" {
                    if let Some(value) = child_by_field(func, "value") {
                        dispatch(value, source, out);
                    }
                }
            }
        }
        "return_expression" => {
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

fn collect_fields<'t>(body: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let mut cursor = body.walk();
    let fields: Vec<Node<'t>> = body
        .children(&mut cursor)
        .filter(|c| c.kind() == "field_declaration")
        .collect();
    for field in fields {
        if let Some(name) = child_by_field(field, "name") {
            out.push(RawCapture::new("def.field", name, source));
        }
    }
}

fn collect_params<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let Some(params) = child_by_field(node, "parameters") else {
        return;
    };
    let mut cursor = params.walk();
    let children: Vec<Node<'t>> = params.children(&mut cursor).collect();
    for child in children {
        if child.kind() == "parameter" {
            if let Some(pattern) = child_by_field(child, "pattern") {
                if pattern.kind() == "identifier" {
                    out.push(RawCapture::new("def.param", pattern, source));
                }
            }
        } else if child.kind() == "self_parameter" {
            out.push(RawCapture::new("def.param", child, source));
        }
    }
}

fn collect_use<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    match node.kind() {
        "use_as_clause" => {
            if let Some(alias) = child_by_field(node, "alias") {
                out.push(RawCapture::new("import.use", alias, source));
            }
        }
        "use_list" => {
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            for child in children {
                collect_use(child, source, out);
            }
        }
        "scoped_use_list" => {
            if let Some(list) = find_child_by_kind(node, "use_list") {
                collect_use(list, source, out);
            }
        }
        "use_wildcard" => {
            out.push(RawCapture::named("import.use", node, "*".to_string()));
        }
        "scoped_identifier" => {
            if let Some(name) = child_by_field(node, "name") {
                out.push(RawCapture::new("import.use", name, source));
            }
        }
        "identifier" => {
            out.push(RawCapture::new("import.use", node, source));
        }
        _ => {}
    }
}

fn collect_call<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let Some(func) = child_by_field(node, "function") else {
        return;
    };
    match func.kind() {
        "identifier" => out.push(RawCapture::new("ref.call", func, source)),
        // Type::method() and module::function()
        "scoped_identifier" => {
            if let Some(name) = child_by_field(func, "name") {
                out.push(RawCapture::new("ref.call", name, source));
            }
        }
        // recv.method()
        "field_expression" => {
            if let Some(field) = child_by_field(func, "field") {
                out.push(RawCapture::new("ref.call", field, source));
            }
        }
        _ => {}
    }
}

// ── Extractors ─────────────────────────────────────────────────────

fn has_pub(node: Node<'_>) -> bool {
    find_child_by_kind(node, "visibility_modifier").is_some()
}

fn item_modifiers(node: Node<'_>, _source: &str) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    if let Some(item) = ancestor_of_kind(node, CONSTRUCT_KINDS)
        .or_else(|| ancestor_of_kind(node, &["const_item", "static_item", "type_item", "field_declaration"]))
    {
        if has_pub(item) {
            out.push(("is_public", ModifierValue::Flag(true)));
            out.push(("is_exported", ModifierValue::Flag(true)));
        }
    }
    out
}

fn method_modifiers(node: Node<'_>, source: &str) -> Vec<(&'static str, ModifierValue)> {
    let mut out = item_modifiers(node, source);
    if let Some(func) = ancestor_of_kind(node, &["function_item", "function_signature_item"]) {
        let has_self = child_by_field(func, "parameters")
            .and_then(|p| find_child_by_kind(p, "self_parameter"))
            .is_some();
        if !has_self {
            out.push(("is_static", ModifierValue::Flag(true)));
        }
    }
    out
}

fn def_context(node: Node<'_>, _source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.enclosing_range = super::helpers::enclosing_construct_range(node, CONSTRUCT_KINDS);
    Some(ctx)
}

fn method_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.enclosing_range = super::helpers::enclosing_construct_range(
        node,
        &["function_item", "function_signature_item"],
    );
    // Owner is the impl target or trait name, read from the enclosing block.
    if let Some(block) = ancestor_of_kind(node, &["impl_item", "trait_item"]) {
        let owner = if block.kind() == "impl_item" {
            child_by_field(block, "type").map(|t| node_text(t, source).to_string())
        } else {
            child_by_field(block, "name").map(|t| node_text(t, source).to_string())
        };
        ctx.owner = owner.map(|o| strip_generics(&o));
    }
    Some(ctx)
}

fn enum_def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = def_context(node, source)?;
    let item = ancestor_of_kind(node, &["enum_item"])?;
    if let Some(body) = child_by_field(item, "body") {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            if child.kind() == "enum_variant" {
                if let Some(name) = child_by_field(child, "name") {
                    ctx.exported_names.push(node_text(name, source).to_string());
                }
            }
        }
    }
    Some(ctx)
}

fn field_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    if let Some(field) = ancestor_of_kind(node, &["field_declaration"]) {
        ctx.annotation_type = child_by_field(field, "type")
            .map(|t| node_text(t, source).to_string());
        ctx.owner = ancestor_of_kind(node, &["struct_item", "union_item", "enum_item"])
            .and_then(|s| child_by_field(s, "name"))
            .map(|n| node_text(n, source).to_string());
    }
    Some(ctx)
}

fn param_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    if let Some(param) = ancestor_of_kind(node, &["parameter"]) {
        ctx.annotation_type = child_by_field(param, "type")
            .map(|t| node_text(t, source).to_string());
    }
    Some(ctx)
}

fn use_modifiers(node: Node<'_>, source: &str) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    let Some(decl) = ancestor_of_kind(node, &["use_declaration"]) else {
        return out;
    };
    if has_pub(decl) {
        out.push(("is_reexport", ModifierValue::Flag(true)));
        out.push(("is_exported", ModifierValue::Flag(true)));
    }
    if let Some(clause) = ancestor_of_kind(node, &["use_as_clause"]) {
        if let Some(path) = child_by_field(clause, "path") {
            let original = match path.kind() {
                "scoped_identifier" => child_by_field(path, "name")
                    .map(|n| node_text(n, source).to_string()),
                "identifier" => Some(node_text(path, source).to_string()),
                _ => None,
            };
            if let Some(original) = original {
                out.push(("imported_name", ModifierValue::Text(original)));
            }
        }
    }
    let text = node_text(decl, source);
    let path = text
        .strip_prefix("pub ")
        .unwrap_or(text)
        .trim_start_matches("use ")
        .trim_start();
    for prefix in ["crate", "super", "self"] {
        if path.starts_with(prefix)
            && path[prefix.len()..].starts_with("::")
        {
            out.push(("path_prefix", ModifierValue::Text(prefix.to_string())));
            break;
        }
    }
    out
}

fn use_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let decl = ancestor_of_kind(node, &["use_declaration"])?;
    let mut ctx = CaptureContext::default();
    ctx.import_source = child_by_field(decl, "argument")
        .map(|a| node_text(a, source).to_string());
    Some(ctx)
}

fn call_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    let parent = node.parent()?;
    match parent.kind() {
        "scoped_identifier" => {
            // Type::method() — record the path; the head segment is the
            // receiver type for associated-call resolution.
            ctx.property_chain = member_chain(parent, source);
            if let Some(path) = child_by_field(parent, "path") {
                let head = node_text(path, source);
                ctx.type_name = Some(strip_generics(head));
            }
        }
        "field_expression" => {
            if let Some(value) = child_by_field(parent, "value") {
                ctx.receiver = Some(node_range(value));
                if value.kind() == "identifier" {
                    ctx.receiver_text = Some(node_text(value, source).to_string());
                } else if value.kind() == "self" {
                    ctx.receiver_text = Some("self".to_string());
                }
            }
            ctx.property_chain = member_chain(parent, source);
        }
        _ => {}
    }
    let call = ancestor_of_kind(node, &["call_expression"])?;
    ctx.assigned_to = assigned_identifier(call, source);
    Some(ctx)
}

fn assignment_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.target = Some(node_range(node));
    if let Some(decl) = ancestor_of_kind(node, &["let_declaration"]) {
        ctx.source = child_by_field(decl, "value").map(node_range);
        ctx.annotation_type = child_by_field(decl, "type")
            .map(|t| strip_generics(node_text(t, source)));
    } else if let Some(assign) = ancestor_of_kind(node, &["assignment_expression"]) {
        ctx.source = child_by_field(assign, "right").map(node_range);
    }
    ctx.assigned_to = Some(node_text(node, source).to_string());
    Some(ctx)
}

fn return_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.return_type = ancestor_of_kind(node, &["function_item"])
        .and_then(|f| child_by_field(f, "return_type"))
        .map(|t| node_text(t, source).to_string());
    Some(ctx)
}

fn strip_generics(name: &str) -> String {
    name.split('<').next().unwrap_or(name).trim().to_string()
}
