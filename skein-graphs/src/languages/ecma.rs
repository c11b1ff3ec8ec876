// Shared ECMAScript capture collection for TypeScript and JavaScript.
//
// Walks all patterns common to both grammars: function/class/method
// declarations, variable declarators, import/export statements, calls,
// constructions, assignments, returns. TypeScript-only constructs
// (interfaces, type aliases, enums, namespaces, decorators, annotations) are
// handled here too since their node kinds simply never appear in JS trees.
//
// The collector only tags nodes with capture names; all parent-context work
// (receivers, enclosing ranges, export flags) happens in the extractor
// functions referenced by the capture config tables.

use tree_sitter::{Node, Tree};

use crate::capture::{
    CaptureCategory, CaptureContext, CaptureEntity, CaptureMapping, ModifierValue, RawCapture,
};

use super::helpers::{
    ancestor_of_kind, assigned_identifier, child_by_field, find_child_by_kind,
    has_ancestor_of_kind, member_chain, node_range, node_text,
};

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "method_signature",
];

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration"];

const CONSTRUCT_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "method_signature",
    "class_declaration",
    "abstract_class_declaration",
    "interface_declaration",
    "enum_declaration",
    "internal_module",
    "module",
];

// ── Collection ─────────────────────────────────────────────────────

/// Collect raw captures from an ECMAScript syntax tree.
pub fn collect_captures<'t>(tree: &'t Tree, source: &str) -> Vec<RawCapture<'t>> {
    let mut out = Vec::new();
    walk(tree.root_node(), source, &mut out);
    out
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
        "function_declaration" | "generator_function_declaration" | "function_expression" => {
            let name = child_by_field(node, "name");
            if let Some(name_node) = name {
                out.push(RawCapture::new("def.function", name_node, source));
            }
            let label = name.map_or(String::new(), |n| node_text(n, source).to_string());
            out.push(RawCapture::named(
                if node.kind() == "function_expression" && name.is_none() {
                    "scope.closure"
                } else {
                    "scope.function"
                },
                node,
                label,
            ));
            collect_params(node, source, out);
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "arrow_function" => {
            let label = assigned_identifier(node, source).unwrap_or_default();
            out.push(RawCapture::named("scope.closure", node, label));
            collect_params(node, source, out);
            if let Some(body) = child_by_field(node, "body") {
                if body.kind() == "statement_block" {
                    walk(body, source, out);
                } else {
                    // Expression-bodied arrow: the body itself may be a call.
                    dispatch(body, source, out);
                }
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
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
        "method_definition" => {
            if let Some(name_node) = child_by_field(node, "name") {
                let name = node_text(name_node, source);
                if name == "constructor" {
                    out.push(RawCapture::new("def.constructor", name_node, source));
                    out.push(RawCapture::named("scope.constructor", node, name.to_string()));
                } else {
                    out.push(RawCapture::new("def.method", name_node, source));
                    out.push(RawCapture::named("scope.method", node, name.to_string()));
                }
            }
            collect_params(node, source, out);
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "field_definition" | "public_field_definition" => {
            if let Some(prop) = child_by_field(node, "property").or_else(|| child_by_field(node, "name")) {
                out.push(RawCapture::new("def.property", prop, source));
            }
            if let Some(value) = child_by_field(node, "value") {
                dispatch(value, source, out);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let is_const = node_text(node, source).starts_with("const");
            let mut cursor = node.walk();
            let declarators: Vec<Node<'t>> = node
                .children(&mut cursor)
                .filter(|c| c.kind() == "variable_declarator")
                .collect();
            for declarator in declarators {
                if let Some(name_node) = child_by_field(declarator, "name") {
                    if name_node.kind() == "identifier" {
                        let value = child_by_field(declarator, "value");
                        let is_function_value = value.is_some_and(|v| {
                            matches!(v.kind(), "arrow_function" | "function_expression")
                        });
                        let capture_name = if is_function_value {
                            "def.function.expr"
                        } else if is_const {
                            "def.constant"
                        } else {
                            "def.variable"
                        };
                        out.push(RawCapture::new(capture_name, name_node, source));
                        if value.is_some() && !is_function_value {
                            out.push(RawCapture::new("ref.assignment", name_node, source));
                        }
                    }
                }
                if let Some(value) = child_by_field(declarator, "value") {
                    dispatch(value, source, out);
                }
            }
        }
        "import_statement" => collect_import(node, source, out),
        "export_statement" => collect_export(node, source, out),
        "call_expression" => {
            collect_call(node, source, out);
            walk(node, source, out);
        }
        "new_expression" => {
            if let Some(ctor) = child_by_field(node, "constructor") {
                if matches!(ctor.kind(), "identifier" | "member_expression") {
                    let target = if ctor.kind() == "member_expression" {
                        child_by_field(ctor, "property").unwrap_or(ctor)
                    } else {
                        ctor
                    };
                    out.push(RawCapture::new("ref.constructor", target, source));
                }
            }
            if let Some(args) = child_by_field(node, "arguments") {
                walk(args, source, out);
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
                        first_line(node_text(e, source)),
                    ));
                    dispatch(e, source, out);
                }
                None => out.push(RawCapture::named("ref.return", node, String::new())),
            }
        }
        "statement_block" => {
            if !node
                .parent()
                .is_some_and(|p| FUNCTION_KINDS.contains(&p.kind()))
            {
                out.push(RawCapture::named("scope.block", node, String::new()));
            }
            walk(node, source, out);
        }
        // ── TypeScript-only constructs ─────────────────────────────
        "interface_declaration" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.interface", name_node, source));
                out.push(RawCapture::named(
                    "scope.interface",
                    node,
                    node_text(name_node, source).to_string(),
                ));
            }
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "method_signature" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.method", name_node, source));
            }
            collect_params(node, source, out);
        }
        "property_signature" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.property", name_node, source));
            }
        }
        "type_alias_declaration" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.type_alias", name_node, source));
            }
        }
        "enum_declaration" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.enum", name_node, source));
                out.push(RawCapture::named(
                    "scope.enum",
                    node,
                    node_text(name_node, source).to_string(),
                ));
            }
        }
        "internal_module" | "module" => {
            if let Some(name_node) = child_by_field(node, "name") {
                out.push(RawCapture::new("def.namespace", name_node, source));
                out.push(RawCapture::named(
                    "scope.namespace",
                    node,
                    node_text(name_node, source).to_string(),
                ));
            }
            if let Some(body) = child_by_field(node, "body") {
                walk(body, source, out);
            }
        }
        "decorator" => {
            let target = find_child_by_kind(node, "identifier")
                .or_else(|| {
                    find_child_by_kind(node, "call_expression")
                        .and_then(|c| child_by_field(c, "function"))
                })
                .unwrap_or(node);
            out.push(RawCapture::new("decorator", target, source));
        }
        _ => walk(node, source, out),
    }
}

fn collect_params<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let Some(params) = child_by_field(node, "parameters")
        .or_else(|| child_by_field(node, "parameter"))
    else {
        return;
    };
    if params.kind() == "identifier" {
        out.push(RawCapture::new("def.param", params, source));
        return;
    }
    let mut cursor = params.walk();
    let children: Vec<Node<'t>> = params.children(&mut cursor).collect();
    for child in children {
        let name = match child.kind() {
            "identifier" => Some(child),
            "required_parameter" | "optional_parameter" => child_by_field(child, "pattern")
                .filter(|n| n.kind() == "identifier"),
            "rest_pattern" | "rest_parameter" => find_child_by_kind(child, "identifier"),
            "assignment_pattern" => {
                child_by_field(child, "left").filter(|n| n.kind() == "identifier")
            }
            _ => None,
        };
        if let Some(n) = name {
            out.push(RawCapture::new("def.param", n, source));
        }
    }
}

fn collect_import<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let Some(clause) = find_child_by_kind(node, "import_clause") else {
        return; // side-effect import
    };
    let mut cursor = clause.walk();
    let children: Vec<Node<'t>> = clause.children(&mut cursor).collect();
    for child in children {
        match child.kind() {
            "identifier" => out.push(RawCapture::new("import.default", child, source)),
            "named_imports" => {
                let mut inner = child.walk();
                let specs: Vec<Node<'t>> = child
                    .children(&mut inner)
                    .filter(|c| c.kind() == "import_specifier")
                    .collect();
                for spec in specs {
                    let local = child_by_field(spec, "alias")
                        .or_else(|| child_by_field(spec, "name"));
                    if let Some(local) = local {
                        out.push(RawCapture::new("import.named", local, source));
                    }
                }
            }
            "namespace_import" => {
                if let Some(ident) = find_child_by_kind(child, "identifier") {
                    out.push(RawCapture::new("import.namespace", ident, source));
                }
            }
            _ => {}
        }
    }
}

fn collect_export<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    if let Some(decl) = child_by_field(node, "declaration") {
        dispatch(decl, source, out);
    }
    if let Some(value) = child_by_field(node, "value") {
        if matches!(
            value.kind(),
            "function_declaration" | "class_declaration" | "arrow_function" | "function_expression"
        ) {
            dispatch(value, source, out);
        } else if value.kind() == "identifier" {
            out.push(RawCapture::new("export.default", value, source));
        }
    }
    if let Some(clause) = find_child_by_kind(node, "export_clause") {
        let mut cursor = clause.walk();
        let specs: Vec<Node<'t>> = clause
            .children(&mut cursor)
            .filter(|c| c.kind() == "export_specifier")
            .collect();
        for spec in specs {
            if let Some(name) = child_by_field(spec, "name") {
                out.push(RawCapture::new("export.named", name, source));
            }
        }
    }
}

fn collect_call<'t>(node: Node<'t>, source: &str, out: &mut Vec<RawCapture<'t>>) {
    let Some(func) = child_by_field(node, "function") else {
        return;
    };
    match func.kind() {
        "identifier" => out.push(RawCapture::new("ref.call", func, source)),
        "super" => out.push(RawCapture::new("ref.super", func, source)),
        "member_expression" => {
            if let Some(prop) = child_by_field(func, "property") {
                let object = child_by_field(func, "object");
                if object.is_some_and(|o| o.kind() == "super") {
                    out.push(RawCapture::new("ref.super", prop, source));
                } else {
                    out.push(RawCapture::new("ref.call", prop, source));
                }
            }
        }
        _ => {}
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}

// ── Extractors (shared by the JS and TS capture configs) ───────────

pub(super) fn function_def_modifiers(
    node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    let mut out = vec![("is_hoisted", ModifierValue::Flag(true))];
    push_export_modifiers(node, &mut out);
    out
}

pub(super) fn lexical_def_modifiers(
    node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    push_export_modifiers(node, &mut out);
    out
}

pub(super) fn var_def_modifiers(
    node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    if has_ancestor_of_kind(node, &["variable_declaration"]) {
        out.push(("is_hoisted", ModifierValue::Flag(true)));
    }
    push_export_modifiers(node, &mut out);
    out
}

pub(super) fn method_def_modifiers(
    node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    if let Some(method) = ancestor_of_kind(node, &["method_definition"]) {
        if find_child_by_kind(method, "static").is_some() {
            out.push(("is_static", ModifierValue::Flag(true)));
        }
    }
    out
}

fn push_export_modifiers(node: Node<'_>, out: &mut Vec<(&'static str, ModifierValue)>) {
    if let Some(export) = ancestor_of_kind(node, &["export_statement"]) {
        out.push(("is_exported", ModifierValue::Flag(true)));
        let mut cursor = export.walk();
        if export.children(&mut cursor).any(|c| c.kind() == "default") {
            out.push(("is_default", ModifierValue::Flag(true)));
        }
    }
}

pub(super) fn def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.enclosing_range = super::helpers::enclosing_construct_range(node, CONSTRUCT_KINDS);
    ctx.owner = super::helpers::enclosing_construct_name(
        node,
        &["class_declaration", "abstract_class_declaration", "interface_declaration"],
        source,
    );
    Some(ctx)
}

pub(super) fn class_def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = def_context(node, source)?;
    let class = ancestor_of_kind(node, CLASS_KINDS)?;
    if let Some(heritage) = find_child_by_kind(class, "class_heritage") {
        // `extends Base` — the heritage wraps an expression (JS) or
        // extends/implements clauses (TS).
        let mut cursor = heritage.walk();
        for child in heritage.children(&mut cursor) {
            match child.kind() {
                "identifier" => ctx.extends.push(node_text(child, source).to_string()),
                "extends_clause" | "implements_clause" => {
                    let mut inner = child.walk();
                    for c in child.children(&mut inner) {
                        if matches!(c.kind(), "identifier" | "type_identifier") {
                            ctx.extends.push(node_text(c, source).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }
    Some(ctx)
}

pub(super) fn enum_def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = def_context(node, source)?;
    let decl = ancestor_of_kind(node, &["enum_declaration"])?;
    if let Some(body) = child_by_field(decl, "body") {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match child.kind() {
                "property_identifier" => ctx.exported_names.push(node_text(child, source).to_string()),
                "enum_assignment" => {
                    if let Some(name) = child_by_field(child, "name") {
                        ctx.exported_names.push(node_text(name, source).to_string());
                    }
                }
                _ => {}
            }
        }
    }
    Some(ctx)
}

/// `const f = () => …` — the function's extent is the declarator's value.
pub(super) fn function_expr_context(node: Node<'_>, _source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    let declarator = node.parent().filter(|p| p.kind() == "variable_declarator")?;
    ctx.enclosing_range = child_by_field(declarator, "value").map(node_range);
    Some(ctx)
}

pub(super) fn param_def_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    if let Some(param) = ancestor_of_kind(node, &["required_parameter", "optional_parameter"]) {
        ctx.annotation_type = annotation_text(param, source);
    }
    Some(ctx)
}

pub(super) fn import_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let statement = ancestor_of_kind(node, &["import_statement", "export_statement"])?;
    let mut ctx = CaptureContext::default();
    ctx.import_source = child_by_field(statement, "source")
        .map(|s| strip_quotes(node_text(s, source)));
    Some(ctx)
}

pub(super) fn import_named_modifiers(
    node: Node<'_>,
    source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    if let Some(spec) = ancestor_of_kind(node, &["import_specifier"]) {
        if let Some(name) = child_by_field(spec, "name") {
            out.push((
                "imported_name",
                ModifierValue::Text(node_text(name, source).to_string()),
            ));
        }
    }
    out
}

pub(super) fn import_default_modifiers(
    _node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    vec![("is_default", ModifierValue::Flag(true))]
}

pub(super) fn import_namespace_modifiers(
    _node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    vec![("is_namespace", ModifierValue::Flag(true))]
}

pub(super) fn export_named_modifiers(
    node: Node<'_>,
    source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    let mut out = vec![("is_exported", ModifierValue::Flag(true))];
    if let Some(spec) = ancestor_of_kind(node, &["export_specifier"]) {
        if let Some(alias) = child_by_field(spec, "alias") {
            out.push((
                "export_name",
                ModifierValue::Text(node_text(alias, source).to_string()),
            ));
        }
    }
    if let Some(statement) = ancestor_of_kind(node, &["export_statement"]) {
        if child_by_field(statement, "source").is_some() {
            out.push(("is_reexport", ModifierValue::Flag(true)));
        }
    }
    out
}

pub(super) fn export_default_modifiers(
    _node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    vec![
        ("is_exported", ModifierValue::Flag(true)),
        ("is_default", ModifierValue::Flag(true)),
    ]
}

pub(super) fn call_modifiers(node: Node<'_>, _source: &str) -> Vec<(&'static str, ModifierValue)> {
    let mut out = Vec::new();
    if let Some(member) = node.parent().filter(|p| p.kind() == "member_expression") {
        if find_child_by_kind(member, "optional_chain").is_some() {
            out.push(("is_optional_chain", ModifierValue::Flag(true)));
        }
    }
    out
}

pub(super) fn call_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    if let Some(member) = node.parent().filter(|p| p.kind() == "member_expression") {
        if let Some(object) = child_by_field(member, "object") {
            ctx.receiver = Some(node_range(object));
            if object.kind() == "identifier" {
                ctx.receiver_text = Some(node_text(object, source).to_string());
            } else if object.kind() == "this" {
                ctx.receiver_text = Some("this".to_string());
            }
        }
        ctx.property_chain = member_chain(member, source);
        if let Some(call) = member.parent().filter(|p| p.kind() == "call_expression") {
            ctx.type_arguments = child_by_field(call, "type_arguments")
                .map(|t| node_text(t, source).to_string());
        }
    }
    Some(ctx)
}

pub(super) fn constructor_modifiers(
    _node: Node<'_>,
    _source: &str,
) -> Vec<(&'static str, ModifierValue)> {
    vec![("is_constructor", ModifierValue::Flag(true))]
}

pub(super) fn constructor_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.construct_target = Some(node_range(node));
    ctx.type_name = Some(node_text(node, source).to_string());
    let new_expr = ancestor_of_kind(node, &["new_expression"])?;
    ctx.assigned_to = assigned_identifier(new_expr, source);
    Some(ctx)
}

pub(super) fn assignment_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    ctx.target = Some(node_range(node));
    if let Some(declarator) = node.parent().filter(|p| p.kind() == "variable_declarator") {
        ctx.source = child_by_field(declarator, "value").map(node_range);
        ctx.annotation_type = annotation_text(declarator, source);
    } else if let Some(assign) = node
        .parent()
        .filter(|p| p.kind() == "assignment_expression")
    {
        ctx.source = child_by_field(assign, "right").map(node_range);
    }
    ctx.assigned_to = Some(node_text(node, source).to_string());
    Some(ctx)
}

pub(super) fn return_context(node: Node<'_>, source: &str) -> Option<CaptureContext> {
    let mut ctx = CaptureContext::default();
    let func = ancestor_of_kind(node, FUNCTION_KINDS)?;
    ctx.return_type = child_by_field(func, "return_type")
        .map(|t| strip_annotation(node_text(t, source)));
    Some(ctx)
}

fn annotation_text(node: Node<'_>, source: &str) -> Option<String> {
    child_by_field(node, "type").map(|t| strip_annotation(node_text(t, source)))
}

fn strip_annotation(text: &str) -> String {
    text.trim_start_matches(':').trim().to_string()
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

// ── Shared capture config entries ──────────────────────────────────

/// The capture config entries common to JavaScript and TypeScript.
pub(super) fn base_entries() -> Vec<(&'static str, CaptureMapping)> {
    use CaptureCategory as Cat;
    use CaptureEntity as Ent;

    vec![
        // Scopes
        (
            "scope.function",
            CaptureMapping::new(Cat::Scope, Ent::Function),
        ),
        (
            "scope.closure",
            CaptureMapping::new(Cat::Scope, Ent::Closure),
        ),
        ("scope.class", CaptureMapping::new(Cat::Scope, Ent::Class)),
        ("scope.method", CaptureMapping::new(Cat::Scope, Ent::Method)),
        (
            "scope.constructor",
            CaptureMapping::new(Cat::Scope, Ent::Constructor),
        ),
        ("scope.block", CaptureMapping::new(Cat::Scope, Ent::Block)),
        // Definitions
        (
            "def.function",
            CaptureMapping::new(Cat::Definition, Ent::Function)
                .with_modifiers(function_def_modifiers)
                .with_context(def_context),
        ),
        (
            "def.class",
            CaptureMapping::new(Cat::Definition, Ent::Class)
                .with_modifiers(lexical_def_modifiers)
                .with_context(class_def_context),
        ),
        (
            "def.method",
            CaptureMapping::new(Cat::Definition, Ent::Method)
                .with_modifiers(method_def_modifiers)
                .with_context(def_context),
        ),
        (
            "def.constructor",
            CaptureMapping::new(Cat::Definition, Ent::Constructor).with_context(def_context),
        ),
        (
            "def.property",
            CaptureMapping::new(Cat::Definition, Ent::Property).with_context(def_context),
        ),
        (
            "def.function.expr",
            CaptureMapping::new(Cat::Definition, Ent::Function)
                .with_modifiers(lexical_def_modifiers)
                .with_context(function_expr_context),
        ),
        (
            "def.variable",
            CaptureMapping::new(Cat::Definition, Ent::Variable)
                .with_modifiers(var_def_modifiers),
        ),
        (
            "def.constant",
            CaptureMapping::new(Cat::Definition, Ent::Constant)
                .with_modifiers(lexical_def_modifiers),
        ),
        (
            "def.param",
            CaptureMapping::new(Cat::Definition, Ent::Parameter).with_context(param_def_context),
        ),
        // Imports / exports
        (
            "import.named",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(import_named_modifiers)
                .with_context(import_context),
        ),
        (
            "import.default",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(import_default_modifiers)
                .with_context(import_context),
        ),
        (
            "import.namespace",
            CaptureMapping::new(Cat::Import, Ent::Import)
                .with_modifiers(import_namespace_modifiers)
                .with_context(import_context),
        ),
        (
            "export.named",
            CaptureMapping::new(Cat::Export, Ent::Export)
                .with_modifiers(export_named_modifiers)
                .with_context(import_context),
        ),
        (
            "export.default",
            CaptureMapping::new(Cat::Export, Ent::Export)
                .with_modifiers(export_default_modifiers),
        ),
        // References
        (
            "ref.call",
            CaptureMapping::new(Cat::Reference, Ent::Call)
                .with_modifiers(call_modifiers)
                .with_context(call_context),
        ),
        (
            "ref.constructor",
            CaptureMapping::new(Cat::Reference, Ent::Call)
                .with_modifiers(constructor_modifiers)
                .with_context(constructor_context),
        ),
        ("ref.super", CaptureMapping::new(Cat::Reference, Ent::Super)),
        (
            "ref.assignment",
            CaptureMapping::new(Cat::Assignment, Ent::Variable).with_context(assignment_context),
        ),
        (
            "ref.return",
            CaptureMapping::new(Cat::Return, Ent::Variable).with_context(return_context),
        ),
    ]
}
