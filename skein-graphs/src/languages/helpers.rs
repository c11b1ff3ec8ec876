use tree_sitter::Node;

use crate::Range;

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.kind() == kind)
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Convert a tree-sitter node to a [`Range`].
pub fn node_range(node: Node<'_>) -> Range {
    node.range().into()
}

/// Walk ancestors until one of the given kinds is found.
pub fn ancestor_of_kind<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Whether any ancestor has one of the given kinds.
pub fn has_ancestor_of_kind(node: Node<'_>, kinds: &[&str]) -> bool {
    ancestor_of_kind(node, kinds).is_some()
}

/// Range of the nearest enclosing construct node, used as a definition's
/// enclosing range.
pub fn enclosing_construct_range(node: Node<'_>, kinds: &[&str]) -> Option<Range> {
    if kinds.contains(&node.kind()) {
        return Some(node_range(node));
    }
    ancestor_of_kind(node, kinds).map(node_range)
}

/// Name of the nearest enclosing construct, read through its `name` field.
pub fn enclosing_construct_name(node: Node<'_>, kinds: &[&str], source: &str) -> Option<String> {
    let construct = ancestor_of_kind(node, kinds)?;
    child_by_field(construct, "name").map(|n| node_text(n, source).to_string())
}

/// The identifier a surrounding assignment or declarator binds, walking up
/// from an expression node. Used for constructor-discovery (`v = new C()`).
pub fn assigned_identifier(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            // JS/TS: const v = <expr>
            "variable_declarator" => {
                return child_by_field(n, "name")
                    .filter(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string());
            }
            // JS/TS/Python: v = <expr>
            "assignment_expression" | "assignment" | "augmented_assignment" => {
                return child_by_field(n, "left")
                    .filter(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string());
            }
            // Rust: let v = <expr>;
            "let_declaration" => {
                return child_by_field(n, "pattern")
                    .filter(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string());
            }
            // Stop at statement boundaries; anything above is not a binding.
            "statement_block" | "block" | "module" | "program" | "source_file"
            | "expression_statement" => return None,
            _ => {}
        }
        current = n.parent();
    }
    None
}

/// Collect the dotted member chain of a member/attribute expression, e.g.
/// `a.b.c` → `["a", "b", "c"]`.
pub fn member_chain(node: Node<'_>, source: &str) -> Vec<String> {
    fn collect(node: Node<'_>, source: &str, out: &mut Vec<String>) {
        match node.kind() {
            "member_expression" | "attribute" | "field_expression" | "scoped_identifier" => {
                let object = child_by_field(node, "object")
                    .or_else(|| child_by_field(node, "value"))
                    .or_else(|| child_by_field(node, "path"));
                if let Some(obj) = object {
                    collect(obj, source, out);
                }
                let member = child_by_field(node, "property")
                    .or_else(|| child_by_field(node, "attribute"))
                    .or_else(|| child_by_field(node, "field"))
                    .or_else(|| child_by_field(node, "name"));
                if let Some(m) = member {
                    out.push(node_text(m, source).to_string());
                }
            }
            _ => out.push(node_text(node, source).to_string()),
        }
    }

    let mut out = Vec::new();
    collect(node, source, &mut out);
    out
}

/// Parse the string literals of a list literal (`["a", "b"]` / `("a",)`).
/// Non-literal elements make the whole extraction fail.
pub fn string_list_literal(node: Node<'_>, source: &str) -> Option<Vec<String>> {
    if !matches!(node.kind(), "list" | "tuple" | "array") {
        return None;
    }
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string" => {
                let text = node_text(child, source);
                let stripped = text
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                names.push(stripped);
            }
            "," | "[" | "]" | "(" | ")" => {}
            _ => return None,
        }
    }
    Some(names)
}
