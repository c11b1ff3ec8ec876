// Capture normalization (the first pipeline stage).
//
// Per-language collectors walk the syntax tree and emit raw captures with
// dotted names like `def.class` or `ref.call`. A table-driven config maps each
// capture name to a uniform (category, entity, modifiers, context) tuple. The
// normalizer never inspects parent context itself; anything position- or
// type-shaped comes out of the mapping's extractors.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::{Location, Range};

// ── Raw captures ───────────────────────────────────────────────────

/// A raw capture emitted by a language collector: a dotted capture name, the
/// captured node, and its source text.
#[derive(Debug, Clone)]
pub struct RawCapture<'tree> {
    pub name: &'static str,
    pub node: Node<'tree>,
    pub text: String,
}

impl<'tree> RawCapture<'tree> {
    /// Capture whose text is the node's own source text (identifier captures).
    pub fn new(name: &'static str, node: Node<'tree>, source: &str) -> Self {
        Self {
            name,
            node,
            text: source[node.byte_range()].to_string(),
        }
    }

    /// Capture with an explicit text, for construct-level captures whose node
    /// spans a whole body (scope captures carry the construct's name).
    pub fn named(name: &'static str, node: Node<'tree>, text: String) -> Self {
        Self { name, node, text }
    }
}

// ── Normalized shape ───────────────────────────────────────────────

/// Broad category of a normalized capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureCategory {
    Scope,
    Definition,
    Reference,
    Import,
    Export,
    Type,
    Assignment,
    Return,
    Decorator,
    Modifier,
}

/// Fine-grained entity of a normalized capture. Open-ended: collectors may
/// emit entities outside the named set via [`CaptureEntity::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEntity {
    Module,
    Namespace,
    Class,
    Interface,
    Enum,
    Function,
    Closure,
    Method,
    Constructor,
    Block,
    Property,
    Field,
    Variable,
    Constant,
    Parameter,
    TypeAlias,
    Decorator,
    Call,
    Super,
    This,
    Type,
    Import,
    Export,
    Global,
    Nonlocal,
    Other(String),
}

/// Value of a capture modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifierValue {
    Flag(bool),
    Text(String),
}

impl ModifierValue {
    pub fn as_flag(&self) -> bool {
        matches!(self, Self::Flag(true))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Flag(_) => None,
        }
    }
}

/// Positions and names of nodes related to a capture, produced by the
/// mapping's context extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureContext {
    /// Identifier span of a method-call receiver.
    pub receiver: Option<Range>,
    /// Receiver identifier text, when the receiver is a plain identifier.
    pub receiver_text: Option<String>,
    /// Assignment source (right-hand side) span.
    pub source: Option<Range>,
    /// Assignment target (left-hand side) span.
    pub target: Option<Range>,
    /// Span of the type being constructed in a constructor call.
    pub construct_target: Option<Range>,
    /// Property chain for member accesses (`a.b.c` → `["a", "b", "c"]`).
    pub property_chain: Vec<String>,
    /// Type name from an explicit annotation or construction.
    pub type_name: Option<String>,
    /// Declared annotation type (marks certainty as declared).
    pub annotation_type: Option<String>,
    /// Declared return type of the enclosing callable.
    pub return_type: Option<String>,
    /// Textual generic arguments (`<T, U>`), advisory only.
    pub type_arguments: Option<String>,
    /// Owner name for members found inside a class body or impl block.
    pub owner: Option<String>,
    /// Module specifier of an import/re-export.
    pub import_source: Option<String>,
    /// Names listed by an export clause or `__all__` literal.
    pub exported_names: Vec<String>,
    /// Full construct span for definitions (class/function body).
    pub enclosing_range: Option<Range>,
    /// Superclass / extended interface names.
    pub extends: Vec<String>,
    /// Identifier a constructor-call result is assigned to.
    pub assigned_to: Option<String>,
}

/// A capture after normalization: fully owned, no tree references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCapture {
    pub category: CaptureCategory,
    pub entity: CaptureEntity,
    pub symbol_name: String,
    pub location: Location,
    pub node_type: String,
    pub modifiers: HashMap<String, ModifierValue>,
    pub context: CaptureContext,
}

impl NormalizedCapture {
    pub fn modifier_flag(&self, name: &str) -> bool {
        self.modifiers.get(name).is_some_and(ModifierValue::as_flag)
    }

    pub fn modifier_text(&self, name: &str) -> Option<&str> {
        self.modifiers.get(name).and_then(ModifierValue::as_text)
    }
}

// ── Mapping tables ─────────────────────────────────────────────────

/// Extracts modifier key/value pairs from a captured node. Returning an empty
/// vec is the "extractor failed" case; the capture is still emitted.
pub type ModifierExtractor = fn(Node<'_>, &str) -> Vec<(&'static str, ModifierValue)>;

/// Extracts related-node context from a captured node. `None` is the
/// "extractor failed" case; the capture is still emitted with empty context.
pub type ContextExtractor = fn(Node<'_>, &str) -> Option<CaptureContext>;

/// One entry of a language capture config.
#[derive(Clone)]
pub struct CaptureMapping {
    pub category: CaptureCategory,
    pub entity: CaptureEntity,
    pub modifiers: Option<ModifierExtractor>,
    pub context: Option<ContextExtractor>,
}

impl std::fmt::Debug for CaptureMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureMapping")
            .field("category", &self.category)
            .field("entity", &self.entity)
            .field("modifiers", &self.modifiers.is_some())
            .field("context", &self.context.is_some())
            .finish()
    }
}

impl CaptureMapping {
    pub fn new(category: CaptureCategory, entity: CaptureEntity) -> Self {
        Self {
            category,
            entity,
            modifiers: None,
            context: None,
        }
    }

    pub fn with_modifiers(mut self, f: ModifierExtractor) -> Self {
        self.modifiers = Some(f);
        self
    }

    pub fn with_context(mut self, f: ContextExtractor) -> Self {
        self.context = Some(f);
        self
    }
}

/// Table mapping capture names to their normalized shape for one language.
#[derive(Debug, Default)]
pub struct CaptureConfig {
    entries: HashMap<&'static str, CaptureMapping>,
}

impl CaptureConfig {
    pub fn new(entries: Vec<(&'static str, CaptureMapping)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CaptureMapping> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Normalizer ─────────────────────────────────────────────────────

/// Normalize raw captures through a language's capture config.
///
/// Captures with no mapping are dropped. Extractor failures degrade to empty
/// modifier/context sets; the capture itself is still emitted. Runs in
/// O(captures).
pub fn normalize_captures(
    config: &CaptureConfig,
    captures: &[RawCapture<'_>],
    source: &str,
    file_path: &Path,
) -> Vec<NormalizedCapture> {
    let mut out = Vec::with_capacity(captures.len());

    for capture in captures {
        let Some(mapping) = config.get(capture.name) else {
            continue;
        };

        let modifiers: HashMap<String, ModifierValue> = mapping
            .modifiers
            .map(|f| f(capture.node, source))
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let context = mapping
            .context
            .and_then(|f| f(capture.node, source))
            .unwrap_or_default();

        let mut location = Location::new(file_path, capture.node.range().into());
        if let Some(enclosing) = context.enclosing_range {
            location = location.with_enclosing(enclosing);
        }

        out.push(NormalizedCapture {
            category: mapping.category,
            entity: mapping.entity.clone(),
            symbol_name: capture.text.clone(),
            location,
            node_type: capture.node.kind().to_string(),
            modifiers,
            context,
        });
    }

    out
}
