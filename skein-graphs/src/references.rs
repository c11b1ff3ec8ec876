// Reference construction from normalized captures.
//
// Each reference/assignment/return capture becomes a typed `SymbolReference`
// carrying receiver, property chain, and declared-type metadata. The kind
// determination order matters: assignment and return categories win outright,
// then call entities split on constructor/receiver modifiers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureCategory, CaptureEntity, NormalizedCapture};
use crate::scope::ProcessingContext;
use crate::{Location, Range};

/// Fine-grained classification of a reference site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    FunctionCall,
    MethodCall,
    ConstructorCall,
    SuperCall,
    PropertyAccess,
    TypeReference,
    VariableReference,
    Assignment,
    Return,
}

/// Broad reference type exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Read,
    Call,
    Construct,
    MemberAccess,
    Type,
    Assignment,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Function,
    Method,
    Constructor,
    Super,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Property,
    Method,
}

/// Member-access metadata for method calls and property reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAccess {
    pub object_type: Option<String>,
    pub access_type: AccessType,
    pub is_optional_chain: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCertainty {
    /// From an explicit annotation.
    Declared,
    /// Guessed from context.
    Inferred,
}

/// Type metadata attached to a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub type_name: String,
    pub certainty: TypeCertainty,
}

/// Source/target types flowing through an assignment or return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFlow {
    pub source_type: Option<String>,
    pub target_type: Option<String>,
}

/// A reference to a symbol, with everything downstream resolution needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReference {
    pub location: Location,
    pub kind: ReferenceKind,
    pub ref_type: ReferenceType,
    pub scope_id: String,
    pub name: String,
    pub call_type: Option<CallType>,
    pub member_access: Option<MemberAccess>,
    pub type_info: Option<TypeAnnotation>,
    pub type_flow: Option<TypeFlow>,
    /// Identifier span of a method-call receiver, when captured.
    pub receiver_location: Option<Range>,
    /// Receiver identifier text, when the receiver is a plain identifier.
    pub receiver_text: Option<String>,
    pub property_chain: Vec<String>,
    pub construct_target_location: Option<Range>,
    pub assignment_source: Option<Range>,
    pub assignment_target: Option<Range>,
    /// Identifier the result is assigned to (constructor discovery input).
    pub assigned_to: Option<String>,
}

impl SymbolReference {
    pub fn is_call(&self) -> bool {
        matches!(self.ref_type, ReferenceType::Call | ReferenceType::Construct)
    }
}

/// Folds reference, assignment, and return captures into [`SymbolReference`]s.
#[derive(Debug, Default)]
pub struct ReferenceBuilder {
    file_path: PathBuf,
    references: Vec<SymbolReference>,
}

impl ReferenceBuilder {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            references: Vec::new(),
        }
    }

    pub fn add_capture(&mut self, capture: &NormalizedCapture, ctx: &ProcessingContext<'_>) {
        let relevant = matches!(
            capture.category,
            CaptureCategory::Reference
                | CaptureCategory::Assignment
                | CaptureCategory::Return
                | CaptureCategory::Type
        );
        if !relevant {
            return;
        }

        let kind = reference_kind(capture);
        let ref_type = reference_type(kind);

        let call_type = match kind {
            ReferenceKind::FunctionCall => Some(CallType::Function),
            ReferenceKind::MethodCall => Some(CallType::Method),
            ReferenceKind::ConstructorCall => Some(CallType::Constructor),
            ReferenceKind::SuperCall => Some(CallType::Super),
            _ => None,
        };

        let member_access = match kind {
            ReferenceKind::MethodCall => Some(MemberAccess {
                object_type: capture.context.type_name.clone(),
                access_type: AccessType::Method,
                is_optional_chain: capture.modifier_flag("is_optional_chain"),
            }),
            ReferenceKind::PropertyAccess => Some(MemberAccess {
                object_type: capture.context.type_name.clone(),
                access_type: AccessType::Property,
                is_optional_chain: capture.modifier_flag("is_optional_chain"),
            }),
            _ => None,
        };

        let type_info = extract_type_info(capture, kind);

        let type_flow = if capture.category == CaptureCategory::Assignment {
            capture.context.annotation_type.as_ref().map(|t| TypeFlow {
                source_type: None,
                target_type: Some(t.clone()),
            })
        } else if capture.category == CaptureCategory::Return {
            capture.context.return_type.as_ref().map(|t| TypeFlow {
                source_type: Some(t.clone()),
                target_type: None,
            })
        } else {
            None
        };

        self.references.push(SymbolReference {
            location: Location::new(self.file_path.clone(), capture.location.range),
            kind,
            ref_type,
            scope_id: ctx.scope_id_at(capture.location.range.start).to_string(),
            name: capture.symbol_name.clone(),
            call_type,
            member_access,
            type_info,
            type_flow,
            receiver_location: capture.context.receiver,
            receiver_text: capture.context.receiver_text.clone(),
            property_chain: capture.context.property_chain.clone(),
            construct_target_location: capture.context.construct_target,
            assignment_source: capture.context.source,
            assignment_target: capture.context.target,
            assigned_to: capture.context.assigned_to.clone(),
        });
    }

    /// Produce the references in source order. Fresh sequence per call.
    pub fn build(&self) -> Vec<SymbolReference> {
        let mut out = self.references.clone();
        out.sort_by_key(|r| (r.location.range.start, r.location.range.end));
        out
    }
}

fn reference_kind(capture: &NormalizedCapture) -> ReferenceKind {
    match capture.category {
        CaptureCategory::Assignment => return ReferenceKind::Assignment,
        CaptureCategory::Return => return ReferenceKind::Return,
        _ => {}
    }

    match &capture.entity {
        CaptureEntity::Call => {
            if capture.modifier_flag("is_constructor") {
                ReferenceKind::ConstructorCall
            } else if capture.context.receiver.is_some() {
                ReferenceKind::MethodCall
            } else {
                ReferenceKind::FunctionCall
            }
        }
        CaptureEntity::Super => ReferenceKind::SuperCall,
        CaptureEntity::Method => ReferenceKind::MethodCall,
        CaptureEntity::Property | CaptureEntity::Field => ReferenceKind::PropertyAccess,
        CaptureEntity::Type
        | CaptureEntity::Class
        | CaptureEntity::Interface
        | CaptureEntity::Enum => ReferenceKind::TypeReference,
        _ => ReferenceKind::VariableReference,
    }
}

fn reference_type(kind: ReferenceKind) -> ReferenceType {
    match kind {
        ReferenceKind::FunctionCall | ReferenceKind::MethodCall | ReferenceKind::SuperCall => {
            ReferenceType::Call
        }
        ReferenceKind::ConstructorCall => ReferenceType::Construct,
        ReferenceKind::PropertyAccess => ReferenceType::MemberAccess,
        ReferenceKind::TypeReference => ReferenceType::Type,
        ReferenceKind::VariableReference => ReferenceType::Read,
        ReferenceKind::Assignment => ReferenceType::Assignment,
        ReferenceKind::Return => ReferenceType::Return,
    }
}

fn extract_type_info(capture: &NormalizedCapture, kind: ReferenceKind) -> Option<TypeAnnotation> {
    let (name, certainty) = if let Some(t) = &capture.context.annotation_type {
        (t.clone(), TypeCertainty::Declared)
    } else if let Some(t) = &capture.context.return_type {
        (t.clone(), TypeCertainty::Declared)
    } else if let Some(t) = &capture.context.type_name {
        (t.clone(), TypeCertainty::Inferred)
    } else {
        return None;
    };

    // Generic arguments on a method call are appended textually; advisory
    // display metadata, never used for resolution.
    let name = match (&capture.context.type_arguments, kind) {
        (Some(args), ReferenceKind::MethodCall) => format!("{name}{args}"),
        _ => name,
    };

    Some(TypeAnnotation {
        type_name: name,
        certainty,
    })
}
