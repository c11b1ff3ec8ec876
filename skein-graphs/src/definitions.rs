// Definition construction from normalized captures.
//
// Captures arrive in natural source order, which means a method can show up
// before its enclosing class. The builder keeps orphan maps keyed by location
// for methods, properties, constructors, and parameters; whenever a parent
// lands, the orphan maps are rescanned and anything strictly contained in the
// new parent's enclosing range is re-attached. Every array field on a built
// definition is guaranteed present (possibly empty).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureCategory, CaptureEntity, NormalizedCapture};
use crate::scope::ProcessingContext;
use crate::{Availability, DefinitionKind, Diagnostic, Range};

// ── Flat symbol shape ──────────────────────────────────────────────

/// The flat, scope-registered shape of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    pub name: String,
    pub kind: DefinitionKind,
    /// Identifier span.
    pub range: Range,
    /// Full construct span, when known.
    pub enclosing_range: Option<Range>,
    /// Deterministic id of the deepest scope containing the identifier.
    pub scope_id: String,
    pub availability: Availability,
    /// Module specifier for `kind = Import`.
    pub import_source: Option<String>,
    pub is_hoisted: bool,
    pub is_exported: bool,
    pub is_imported: bool,
}

impl SymbolDefinition {
    /// Span used for containment checks: the construct body when known,
    /// otherwise the identifier itself.
    pub fn extent(&self) -> Range {
        self.enclosing_range.unwrap_or(self.range)
    }
}

// ── Structured definitions ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub def: SymbolDefinition,
    pub type_annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub def: SymbolDefinition,
    pub type_annotation: Option<String>,
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub def: SymbolDefinition,
    /// Name of the owning class/interface/impl target, when known.
    pub owner: Option<String>,
    pub parameters: Vec<ParameterDefinition>,
    pub decorators: Vec<String>,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDefinition {
    pub def: SymbolDefinition,
    pub parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub def: SymbolDefinition,
    pub methods: Vec<MethodDefinition>,
    pub properties: Vec<PropertyDefinition>,
    pub constructors: Vec<ConstructorDefinition>,
    pub decorators: Vec<String>,
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub def: SymbolDefinition,
    pub parameters: Vec<ParameterDefinition>,
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDefinition {
    pub def: SymbolDefinition,
    /// Method signatures declared by the interface.
    pub members: Vec<MethodDefinition>,
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub def: SymbolDefinition,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDefinition {
    pub def: SymbolDefinition,
    /// Module specifier the binding comes from.
    pub source: Option<String>,
    /// Original exported name when aliased (`import { a as b }` → `a`).
    pub imported_name: Option<String>,
    pub is_namespace: bool,
    pub is_default: bool,
}

/// A structured definition produced by [`DefinitionBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Definition {
    Class(ClassDefinition),
    Interface(InterfaceDefinition),
    Enum(EnumDefinition),
    Function(FunctionDefinition),
    /// A method that never found a parent in this file (Rust impl methods
    /// for types defined elsewhere, for example). Carries its owner name.
    Method(MethodDefinition),
    Namespace(SymbolDefinition),
    Variable(SymbolDefinition),
    Import(ImportDefinition),
    TypeAlias(SymbolDefinition),
    Module(SymbolDefinition),
}

impl Definition {
    pub fn symbol(&self) -> &SymbolDefinition {
        match self {
            Self::Class(c) => &c.def,
            Self::Interface(i) => &i.def,
            Self::Enum(e) => &e.def,
            Self::Function(f) => &f.def,
            Self::Method(m) => &m.def,
            Self::Namespace(s) | Self::Variable(s) | Self::TypeAlias(s) | Self::Module(s) => s,
            Self::Import(i) => &i.def,
        }
    }

    pub fn name(&self) -> &str {
        &self.symbol().name
    }

    pub fn kind(&self) -> DefinitionKind {
        self.symbol().kind
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Folds definition and decorator captures into structured definitions.
///
/// Reusable: `build` returns a fresh sequence on each call and includes
/// previously built entities.
#[derive(Debug, Default)]
pub struct DefinitionBuilder {
    file_path: PathBuf,
    classes: Vec<ClassDefinition>,
    interfaces: Vec<InterfaceDefinition>,
    enums: Vec<EnumDefinition>,
    functions: Vec<FunctionDefinition>,
    namespaces: Vec<SymbolDefinition>,
    variables: Vec<SymbolDefinition>,
    imports: Vec<ImportDefinition>,
    type_aliases: Vec<SymbolDefinition>,
    modules: Vec<SymbolDefinition>,

    orphan_methods: HashMap<Range, MethodDefinition>,
    orphan_properties: HashMap<Range, PropertyDefinition>,
    orphan_constructors: HashMap<Range, ConstructorDefinition>,
    orphan_parameters: HashMap<Range, ParameterDefinition>,

    /// Decorator captures pending attachment, by identifier range.
    pending_decorators: Vec<(Range, String)>,

    diagnostics: Vec<Diagnostic>,
}

impl DefinitionBuilder {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Fold one normalized capture into the builder. Non-definition captures
    /// other than decorators are ignored.
    pub fn add_capture(&mut self, capture: &NormalizedCapture, ctx: &ProcessingContext<'_>) {
        match capture.category {
            CaptureCategory::Definition | CaptureCategory::Import => {}
            CaptureCategory::Decorator => {
                self.pending_decorators
                    .push((capture.location.range, capture.symbol_name.clone()));
                return;
            }
            _ => return,
        }

        let def = self.symbol_from_capture(capture, ctx);
        match &capture.entity {
            CaptureEntity::Class => self.add_class(ClassDefinition {
                def,
                methods: Vec::new(),
                properties: Vec::new(),
                constructors: Vec::new(),
                decorators: Vec::new(),
                extends: capture.context.extends.clone(),
            }),
            CaptureEntity::Interface => self.add_interface(InterfaceDefinition {
                def,
                members: Vec::new(),
                extends: capture.context.extends.clone(),
            }),
            CaptureEntity::Enum => self.add_enum(EnumDefinition {
                def,
                members: capture.context.exported_names.clone(),
            }),
            CaptureEntity::Function | CaptureEntity::Closure => {
                self.add_function(FunctionDefinition {
                    def,
                    parameters: Vec::new(),
                    decorators: Vec::new(),
                });
            }
            CaptureEntity::Method => {
                let is_static = capture.modifier_flag("is_static");
                self.add_method(MethodDefinition {
                    def,
                    owner: capture.context.owner.clone(),
                    parameters: Vec::new(),
                    decorators: Vec::new(),
                    is_static,
                });
            }
            CaptureEntity::Constructor => {
                self.add_constructor(ConstructorDefinition {
                    def,
                    parameters: Vec::new(),
                });
            }
            CaptureEntity::Property | CaptureEntity::Field => {
                self.add_property(PropertyDefinition {
                    def,
                    type_annotation: capture.context.annotation_type.clone(),
                    decorators: Vec::new(),
                });
            }
            CaptureEntity::Parameter => {
                self.add_parameter(ParameterDefinition {
                    def,
                    type_annotation: capture.context.annotation_type.clone(),
                });
            }
            CaptureEntity::Variable | CaptureEntity::Constant => {
                upsert_flat(&mut self.variables, def);
            }
            CaptureEntity::Import => {
                let import = ImportDefinition {
                    def,
                    source: capture.context.import_source.clone(),
                    imported_name: capture
                        .modifier_text("imported_name")
                        .map(ToString::to_string),
                    is_namespace: capture.modifier_flag("is_namespace"),
                    is_default: capture.modifier_flag("is_default"),
                };
                upsert_by(&mut self.imports, import, |i| (i.def.range, i.def.name.clone()));
            }
            CaptureEntity::TypeAlias => upsert_flat(&mut self.type_aliases, def),
            CaptureEntity::Namespace => upsert_flat(&mut self.namespaces, def),
            CaptureEntity::Module => upsert_flat(&mut self.modules, def),
            _ => {}
        }
    }

    fn symbol_from_capture(
        &self,
        capture: &NormalizedCapture,
        ctx: &ProcessingContext<'_>,
    ) -> SymbolDefinition {
        let kind = definition_kind(capture);
        let is_exported = capture.modifier_flag("is_exported");
        let is_default = capture.modifier_flag("is_default");
        let is_reexport = capture.modifier_flag("is_reexport");
        let is_public = capture.modifier_flag("is_public");

        let availability = if is_public {
            Availability::Public
        } else if is_exported {
            Availability::FileExport {
                name: capture
                    .modifier_text("export_name")
                    .unwrap_or(&capture.symbol_name)
                    .to_string(),
                is_default,
                is_reexport,
            }
        } else {
            Availability::FilePrivate
        };

        SymbolDefinition {
            name: capture.symbol_name.clone(),
            kind,
            range: capture.location.range,
            enclosing_range: capture.location.enclosing_range,
            scope_id: ctx.scope_id_at(capture.location.range.start).to_string(),
            availability,
            import_source: capture.context.import_source.clone(),
            is_hoisted: capture.modifier_flag("is_hoisted"),
            is_exported: is_exported || is_public,
            is_imported: capture.category == CaptureCategory::Import
                || matches!(capture.entity, CaptureEntity::Import),
        }
    }

    // ── Parent insertion with orphan rescans ───────────────────────

    fn add_class(&mut self, class: ClassDefinition) {
        if let Some(existing) = self
            .classes
            .iter_mut()
            .find(|c| c.def.range == class.def.range && c.def.name == class.def.name)
        {
            merge_symbol(&mut existing.def, class.def);
            if !class.extends.is_empty() {
                existing.extends = class.extends;
            }
            return;
        }
        self.classes.push(class);
        let idx = self.classes.len() - 1;
        self.reattach_orphans_to_class(idx);
    }

    fn add_interface(&mut self, interface: InterfaceDefinition) {
        if let Some(existing) = self
            .interfaces
            .iter_mut()
            .find(|i| i.def.range == interface.def.range && i.def.name == interface.def.name)
        {
            merge_symbol(&mut existing.def, interface.def);
            return;
        }
        self.interfaces.push(interface);
        let idx = self.interfaces.len() - 1;
        self.reattach_orphans_to_interface(idx);
    }

    fn add_enum(&mut self, e: EnumDefinition) {
        if let Some(existing) = self
            .enums
            .iter_mut()
            .find(|x| x.def.range == e.def.range && x.def.name == e.def.name)
        {
            merge_symbol(&mut existing.def, e.def);
            if !e.members.is_empty() {
                existing.members = e.members;
            }
            return;
        }
        self.enums.push(e);
    }

    fn add_function(&mut self, function: FunctionDefinition) {
        if let Some(existing) = self
            .functions
            .iter_mut()
            .find(|f| f.def.range == function.def.range && f.def.name == function.def.name)
        {
            merge_symbol(&mut existing.def, function.def);
            return;
        }
        self.functions.push(function);
        let idx = self.functions.len() - 1;

        let extent = self.functions[idx].def.extent();
        let adopted = drain_contained(&mut self.orphan_parameters, extent);
        self.functions[idx].parameters.extend(adopted);
    }

    fn add_method(&mut self, method: MethodDefinition) {
        // Update in place if this method was already seen, attached or not.
        for class in &mut self.classes {
            if let Some(existing) = class
                .methods
                .iter_mut()
                .find(|m| m.def.range == method.def.range && m.def.name == method.def.name)
            {
                merge_symbol(&mut existing.def, method.def);
                return;
            }
        }
        for interface in &mut self.interfaces {
            if let Some(existing) = interface
                .members
                .iter_mut()
                .find(|m| m.def.range == method.def.range && m.def.name == method.def.name)
            {
                merge_symbol(&mut existing.def, method.def);
                return;
            }
        }
        if let Some(existing) = self.orphan_methods.get_mut(&method.def.range) {
            if existing.def.name == method.def.name {
                merge_symbol(&mut existing.def, method.def);
                return;
            }
        }

        let extent = method.def.extent();
        let mut method = method;
        method
            .parameters
            .extend(drain_contained(&mut self.orphan_parameters, extent));

        // Attach to a class by containment, then by owner name.
        let class_target = self.class_containing(method.def.range).or_else(|| {
            method
                .owner
                .as_deref()
                .and_then(|owner| self.classes.iter().position(|c| c.def.name == owner))
        });
        if let Some(idx) = class_target {
            if method.owner.is_none() {
                method.owner = Some(self.classes[idx].def.name.clone());
            }
            self.classes[idx].methods.push(method);
            return;
        }

        // Interface method signatures attach the same way.
        let interface_target = self
            .interfaces
            .iter()
            .position(|i| i.def.extent().strictly_contains(&method.def.range))
            .or_else(|| {
                method
                    .owner
                    .as_deref()
                    .and_then(|owner| self.interfaces.iter().position(|i| i.def.name == owner))
            });
        if let Some(idx) = interface_target {
            if method.owner.is_none() {
                method.owner = Some(self.interfaces[idx].def.name.clone());
            }
            self.interfaces[idx].members.push(method);
            return;
        }

        self.orphan_methods.insert(method.def.range, method);
    }

    fn add_constructor(&mut self, ctor: ConstructorDefinition) {
        match self.class_containing(ctor.def.range) {
            Some(idx) => {
                if let Some(existing) = self.classes[idx]
                    .constructors
                    .iter_mut()
                    .find(|c| c.def.range == ctor.def.range)
                {
                    merge_symbol(&mut existing.def, ctor.def);
                    return;
                }
                let extent = ctor.def.extent();
                let mut ctor = ctor;
                ctor.parameters
                    .extend(drain_contained(&mut self.orphan_parameters, extent));
                self.classes[idx].constructors.push(ctor);
            }
            None => {
                let extent = ctor.def.extent();
                let mut ctor = ctor;
                ctor.parameters
                    .extend(drain_contained(&mut self.orphan_parameters, extent));
                self.orphan_constructors.insert(ctor.def.range, ctor);
            }
        }
    }

    fn add_property(&mut self, property: PropertyDefinition) {
        match self.class_containing(property.def.range) {
            Some(idx) => {
                if let Some(existing) = self.classes[idx]
                    .properties
                    .iter_mut()
                    .find(|p| p.def.range == property.def.range && p.def.name == property.def.name)
                {
                    merge_symbol(&mut existing.def, property.def);
                    return;
                }
                self.classes[idx].properties.push(property);
            }
            None => {
                self.orphan_properties.insert(property.def.range, property);
            }
        }
    }

    fn add_parameter(&mut self, param: ParameterDefinition) {
        let pos = param.def.range;

        // Methods first, then constructors, then interface method signatures,
        // then free functions.
        for class in &mut self.classes {
            for method in &mut class.methods {
                if method.def.extent().strictly_contains(&pos) {
                    upsert_param(&mut method.parameters, param);
                    return;
                }
            }
            for ctor in &mut class.constructors {
                if ctor.def.extent().strictly_contains(&pos) {
                    upsert_param(&mut ctor.parameters, param);
                    return;
                }
            }
        }
        for method in self.orphan_methods.values_mut() {
            if method.def.extent().strictly_contains(&pos) {
                upsert_param(&mut method.parameters, param);
                return;
            }
        }
        for interface in &mut self.interfaces {
            for member in &mut interface.members {
                if member.def.extent().strictly_contains(&pos) {
                    upsert_param(&mut member.parameters, param);
                    return;
                }
            }
        }
        for function in &mut self.functions {
            if function.def.extent().strictly_contains(&pos) {
                upsert_param(&mut function.parameters, param);
                return;
            }
        }

        self.orphan_parameters.insert(pos, param);
    }

    /// Index of the class whose enclosing range strictly contains `range`,
    /// preferring the smallest area and diagnosing exact-area ties.
    fn class_containing(&mut self, range: Range) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        let mut tie = false;
        for (idx, class) in self.classes.iter().enumerate() {
            let extent = class.def.extent();
            if extent.strictly_contains(&range) {
                let area = extent.area();
                match best {
                    Some((_, best_area)) if area == best_area => tie = true,
                    Some((_, best_area)) if area < best_area => {
                        best = Some((idx, area));
                        tie = false;
                    }
                    None => best = Some((idx, area)),
                    _ => {}
                }
            }
        }
        if tie {
            if let Some((idx, _)) = best {
                let name = self.classes[idx].def.name.clone();
                tracing::warn!(file = %self.file_path.display(), %name, "ambiguous orphan parent");
                self.diagnostics.push(Diagnostic::OrphanAttachmentAmbiguous {
                    file: self.file_path.clone(),
                    name,
                    row: range.start.row,
                });
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn reattach_orphans_to_class(&mut self, idx: usize) {
        let extent = self.classes[idx].def.extent();
        let class_name = self.classes[idx].def.name.clone();

        let methods = drain_matching(&mut self.orphan_methods, |m| {
            extent.strictly_contains(&m.def.range) || m.owner.as_deref() == Some(class_name.as_str())
        });
        for mut method in methods {
            if method.owner.is_none() {
                method.owner = Some(class_name.clone());
            }
            let m_extent = method.def.extent();
            method
                .parameters
                .extend(drain_contained(&mut self.orphan_parameters, m_extent));
            self.classes[idx].methods.push(method);
        }

        let props = drain_matching(&mut self.orphan_properties, |p| {
            extent.strictly_contains(&p.def.range)
        });
        self.classes[idx].properties.extend(props);

        let ctors = drain_matching(&mut self.orphan_constructors, |c| {
            extent.strictly_contains(&c.def.range)
        });
        for mut ctor in ctors {
            let c_extent = ctor.def.extent();
            ctor.parameters
                .extend(drain_contained(&mut self.orphan_parameters, c_extent));
            self.classes[idx].constructors.push(ctor);
        }
    }

    fn reattach_orphans_to_interface(&mut self, idx: usize) {
        let extent = self.interfaces[idx].def.extent();
        let members = drain_matching(&mut self.orphan_methods, |m| {
            extent.strictly_contains(&m.def.range)
        });
        for mut member in members {
            if member.owner.is_none() {
                member.owner = Some(self.interfaces[idx].def.name.clone());
            }
            let m_extent = member.def.extent();
            member
                .parameters
                .extend(drain_contained(&mut self.orphan_parameters, m_extent));
            self.interfaces[idx].members.push(member);
        }
    }

    // ── Build ──────────────────────────────────────────────────────

    /// Produce the structured definitions. Fresh sequence per call; the
    /// builder stays usable and later builds include everything added so far.
    pub fn build(&self) -> Vec<Definition> {
        let mut classes = self.classes.clone();
        let mut interfaces = self.interfaces.clone();
        let mut functions = self.functions.clone();
        let loose_methods: Vec<MethodDefinition> =
            self.orphan_methods.values().cloned().collect();

        self.apply_decorators(&mut classes, &mut interfaces, &mut functions);

        let mut out: Vec<Definition> = Vec::new();
        out.extend(classes.into_iter().map(Definition::Class));
        out.extend(interfaces.into_iter().map(Definition::Interface));
        out.extend(self.enums.iter().cloned().map(Definition::Enum));
        out.extend(functions.into_iter().map(Definition::Function));
        out.extend(loose_methods.into_iter().map(Definition::Method));
        out.extend(self.namespaces.iter().cloned().map(Definition::Namespace));
        out.extend(self.variables.iter().cloned().map(Definition::Variable));
        out.extend(self.imports.iter().cloned().map(Definition::Import));
        out.extend(self.type_aliases.iter().cloned().map(Definition::TypeAlias));
        out.extend(self.modules.iter().cloned().map(Definition::Module));

        // Deterministic: source order, then name.
        out.sort_by(|a, b| {
            let ka = (a.symbol().range.start, a.name().to_string());
            let kb = (b.symbol().range.start, b.name().to_string());
            ka.cmp(&kb)
        });
        out
    }

    /// Attach each pending decorator to the nearest definition that starts
    /// after it: classes get decorator names, methods and properties get them
    /// on the member itself.
    fn apply_decorators(
        &self,
        classes: &mut [ClassDefinition],
        interfaces: &mut [InterfaceDefinition],
        functions: &mut [FunctionDefinition],
    ) {
        #[derive(Clone, Copy)]
        enum Target {
            Class(usize),
            Method(usize, usize),
            Property(usize, usize),
            InterfaceMember(usize, usize),
            Function(usize),
        }

        let mut candidates: Vec<(Target, Range)> = Vec::new();
        for (ci, class) in classes.iter().enumerate() {
            candidates.push((Target::Class(ci), class.def.range));
            for (mi, method) in class.methods.iter().enumerate() {
                candidates.push((Target::Method(ci, mi), method.def.range));
            }
            for (pi, property) in class.properties.iter().enumerate() {
                candidates.push((Target::Property(ci, pi), property.def.range));
            }
        }
        for (ii, interface) in interfaces.iter().enumerate() {
            for (mi, member) in interface.members.iter().enumerate() {
                candidates.push((Target::InterfaceMember(ii, mi), member.def.range));
            }
        }
        for (fi, function) in functions.iter().enumerate() {
            candidates.push((Target::Function(fi), function.def.range));
        }

        for (range, name) in &self.pending_decorators {
            let best = candidates
                .iter()
                .filter(|(_, r)| r.start > range.start)
                .min_by_key(|(_, r)| r.start);
            let Some(&(target, _)) = best else {
                continue;
            };
            let decorators = match target {
                Target::Class(ci) => &mut classes[ci].decorators,
                Target::Method(ci, mi) => &mut classes[ci].methods[mi].decorators,
                Target::Property(ci, pi) => &mut classes[ci].properties[pi].decorators,
                Target::InterfaceMember(ii, mi) => &mut interfaces[ii].members[mi].decorators,
                Target::Function(fi) => &mut functions[fi].decorators,
            };
            if !decorators.contains(name) {
                decorators.push(name.clone());
            }
        }
    }
}

fn definition_kind(capture: &NormalizedCapture) -> DefinitionKind {
    if capture.category == CaptureCategory::Import {
        return DefinitionKind::Import;
    }
    match &capture.entity {
        CaptureEntity::Class => DefinitionKind::Class,
        CaptureEntity::Interface => DefinitionKind::Interface,
        CaptureEntity::Enum => DefinitionKind::Enum,
        CaptureEntity::Function | CaptureEntity::Closure => DefinitionKind::Function,
        CaptureEntity::Method => DefinitionKind::Method,
        CaptureEntity::Constructor => DefinitionKind::Constructor,
        CaptureEntity::Property => DefinitionKind::Property,
        CaptureEntity::Field => DefinitionKind::Field,
        CaptureEntity::Constant => DefinitionKind::Constant,
        CaptureEntity::Parameter => DefinitionKind::Parameter,
        CaptureEntity::Import => DefinitionKind::Import,
        CaptureEntity::TypeAlias => DefinitionKind::TypeAlias,
        CaptureEntity::Namespace => DefinitionKind::Namespace,
        CaptureEntity::Module => DefinitionKind::Module,
        CaptureEntity::Decorator => DefinitionKind::Decorator,
        _ => DefinitionKind::Variable,
    }
}

/// Later captures for the same symbol refine earlier ones: flags are OR-ed
/// and a known enclosing range or import source is kept.
fn merge_symbol(existing: &mut SymbolDefinition, update: SymbolDefinition) {
    if update.enclosing_range.is_some() {
        existing.enclosing_range = update.enclosing_range;
    }
    if update.import_source.is_some() {
        existing.import_source = update.import_source;
    }
    if !matches!(update.availability, Availability::FilePrivate) {
        existing.availability = update.availability;
    }
    existing.is_hoisted |= update.is_hoisted;
    existing.is_exported |= update.is_exported;
    existing.is_imported |= update.is_imported;
}

fn upsert_flat(list: &mut Vec<SymbolDefinition>, def: SymbolDefinition) {
    if let Some(existing) = list
        .iter_mut()
        .find(|d| d.range == def.range && d.name == def.name && d.kind == def.kind)
    {
        merge_symbol(existing, def);
    } else {
        list.push(def);
    }
}

fn upsert_by<T, K: PartialEq>(list: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) {
    let k = key(&item);
    if let Some(idx) = list.iter().position(|i| key(i) == k) {
        list[idx] = item;
    } else {
        list.push(item);
    }
}

fn upsert_param(params: &mut Vec<ParameterDefinition>, param: ParameterDefinition) {
    if let Some(existing) = params
        .iter_mut()
        .find(|p| p.def.range == param.def.range && p.def.name == param.def.name)
    {
        merge_symbol(&mut existing.def, param.def);
    } else {
        params.push(param);
    }
}

fn drain_contained(
    orphans: &mut HashMap<Range, ParameterDefinition>,
    extent: Range,
) -> Vec<ParameterDefinition> {
    drain_matching(orphans, |p| extent.strictly_contains(&p.def.range))
}

fn drain_matching<T>(orphans: &mut HashMap<Range, T>, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
    let mut keys: Vec<Range> = orphans
        .iter()
        .filter(|(_, v)| pred(v))
        .map(|(k, _)| *k)
        .collect();
    // Source order keeps reattachment deterministic.
    keys.sort_by_key(|k| (k.start, k.end));
    keys.into_iter().filter_map(|k| orphans.remove(&k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureContext;
    use crate::scope::ScopeTree;
    use crate::{Location, Position};

    fn range(sr: usize, sc: usize, er: usize, ec: usize) -> Range {
        Range::new(Position::new(sr, sc), Position::new(er, ec))
    }

    fn capture(
        category: CaptureCategory,
        entity: CaptureEntity,
        name: &str,
        ident: Range,
        enclosing: Option<Range>,
    ) -> NormalizedCapture {
        let mut location = Location::new("test.ts", ident);
        if let Some(e) = enclosing {
            location = location.with_enclosing(e);
        }
        NormalizedCapture {
            category,
            entity,
            symbol_name: name.to_string(),
            location,
            node_type: "identifier".to_string(),
            modifiers: HashMap::new(),
            context: CaptureContext::default(),
        }
    }

    fn build_with(captures: Vec<NormalizedCapture>) -> (Vec<Definition>, Vec<Diagnostic>) {
        let tree = ScopeTree::new("test.ts");
        let ctx = ProcessingContext::new(&tree);
        let mut builder = DefinitionBuilder::new("test.ts");
        for c in &captures {
            builder.add_capture(c, &ctx);
        }
        let diags = builder.diagnostics().to_vec();
        (builder.build(), diags)
    }

    #[test]
    fn method_before_class_is_reattached() {
        let method = capture(
            CaptureCategory::Definition,
            CaptureEntity::Method,
            "greet",
            range(2, 4, 2, 9),
            Some(range(2, 4, 4, 5)),
        );
        let class = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "C",
            range(1, 6, 1, 7),
            Some(range(1, 0, 6, 1)),
        );

        let (defs, _) = build_with(vec![method, class]);
        let Definition::Class(c) = &defs[0] else {
            panic!("expected class first, got {defs:?}");
        };
        assert_eq!(c.def.name, "C");
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].def.name, "greet");
        assert_eq!(c.methods[0].owner.as_deref(), Some("C"));
    }

    #[test]
    fn parameter_reattaches_through_method() {
        let param = capture(
            CaptureCategory::Definition,
            CaptureEntity::Parameter,
            "name",
            range(2, 10, 2, 14),
            None,
        );
        let method = capture(
            CaptureCategory::Definition,
            CaptureEntity::Method,
            "greet",
            range(2, 4, 2, 9),
            Some(range(2, 4, 4, 5)),
        );
        let class = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "C",
            range(1, 6, 1, 7),
            Some(range(1, 0, 6, 1)),
        );

        let (defs, _) = build_with(vec![param, method, class]);
        let Definition::Class(c) = &defs[0] else {
            panic!("expected class, got {defs:?}");
        };
        assert_eq!(c.methods[0].parameters.len(), 1);
        assert_eq!(c.methods[0].parameters[0].def.name, "name");
    }

    #[test]
    fn arrays_always_present() {
        let class = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "Empty",
            range(0, 6, 0, 11),
            Some(range(0, 0, 1, 1)),
        );
        let (defs, _) = build_with(vec![class]);
        let Definition::Class(c) = &defs[0] else {
            panic!("expected class");
        };
        assert!(c.methods.is_empty());
        assert!(c.properties.is_empty());
        assert!(c.constructors.is_empty());
        assert!(c.decorators.is_empty());
        assert!(c.extends.is_empty());
    }

    #[test]
    fn duplicate_capture_updates_in_place() {
        let mut first = capture(
            CaptureCategory::Definition,
            CaptureEntity::Function,
            "f",
            range(0, 9, 0, 10),
            None,
        );
        first.modifiers.clear();
        let mut second = first.clone();
        second
            .modifiers
            .insert("is_exported".into(), crate::capture::ModifierValue::Flag(true));
        second.location.enclosing_range = Some(range(0, 0, 3, 1));

        let (defs, _) = build_with(vec![first, second]);
        assert_eq!(defs.len(), 1);
        let Definition::Function(f) = &defs[0] else {
            panic!("expected function");
        };
        assert!(f.def.is_exported);
        assert_eq!(f.def.enclosing_range, Some(range(0, 0, 3, 1)));
    }

    #[test]
    fn build_is_idempotent_and_reusable() {
        let class = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "C",
            range(1, 6, 1, 7),
            Some(range(1, 0, 6, 1)),
        );
        let tree = ScopeTree::new("test.ts");
        let ctx = ProcessingContext::new(&tree);
        let mut builder = DefinitionBuilder::new("test.ts");
        builder.add_capture(&class, &ctx);

        let first = builder.build();
        let second = builder.build();
        assert_eq!(first, second);

        let func = capture(
            CaptureCategory::Definition,
            CaptureEntity::Function,
            "f",
            range(8, 9, 8, 10),
            Some(range(8, 0, 9, 1)),
        );
        builder.add_capture(&func, &ctx);
        let third = builder.build();
        assert_eq!(third.len(), 2, "later builds include earlier entities");
    }

    #[test]
    fn orphan_method_with_no_parent_survives_as_loose_method() {
        let method = capture(
            CaptureCategory::Definition,
            CaptureEntity::Method,
            "len",
            range(5, 11, 5, 14),
            Some(range(5, 4, 7, 5)),
        );
        let (defs, _) = build_with(vec![method]);
        assert!(matches!(&defs[0], Definition::Method(m) if m.def.name == "len"));
    }

    #[test]
    fn rust_style_owner_attachment_without_containment() {
        // struct Cfg at rows 0..0; impl block methods at rows 2..5 are outside
        // the struct's own range but carry owner = "Cfg".
        let class = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "Cfg",
            range(0, 11, 0, 14),
            Some(range(0, 0, 0, 15)),
        );
        let mut method = capture(
            CaptureCategory::Definition,
            CaptureEntity::Method,
            "new",
            range(3, 11, 3, 14),
            Some(range(3, 4, 5, 5)),
        );
        method.context.owner = Some("Cfg".to_string());

        let (defs, _) = build_with(vec![class, method]);
        let Definition::Class(c) = &defs[0] else {
            panic!("expected class, got {defs:?}");
        };
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].def.name, "new");
    }

    #[test]
    fn smallest_parent_wins_for_nested_classes() {
        let outer = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "Outer",
            range(0, 6, 0, 11),
            Some(range(0, 0, 20, 1)),
        );
        let inner = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "Inner",
            range(2, 8, 2, 13),
            Some(range(2, 2, 10, 3)),
        );
        let method = capture(
            CaptureCategory::Definition,
            CaptureEntity::Method,
            "m",
            range(4, 6, 4, 7),
            Some(range(4, 4, 6, 5)),
        );

        let (defs, diags) = build_with(vec![outer, inner, method]);
        assert!(diags.is_empty());
        let inner_class = defs
            .iter()
            .find_map(|d| match d {
                Definition::Class(c) if c.def.name == "Inner" => Some(c),
                _ => None,
            })
            .expect("inner class");
        assert_eq!(inner_class.methods.len(), 1);
    }

    #[test]
    fn decorator_attaches_to_next_definition() {
        let decorator = capture(
            CaptureCategory::Decorator,
            CaptureEntity::Decorator,
            "injectable",
            range(0, 1, 0, 11),
            None,
        );
        let class = capture(
            CaptureCategory::Definition,
            CaptureEntity::Class,
            "Service",
            range(1, 6, 1, 13),
            Some(range(1, 0, 5, 1)),
        );

        let (defs, _) = build_with(vec![decorator, class]);
        let Definition::Class(c) = &defs[0] else {
            panic!("expected class");
        };
        assert_eq!(c.decorators, vec!["injectable".to_string()]);
    }
}
