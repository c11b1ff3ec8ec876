use std::sync::LazyLock;

use crate::capture::{
    CaptureCategory, CaptureConfig, CaptureEntity, CaptureMapping, RawCapture,
};
use crate::Language;

use super::{LanguageSupport, ecma};

static CONFIG: LazyLock<CaptureConfig> = LazyLock::new(|| {
    let mut entries = ecma::base_entries();
    entries.extend([
        (
            "scope.interface",
            CaptureMapping::new(CaptureCategory::Scope, CaptureEntity::Interface),
        ),
        (
            "scope.enum",
            CaptureMapping::new(CaptureCategory::Scope, CaptureEntity::Enum),
        ),
        (
            "scope.namespace",
            CaptureMapping::new(CaptureCategory::Scope, CaptureEntity::Namespace),
        ),
        (
            "def.interface",
            CaptureMapping::new(CaptureCategory::Definition, CaptureEntity::Interface)
                .with_modifiers(ecma::lexical_def_modifiers)
                .with_context(ecma::def_context),
        ),
        (
            "def.enum",
            CaptureMapping::new(CaptureCategory::Definition, CaptureEntity::Enum)
                .with_modifiers(ecma::lexical_def_modifiers)
                .with_context(ecma::enum_def_context),
        ),
        (
            "def.namespace",
            CaptureMapping::new(CaptureCategory::Definition, CaptureEntity::Namespace)
                .with_modifiers(ecma::lexical_def_modifiers)
                .with_context(ecma::def_context),
        ),
        (
            "def.type_alias",
            CaptureMapping::new(CaptureCategory::Definition, CaptureEntity::TypeAlias)
                .with_modifiers(ecma::lexical_def_modifiers),
        ),
        (
            "decorator",
            CaptureMapping::new(CaptureCategory::Decorator, CaptureEntity::Decorator),
        ),
    ]);
    CaptureConfig::new(entries)
});

#[derive(Debug)]
pub struct TypeScriptSupport;

impl LanguageSupport for TypeScriptSupport {
    fn id(&self) -> &'static str {
        "typescript"
    }

    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn capture_config(&self) -> &CaptureConfig {
        &CONFIG
    }

    fn collect_captures<'t>(
        &self,
        tree: &'t tree_sitter::Tree,
        source: &str,
    ) -> Vec<RawCapture<'t>> {
        ecma::collect_captures(tree, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::normalize_captures;
    use crate::languages::parse_source;
    use std::path::Path;

    fn normalized(source: &str) -> Vec<crate::capture::NormalizedCapture> {
        let lang = TypeScriptSupport;
        let tree = parse_source(&lang, source, Path::new("a.ts")).unwrap();
        let raw = lang.collect_captures(&tree, source);
        normalize_captures(lang.capture_config(), &raw, source, Path::new("a.ts"))
    }

    #[test]
    fn captures_interface_with_members() {
        let source = "interface Shape {\n  area(): number;\n  name: string;\n}\n";
        let caps = normalized(source);
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::Interface && c.symbol_name == "Shape")
        );
        let member = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Method && c.symbol_name == "area")
            .expect("interface method signature");
        assert_eq!(member.context.owner.as_deref(), Some("Shape"));
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::Property && c.symbol_name == "name")
        );
    }

    #[test]
    fn captures_enum_members() {
        let caps = normalized("enum Color { Red, Green, Blue }\n");
        let e = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Enum && c.symbol_name == "Color")
            .expect("enum def");
        assert_eq!(e.context.exported_names, vec!["Red", "Green", "Blue"]);
    }

    #[test]
    fn captures_type_alias_and_namespace() {
        let caps = normalized("type Id = string;\nnamespace Util {\n  export function f() {}\n}\n");
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::TypeAlias && c.symbol_name == "Id")
        );
        assert!(
            caps.iter()
                .any(|c| c.entity == CaptureEntity::Namespace && c.symbol_name == "Util")
        );
    }

    #[test]
    fn parameter_annotations_are_declared_types() {
        let caps = normalized("function f(count: number) {}\n");
        let param = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Parameter && c.symbol_name == "count")
            .expect("param");
        assert_eq!(param.context.annotation_type.as_deref(), Some("number"));
    }

    #[test]
    fn declared_variable_annotation() {
        let caps = normalized("const w: Widget = make();\n");
        let assign = caps
            .iter()
            .find(|c| c.category == CaptureCategory::Assignment)
            .expect("assignment");
        assert_eq!(assign.context.annotation_type.as_deref(), Some("Widget"));
    }

    #[test]
    fn class_decorator_captured() {
        let caps = normalized("@injectable\nclass Service {}\n");
        assert!(caps.iter().any(|c| {
            c.category == CaptureCategory::Decorator && c.symbol_name == "injectable"
        }));
    }

    #[test]
    fn extends_clause_recorded() {
        let caps = normalized("class Base {}\nclass Child extends Base {}\n");
        let child = caps
            .iter()
            .find(|c| c.entity == CaptureEntity::Class && c.symbol_name == "Child")
            .expect("child class");
        assert_eq!(child.context.extends, vec!["Base"]);
    }
}
