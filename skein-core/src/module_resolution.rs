// Textual module-specifier resolution.
//
// Maps an import specifier to a project file without touching the filesystem:
// candidates are generated from the specifier and matched against the known
// file set. Package/external specifiers intentionally resolve to nothing.

use std::path::{Component, Path, PathBuf};

use skein_graphs::Language;

const ECMA_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Resolve a specifier from `importing` against the project's `files`.
pub fn resolve_specifier(
    importing: &Path,
    specifier: &str,
    language: Language,
    files: &[PathBuf],
) -> Option<PathBuf> {
    let candidates = match language {
        Language::JavaScript | Language::TypeScript => ecma_candidates(importing, specifier),
        Language::Python => python_candidates(importing, specifier),
        Language::Rust => rust_candidates(importing, specifier),
    };
    candidates.into_iter().find(|c| files.contains(c))
}

fn ecma_candidates(importing: &Path, specifier: &str) -> Vec<PathBuf> {
    if !specifier.starts_with('.') {
        return Vec::new(); // package import
    }
    let base = importing.parent().unwrap_or_else(|| Path::new(""));
    let joined = normalize(&base.join(specifier));

    let mut out = vec![joined.clone()];
    for ext in ECMA_EXTENSIONS {
        out.push(joined.with_extension(ext));
    }
    for ext in ECMA_EXTENSIONS {
        out.push(joined.join(format!("index.{ext}")));
    }
    out
}

fn python_candidates(importing: &Path, specifier: &str) -> Vec<PathBuf> {
    let rel: PathBuf = specifier.split('.').collect();
    let base = importing.parent().unwrap_or_else(|| Path::new(""));

    let mut out = Vec::new();
    for root in [base, Path::new("")] {
        let joined = normalize(&root.join(&rel));
        out.push(joined.with_extension("py"));
        out.push(joined.join("__init__.py"));
    }
    out.dedup();
    out
}

fn rust_candidates(importing: &Path, specifier: &str) -> Vec<PathBuf> {
    // `crate::types::{Node, Kind}` → segments after the prefix, minus the
    // brace group / leaf item.
    let path_part = specifier.split('{').next().unwrap_or(specifier).trim();
    let mut segments: Vec<&str> = path_part
        .split("::")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let importing_dir = importing.parent().map(Path::to_path_buf).unwrap_or_default();
    let bases: Vec<PathBuf> = match segments.first().copied() {
        Some("crate") => {
            segments.remove(0);
            // Crate roots: project root, src/, or the importing file's own
            // directory (flat layouts).
            vec![PathBuf::new(), PathBuf::from("src"), importing_dir]
        }
        Some("self") => {
            segments.remove(0);
            vec![importing_dir]
        }
        Some("super") => {
            segments.remove(0);
            vec![importing
                .parent()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_default()]
        }
        _ => return Vec::new(), // external crate
    };

    // The final segment names an item unless the path ended in a group/glob.
    if !path_part.ends_with("::") && !segments.is_empty() {
        segments.pop();
    }

    let mut out = Vec::new();
    for base in bases {
        if segments.is_empty() {
            out.push(base.join("lib.rs"));
            out.push(base.join("main.rs"));
        } else {
            let rel: PathBuf = segments.iter().collect();
            let joined = normalize(&base.join(&rel));
            out.push(joined.with_extension("rs"));
            out.push(joined.join("mod.rs"));
        }
    }
    out.dedup();
    out
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.last(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out.iter().collect()
}
