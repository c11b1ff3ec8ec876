//! Integration-test fixtures and helpers for skein.

use std::path::Path;
use std::sync::Once;

use skein_core::{CallGraphBuilder, FileSource, ProjectSnapshot};

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An in-memory project fed to the builder file by file.
#[derive(Debug, Default)]
pub struct TestProject {
    sources: Vec<FileSource>,
}

impl TestProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, source: &str) -> Self {
        self.sources.push(FileSource::new(path, source));
        self
    }

    pub fn sources(&self) -> Vec<FileSource> {
        self.sources.clone()
    }

    pub fn build(&self) -> anyhow::Result<ProjectSnapshot> {
        init_tracing();
        Ok(CallGraphBuilder::new().build(self.sources())?)
    }

    pub async fn build_async(&self) -> anyhow::Result<ProjectSnapshot> {
        init_tracing();
        Ok(CallGraphBuilder::new().build_async(self.sources()).await?)
    }
}

/// Read every supported source file under a directory into builder inputs,
/// paths relative to `root`. Hosts own file I/O; this helper plays that role
/// for tests.
pub fn load_dir(root: &Path) -> anyhow::Result<Vec<FileSource>> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<FileSource>) -> anyhow::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out)?;
            } else if skein_graphs::Language::from_path(&path).is_some() {
                let source = std::fs::read_to_string(&path)?;
                let rel = path.strip_prefix(root)?.to_path_buf();
                out.push(FileSource::new(rel, source));
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// A small mixed-language fixture used by several tests.
pub fn mixed_project() -> TestProject {
    TestProject::new()
        .file(
            "web/util.ts",
            "export function add(x: number, y: number): number { return x + y; }\n",
        )
        .file(
            "web/app.ts",
            "import { add } from './util';\nexport function main() { return add(1, 2); }\n",
        )
        .file(
            "svc/worker.py",
            "class Worker:\n    def run(self):\n        return 1\n\ndef main():\n    w = Worker()\n    w.run()\n",
        )
        .file(
            "native/lib.rs",
            "pub struct Engine;\nimpl Engine {\n    pub fn new() -> Self { Engine }\n    pub fn start(&self) {}\n}\n",
        )
        .file(
            "native/main.rs",
            "use crate::Engine;\nfn main() {\n    let e = Engine::new();\n    e.start();\n}\n",
        )
}
