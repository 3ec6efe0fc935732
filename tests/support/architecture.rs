use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Source layers of the gate, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Domain,
    Port,
    Application,
    Adapter,
}

impl Layer {
    fn dir(self) -> &'static str {
        match self {
            Self::Domain => "src/domain",
            Self::Port => "src/port",
            Self::Application => "src/application",
            Self::Adapter => "src/adapter",
        }
    }

    /// Module paths this layer must not import.
    pub fn outer_paths(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &["crate::port", "crate::application", "crate::adapter", "crate::infrastructure"],
            Self::Port => &["crate::application", "crate::adapter", "crate::infrastructure"],
            Self::Application => &["crate::adapter", "crate::infrastructure"],
            Self::Adapter => &[],
        }
    }
}

/// One offending source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub file: String,
    pub line: usize,
    pub text: String,
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.text.trim())
    }
}

/// The crate's Rust sources, read once.
pub struct SourceTree {
    root: PathBuf,
    files: Vec<(String, String)>,
}

impl SourceTree {
    pub fn load() -> Self {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let mut paths = Vec::new();
        walk(&root.join("src"), &mut paths);
        paths.sort();

        let files = paths
            .into_iter()
            .map(|path| {
                let source = fs::read_to_string(&path)
                    .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
                let relative = path
                    .strip_prefix(&root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                (relative, source)
            })
            .collect();

        Self { root, files }
    }

    pub fn has(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    fn under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a (String, String)> + 'a {
        self.files.iter().filter(move |(file, _)| file.starts_with(prefix))
    }

    /// Code lines under `prefix` mentioning any of `needles`. Comment lines are skipped.
    pub fn mentions(&self, prefix: &str, needles: &[&str]) -> Vec<Hit> {
        let mut hits = Vec::new();
        for (file, source) in self.under(prefix) {
            for (idx, text) in source.lines().enumerate() {
                if text.trim_start().starts_with("//") {
                    continue;
                }
                if needles.iter().any(|needle| text.contains(needle)) {
                    hits.push(Hit {
                        file: file.clone(),
                        line: idx + 1,
                        text: text.to_string(),
                    });
                }
            }
        }
        hits
    }

    /// Imports of layers outside `layer`.
    pub fn outward_imports(&self, layer: Layer) -> Vec<Hit> {
        self.mentions(layer.dir(), layer.outer_paths())
    }

    /// Lines in `mod.rs` files under `prefix` that do more than declare or re-export.
    pub fn logic_in_mod_files(&self, prefix: &str) -> Vec<Hit> {
        let mut hits = Vec::new();
        for (file, source) in self.under(prefix) {
            if !file.ends_with("/mod.rs") {
                continue;
            }
            for (idx, text) in source.lines().enumerate() {
                if !is_declaration(text.trim()) {
                    hits.push(Hit {
                        file: file.clone(),
                        line: idx + 1,
                        text: text.to_string(),
                    });
                }
            }
        }
        hits
    }
}

fn is_declaration(line: &str) -> bool {
    line.is_empty()
        || line.starts_with("//")
        || line.starts_with("#[cfg")
        || ["mod ", "pub mod ", "pub use ", "pub(crate) mod ", "pub(crate) use "]
            .iter()
            .any(|prefix| line.starts_with(prefix))
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = fs::read_dir(dir).unwrap_or_else(|e| panic!("cannot list {}: {e}", dir.display()));
    for entry in entries {
        let path = entry.unwrap_or_else(|e| panic!("cannot list {}: {e}", dir.display())).path();
        if path.is_dir() {
            walk(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

/// Renders hits one per line for assertion messages.
pub fn report(hits: &[Hit]) -> String {
    hits.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}
