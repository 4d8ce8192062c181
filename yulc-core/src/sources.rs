use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// The two source dialects the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Plain Yul, handed to the backend as-is.
    Yul,
    /// Yul+, transpiled to Yul first.
    Yulp,
}

impl Dialect {
    pub fn extension(self) -> &'static str {
        match self {
            Dialect::Yul => "yul",
            Dialect::Yulp => "yulp",
        }
    }
}

/// A discovered source file and the names derived from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated. Files outside the
    /// root keep their path minus the root and any `..`, so the name is
    /// always relative.
    pub source_name: String,
    /// File stem, used as the artifact's contract name.
    pub contract_name: String,
    pub dialect: Dialect,
}

impl SourceFile {
    pub fn new(project_root: &Path, path: PathBuf, dialect: Dialect) -> Self {
        let relative = path.strip_prefix(project_root).unwrap_or(&path);
        let source_name = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        let contract_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            source_name,
            contract_name,
            dialect,
        }
    }
}

/// Finds every `*.<ext>` file below `root`, sorted.
///
/// A root that does not exist simply yields nothing.
pub fn locate_sources(root: impl AsRef<Path>, dialect: Dialect) -> Vec<PathBuf> {
    let root = absolute(root.as_ref());
    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == dialect.extension()))
        .collect();
    files.sort();
    files
}

/// All Yul files followed by all Yul+ files under `sources_dir`.
pub fn discover(project_root: &Path, sources_dir: &Path) -> Vec<SourceFile> {
    let project_root = absolute(project_root);
    [Dialect::Yul, Dialect::Yulp]
        .into_iter()
        .flat_map(|dialect| {
            locate_sources(sources_dir, dialect)
                .into_iter()
                .map(move |path| (path, dialect))
        })
        .map(|(path, dialect)| SourceFile::new(&project_root, path, dialect))
        .collect()
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
