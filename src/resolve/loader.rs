use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

const DEFAULT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs"];

/// Locates and reads the modules an entry file imports from.
pub trait ModuleLoader {
    /// Resolves `specifier` as imported from `importer`. `None` marks an
    /// external package whose values cannot be evaluated.
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf>;

    /// Reads the source text of a resolved module.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the module cannot be read.
    fn load(&self, path: &Path) -> io::Result<String>;
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Lexically removes `.` and `..` components.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Candidate files for a relative import: the path itself, with each
/// extension appended, then `index.<ext>` inside it.
fn candidates(base: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut out = vec![base.to_path_buf()];
    for ext in extensions {
        let mut with_ext = base.as_os_str().to_owned();
        with_ext.push(".");
        with_ext.push(ext);
        out.push(PathBuf::from(with_ext));
    }
    for ext in extensions {
        out.push(base.join(format!("index.{ext}")));
    }
    out
}

fn relative_base(specifier: &str, importer: &Path) -> PathBuf {
    let dir = importer.parent().unwrap_or_else(|| Path::new(""));
    clean_path(&dir.join(specifier))
}

/// Loads modules from the file system. Only relative specifiers are
/// followed; bare package names are external.
#[derive(Debug, Clone)]
pub struct FsLoader {
    extensions: Vec<String>,
}

impl Default for FsLoader {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
        }
    }
}

impl FsLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

impl ModuleLoader for FsLoader {
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        if !is_relative(specifier) {
            return None;
        }
        let base = relative_base(specifier, importer);
        let found = candidates(&base, &self.extensions)
            .into_iter()
            .find(|p| p.is_file());
        // An unresolvable relative import still names a local file; report it
        // as a load failure rather than silently treating it as external.
        Some(found.unwrap_or(base))
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory module set, for tools and tests.
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
    extensions: Vec<String>,
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
        }
    }
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files.insert(clean_path(path.as_ref()), source.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ModuleLoader for MemoryLoader {
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        if !is_relative(specifier) {
            return None;
        }
        let base = relative_base(specifier, importer);
        let found = candidates(&base, &self.extensions)
            .into_iter()
            .find(|p| self.files.contains_key(p));
        Some(found.unwrap_or(base))
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&clean_path(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no module at {}", path.display()),
            )
        })
    }
}
