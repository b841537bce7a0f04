//! End-to-end compilation of one source file.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::Module;
use crate::atomic::{RuleTable, SharedRuleCache};
use crate::bake::{bake, ElementStyles};
use crate::config::Options;
use crate::error::StyleBakeError;
use crate::extract::{extract, ExtractedStylesheet};
use crate::parse::parse;
use crate::resolve::ModuleLoader;
use crate::types::{AtomicRule, ConfigError};

/// Everything one compiled file produced.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    /// The rewritten module.
    pub module: Module,
    /// Per styled element, its classes in application order.
    pub elements: Vec<ElementStyles>,
    /// Unique rules the file needs.
    pub rules: Vec<AtomicRule>,
    /// Rule strings lifted out by extraction, in discovery order. Empty
    /// unless `extract` is enabled.
    pub style_rules: Vec<String>,
    /// Stylesheet written by directory emission.
    pub stylesheet: Option<ExtractedStylesheet>,
    /// Modules the file's styles were resolved from. Register these as
    /// build dependencies of the file.
    pub included_files: Vec<PathBuf>,
}

/// Runs the bake pass and, when enabled, the extraction pass.
///
/// A compiler holds no per-file state and can be shared across threads
/// when its loader can; each call owns its resolver and rule table.
///
/// # Example
///
/// ```
/// use stylebake::{Compiler, MemoryLoader, Options};
///
/// let compiler = Compiler::new(Options::default(), MemoryLoader::new()).unwrap();
/// let output = compiler
///     .transform_source(
///         "src/button.jsx",
///         "import { css } from '@stylebake/react';\n\
///          export const Button = () => <button css={{ color: 'red' }} />;",
///     )
///     .unwrap();
/// assert_eq!(output.rules.len(), 1);
/// assert!(output.rules[0].css.ends_with("{color:red}"));
/// ```
#[derive(Debug)]
pub struct Compiler<L> {
    options: Options,
    loader: L,
    shared: Option<SharedRuleCache>,
}

impl<L: ModuleLoader> Compiler<L> {
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the options are inconsistent.
    pub fn new(options: Options, loader: L) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            loader,
            shared: None,
        })
    }

    /// Shares generated rules with every other compiler using `cache`.
    #[must_use]
    pub fn with_shared_cache(mut self, cache: SharedRuleCache) -> Self {
        self.shared = Some(cache);
        self
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// A rule table configured with this compiler's compression map and
    /// shared cache.
    #[must_use]
    pub fn rule_table(&self) -> RuleTable {
        let mut table = RuleTable::new();
        if let Some(map) = &self.options.class_name_compression_map {
            table = table.with_compression(map.clone());
        }
        if let Some(cache) = &self.shared {
            table = table.with_shared_cache(cache.clone());
        }
        table
    }

    /// Reads `path` through the loader and compiles it.
    ///
    /// # Errors
    ///
    /// Returns [`StyleBakeError`] from any stage, or I/O errors reading the
    /// file or writing its stylesheet.
    pub fn transform(&self, path: impl AsRef<Path>) -> Result<TransformOutput, StyleBakeError> {
        let path = path.as_ref();
        let source = self.loader.load(path)?;
        self.transform_source(path, &source)
    }

    /// Compiles `source` as the contents of `path`.
    ///
    /// # Errors
    ///
    /// See [`transform`](Self::transform).
    pub fn transform_source(
        &self,
        path: impl AsRef<Path>,
        source: &str,
    ) -> Result<TransformOutput, StyleBakeError> {
        let mut table = self.rule_table();
        self.transform_with_table(path, source, &mut table)
    }

    /// Compiles `source` interning rules into `table`, so one table can
    /// collect the rules of many files.
    ///
    /// # Errors
    ///
    /// See [`transform`](Self::transform).
    pub fn transform_with_table(
        &self,
        path: impl AsRef<Path>,
        source: &str,
        table: &mut RuleTable,
    ) -> Result<TransformOutput, StyleBakeError> {
        let path = path.as_ref();
        let mut module = parse(source)?;
        let baked = bake(&mut module, path, source, &self.options, &self.loader, table)?;

        let mut output = TransformOutput {
            module,
            elements: baked.elements,
            rules: baked.rules,
            included_files: baked.included_files,
            ..TransformOutput::default()
        };
        let Some(emission) = self.options.emission() else {
            return Ok(output);
        };

        let extracted = extract(&mut output.module, path, source, &emission, &self.options)?;
        if let Some(sheet) = &extracted.stylesheet {
            if let Some(dir) = sheet.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&sheet.path, &sheet.css)?;
            debug!(path = %sheet.path.display(), "wrote stylesheet");
        }
        output.style_rules = extracted.style_rules;
        output.stylesheet = extracted.stylesheet;
        Ok(output)
    }
}
