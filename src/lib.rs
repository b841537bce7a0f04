//! Build-time compiler for component styles.
//!
//! `stylebake` evaluates the `css` attributes of markup elements in component
//! sources at build time and turns them into atomic CSS: one short hashed
//! class per declaration, one rule per class, shared by every element in the
//! program that uses the same declaration.
//!
//! The pipeline has two independently runnable passes:
//!
//! 1. [`bake()`] resolves each style through the module graph
//!    ([`Resolver`]), flattens it ([`normalize()`]), generates rules
//!    ([`RuleTable`]) and rewrites the element into a style island that
//!    carries its rules to the [`runtime`].
//! 2. [`extract()`] lifts the rules back out of the islands and emits them as
//!    imports, a stylesheet file, or plain metadata.
//!
//! [`Compiler`] runs both for a file.
//!
//! # Example
//!
//! ```
//! use stylebake::{Compiler, MemoryLoader, Options};
//!
//! let loader = MemoryLoader::new().with_file("src/theme.js", "export const brand = '#FF0066';");
//! let options = Options::from_json(r#"{ "extract": true }"#).unwrap();
//! let compiler = Compiler::new(options, loader).unwrap();
//!
//! let output = compiler
//!     .transform_source(
//!         "src/card.jsx",
//!         r#"import { css } from '@stylebake/react';
//!            import { brand } from './theme';
//!            const styles = css({ color: brand, ':hover': { color: 'black' } });
//!            export const Card = () => <div css={styles}>hi</div>;"#,
//!     )
//!     .unwrap();
//!
//! assert_eq!(output.style_rules.len(), 2);
//! assert!(output.style_rules[0].ends_with("{color:#ff0066}"));
//! assert!(output.style_rules[1].contains(":hover{color:black}"));
//! ```

pub mod ast;
pub mod atomic;
mod bake;
mod compile;
pub mod config;
mod error;
mod extract;
pub mod normalize;
mod parse;
pub mod resolve;
pub mod runtime;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use atomic::{class_name, merge_class_names, sort_rules, RuleTable, SharedRuleCache};
pub use bake::{bake, BakeOutput, ElementStyles, MERGE_CLASSES, SHEET, WRAPPER};
pub use compile::{Compiler, TransformOutput};
pub use config::{Emission, Options, StyleDirectory};
pub use error::StyleBakeError;
pub use extract::{extract, ExtractOutput, ExtractedStylesheet};
pub use normalize::normalize;
pub use parse::{parse, ParseError};
pub use resolve::{Env, FsLoader, MemoryLoader, ModuleId, ModuleLoader, Resolver};
pub use types::{
    sort_by_bucket, AtomicRule, Bucket, ConfigError, Declaration, ExtractError,
    InvariantViolation, Location, Nesting, NormalizeError, ResolveError, Value,
};
