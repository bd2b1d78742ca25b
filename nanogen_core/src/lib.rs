//! `nanogen_core` turns annotated component declarations into the source code
//! an entity component system runtime needs around them: entity accessors,
//! reactive component classes, groups, collectors, component index maps and
//! per-context classes.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Declaration files
//!   → Lexer (tokenizes declaration text, dropping whitespace and comments)
//!   → Parser (reads usings, attributes, the component type and its fields)
//!   → Resolver (synthesizes `None` for empty contexts, wraps list types)
//!   → Expander (renders snippets into tagged fragments)
//!   → Output (groups fragments into documents and replaces the output directory)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Loading `nanogen.toml` and resolving it into [`GenerationSettings`].
//! - [`project`]: Finding the components directory and the declaration files inside it.
//! - [`text`]: Small text helpers shared by the parser and the expander.
//!
//! ## Key Types
//!
//! - [`ComponentDeclaration`]: One parsed component with its contexts and fields.
//! - [`Template`]: A snippet parsed into literal spans and typed placeholders.
//! - [`Fragment`]: A tagged unit of generated text.
//! - [`Generator`]: Runs the whole pipeline for one project, one run at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use nanogen_core::Generator;
//!
//! let generator = Generator::from_root(Path::new(".")).unwrap();
//! let report = generator.generate().unwrap();
//! println!("{}", report.summary());
//! ```

pub use declaration::*;
pub use error::*;
pub use expand::*;
pub use fragment::*;
pub use generator::*;
pub use output::*;
pub use parser::*;
pub use resolver::*;
pub use single_flight::*;
pub use state::*;
pub use template::*;

pub use config::*;

pub mod config;
mod declaration;
#[allow(unused_assignments)]
mod error;
mod expand;
mod fragment;
mod generator;
pub(crate) mod lexer;
mod output;
mod parser;
pub mod project;
mod resolver;
mod single_flight;
mod state;
mod template;
pub mod text;
pub(crate) mod tokens;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
