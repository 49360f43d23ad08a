//! bnf-gen compiles BNF-style grammars and generates random sentences from
//! them.
//!
//! A grammar is a list of rules. Each rule names a nonterminal and lists its
//! alternatives separated by `|`; an alternative is a sequence of quoted
//! literals and nonterminal names. Lines starting with `;` are comments.
//!
//! ```text
//! postal.address = name.part street.address zip.part
//! opt.suffix.part = " Sr." | " Jr." | ""
//! ```
//!
//! Terms are concatenated exactly as written, so spaces between words must be
//! part of a literal.
//!
//! # Example
//!
//! ```rust
//! use bnf_gen::{Generator, GeneratorConfig, Grammar};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let grammar: Grammar = r#"
//! greeting = "Hello, " subject "!"
//! subject = "world" | "Rust"
//! "#
//! .parse()?;
//!
//! let generator = Generator::new(&grammar, GeneratorConfig::default());
//! let mut rng = StdRng::seed_from_u64(7);
//! let text = generator.generate_start(&mut rng)?;
//! assert!(text == "Hello, world!" || text == "Hello, Rust!");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod generator;
pub mod grammar;
pub mod parser;

pub use error::{GenerateError, GrammarError, ParseError, ParseErrorKind, ParseErrors, Result};
pub use generator::{DEFAULT_MAX_RECURSION_DEPTH, Generator, GeneratorConfig, generate};
pub use grammar::{Alternative, Grammar, GrammarBuilder, Term};
pub use parser::parse;
