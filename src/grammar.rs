use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use tracing::debug;

use crate::error::{GrammarError, ParseErrors, Result};
use crate::parser::{self, verifier};

/// A single element of an alternative
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    /// Literal text, already unescaped
    Literal(String),
    /// The name of a nonterminal to expand
    Reference(String),
}

impl Term {
    /// A literal emitted verbatim. `text` is already unescaped.
    pub fn literal(text: impl Into<String>) -> Self {
        Term::Literal(text.into())
    }

    /// A reference to the nonterminal `name`
    pub fn reference(name: impl Into<String>) -> Self {
        Term::Reference(name.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Literal(text) => write!(f, "\"{}\"", escape_literal(text)),
            Term::Reference(name) => f.write_str(name),
        }
    }
}

fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            '\0' => escaped.push_str("\\0"),
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// One production of a nonterminal. An empty alternative produces the empty
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Alternative {
    terms: Vec<Term>,
}

impl Alternative {
    /// Create an alternative from its terms in output order
    pub fn new(terms: Vec<Term>) -> Self {
        Alternative { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Names of the nonterminals this alternative refers to, in order
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|term| match term {
            Term::Reference(name) => Some(name.as_str()),
            Term::Literal(_) => None,
        })
    }
}

impl FromIterator<Term> for Alternative {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Alternative::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.terms.iter().join(" "))
    }
}

/// A compiled grammar.
///
/// Every nonterminal referenced by an alternative has an entry in the rule
/// table, and every entry has at least one alternative. A grammar never
/// changes once built, so one instance can be shared between threads that each
/// generate with their own random source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// The starting symbol for generation
    start_symbol: String,
    /// Nonterminals in declaration order
    order: Vec<String>,
    /// The rules mapping nonterminals to alternatives
    rules: HashMap<String, Vec<Alternative>>,
    /// Minimum derivation height of every nonterminal that can terminate
    heights: HashMap<String, usize>,
}

impl Grammar {
    /// Assembles a grammar from already validated parts
    pub(crate) fn from_rules(
        order: Vec<String>,
        rules: HashMap<String, Vec<Alternative>>,
        start_symbol: String,
    ) -> Self {
        let heights = derivation_heights(&order, &rules);
        let grammar = Grammar {
            start_symbol,
            order,
            rules,
            heights,
        };

        debug!(
            nonterminals = grammar.rule_count(),
            alternatives = grammar.alternative_count(),
            start = %grammar.start_symbol,
            "compiled grammar"
        );
        for name in grammar.non_terminating() {
            debug!(nonterminal = name, "no terminating derivation");
        }

        grammar
    }

    /// Compile grammar text
    pub fn parse(text: &str) -> std::result::Result<Self, ParseErrors> {
        parser::parse(text)
    }

    /// Read and compile a grammar file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| GrammarError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        parser::parse(&text).map_err(|errors| GrammarError::ParseFile {
            path: path.to_path_buf(),
            errors,
        })
    }

    /// Use a different nonterminal as the entry point
    pub fn with_start_symbol(mut self, start_symbol: &str) -> Result<Self> {
        if !self.has_nonterminal(start_symbol) {
            return Err(GrammarError::UnknownStartSymbol(start_symbol.to_string()));
        }
        self.start_symbol = start_symbol.to_string();
        Ok(self)
    }

    /// Get the start symbol
    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// Check if the grammar contains a specific nonterminal
    pub fn has_nonterminal(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Nonterminal names in the order they were first declared
    pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The alternatives of `name` in declaration order, or `None` if it is
    /// not defined
    pub fn alternatives(&self, name: &str) -> Option<&[Alternative]> {
        self.rules.get(name).map(Vec::as_slice)
    }

    /// Number of nonterminals
    pub fn rule_count(&self) -> usize {
        self.order.len()
    }

    /// Number of alternatives across all nonterminals
    pub fn alternative_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// The fewest nested expansions needed to fully derive `name`, or `None`
    /// when every derivation of it recurses forever.
    pub fn min_height(&self, name: &str) -> Option<usize> {
        self.heights.get(name).copied()
    }

    /// Height of the shallowest derivation starting with `alternative`
    pub fn alternative_height(&self, alternative: &Alternative) -> Option<usize> {
        alternative_height(alternative, &self.heights)
    }

    /// Nonterminals that can never finish expanding, in declaration order
    pub fn non_terminating(&self) -> Vec<&str> {
        self.nonterminals()
            .filter(|name| !self.heights.contains_key(*name))
            .collect()
    }
}

impl FromStr for Grammar {
    type Err = ParseErrors;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        parser::parse(text)
    }
}

/// Renders the grammar back into source notation, one line per nonterminal
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.order {
            writeln!(f, "{} = {}", name, self.rules[name].iter().join(" | "))?;
        }
        Ok(())
    }
}

impl Serialize for Grammar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Rules<'a>(&'a Grammar);

        impl Serialize for Rules<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.order.len()))?;
                for name in &self.0.order {
                    map.serialize_entry(name, &self.0.rules[name])?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("Grammar", 2)?;
        state.serialize_field("start_symbol", &self.start_symbol)?;
        state.serialize_field("rules", &Rules(self))?;
        state.end()
    }
}

fn alternative_height(alternative: &Alternative, heights: &HashMap<String, usize>) -> Option<usize> {
    alternative
        .references()
        .try_fold(0, |deepest, name| {
            heights.get(name).map(|&height| deepest.max(height))
        })
        .map(|deepest| deepest + 1)
}

// Heights only ever shrink, so this reaches a fixed point after at most one
// pass per nonterminal.
fn derivation_heights(
    order: &[String],
    rules: &HashMap<String, Vec<Alternative>>,
) -> HashMap<String, usize> {
    let mut heights = HashMap::with_capacity(rules.len());

    loop {
        let mut changed = false;
        for name in order {
            let best = rules[name]
                .iter()
                .filter_map(|alternative| alternative_height(alternative, &heights))
                .min();

            if let Some(best) = best {
                if heights.get(name).map_or(true, |&current| best < current) {
                    heights.insert(name.clone(), best);
                    changed = true;
                }
            }
        }
        if !changed {
            return heights;
        }
    }
}

/// Builder for constructing Grammar instances in code
#[derive(Debug, Clone, Default)]
pub struct GrammarBuilder {
    start_symbol: Option<String>,
    order: Vec<String>,
    rules: HashMap<String, Vec<Alternative>>,
}

impl GrammarBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        GrammarBuilder::default()
    }

    /// Set the start symbol (default: the first nonterminal added)
    pub fn start(mut self, start_symbol: &str) -> Self {
        self.start_symbol = Some(start_symbol.to_string());
        self
    }

    /// Append one alternative to `nonterminal`
    pub fn add_rule<I>(mut self, nonterminal: &str, terms: I) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        let alternative = terms.into_iter().collect();
        match self.rules.get_mut(nonterminal) {
            Some(alternatives) => alternatives.push(alternative),
            None => {
                self.order.push(nonterminal.to_string());
                self.rules.insert(nonterminal.to_string(), vec![alternative]);
            }
        }
        self
    }

    /// Build the grammar, checking that every reference resolves
    pub fn build(self) -> Result<Grammar> {
        verifier::verify_table(&self.order, &self.rules)?;

        let start_symbol = match self.start_symbol {
            Some(start) if !self.rules.contains_key(&start) => {
                return Err(GrammarError::UnknownStartSymbol(start));
            }
            Some(start) => start,
            None => self.order[0].clone(),
        };

        Ok(Grammar::from_rules(self.order, self.rules, start_symbol))
    }
}
