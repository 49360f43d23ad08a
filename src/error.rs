use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use thiserror::Error;

/// The reason a grammar line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A rule line does not start with a nonterminal name
    #[error("expected a nonterminal at the start of the rule")]
    MissingNonterminal,

    /// The nonterminal is not followed by `=`. `x="a"` lexes as one name,
    /// so operators need whitespace around them.
    #[error("expected `=` after nonterminal; `=` and `|` must be separated by whitespace")]
    MissingEquals,

    /// A rule line contains more than one `=`
    #[error("unexpected `=`")]
    UnexpectedEquals,

    /// A `|` reached a single alternative instead of separating two
    #[error("unexpected `|`")]
    UnexpectedOr,

    #[error("unterminated literal")]
    UnterminatedLiteral,

    /// Only `\n`, `\t`, `\r`, `\0`, `\"` and `\\` are accepted inside literals
    #[error("unknown escape sequence `\\{0}`")]
    UnknownEscape(char),

    #[error("unresolved nonterminal: {0}")]
    UnresolvedNonterminal(String),

    #[error("grammar contains no rules")]
    EmptyGrammar,
}

/// A single problem found while compiling grammar text.
///
/// Lines and columns are 1-based. Line 0 means the error is not tied to a
/// particular line (an empty document, or a grammar assembled in code).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", located(.line, .column, .kind))]
pub struct ParseError {
    pub line: usize,
    pub column: Option<usize>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        ParseError {
            line: 0,
            column: None,
            kind,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

fn located(line: &usize, column: &Option<usize>, kind: &ParseErrorKind) -> String {
    match (*line, *column) {
        (0, _) => kind.to_string(),
        (line, None) => format!("line {line}: {kind}"),
        (line, Some(column)) => format!("line {line}, column {column}: {kind}"),
    }
}

/// Every error found in one grammar document, ordered by position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .0.iter().join("\n"))]
pub struct ParseErrors(Vec<ParseError>);

impl ParseErrors {
    /// Sorts the errors by line and column. `errors` must not be empty.
    pub(crate) fn new(mut errors: Vec<ParseError>) -> Self {
        debug_assert!(!errors.is_empty());
        errors.sort_by_key(|error| (error.line, error.column));
        ParseErrors(errors)
    }

    pub fn first(&self) -> &ParseError {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ParseError> {
        self.0
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        ParseErrors(vec![error])
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Failures while expanding a compiled grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("no definition for nonterminal `{0}`")]
    UnknownNonterminal(String),

    /// Every alternative of the nonterminal recurses, so the depth cap
    /// cannot force a finite expansion
    #[error("nonterminal `{0}` has no terminating alternative")]
    NoTerminatingAlternative(String),
}

/// Crate-level error type
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Parse(#[from] ParseErrors),

    #[error("{}", in_file(.path, .errors))]
    ParseFile {
        path: PathBuf,
        #[source]
        errors: ParseErrors,
    },

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("unknown start symbol: {0}")]
    UnknownStartSymbol(String),
}

fn in_file(path: &Path, errors: &ParseErrors) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", path.display(), error))
        .join("\n")
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_error_display() {
        let unresolved = ParseError::new(ParseErrorKind::UnresolvedNonterminal("b".to_string()))
            .at_line(1)
            .at_column(5);
        assert_eq!(unresolved.to_string(), "line 1, column 5: unresolved nonterminal: b");

        let missing = ParseError::new(ParseErrorKind::MissingEquals).at_line(4);
        assert_eq!(missing.to_string(), "line 4: expected `=` after nonterminal; `=` and `|` must be separated by whitespace");

        let empty = ParseError::new(ParseErrorKind::EmptyGrammar);
        assert_eq!(empty.to_string(), "grammar contains no rules");

        let escape = ParseError::new(ParseErrorKind::UnknownEscape('q'));
        assert_eq!(escape.to_string(), "unknown escape sequence `\\q`");
    }

    #[test]
    fn test_errors_are_sorted() {
        let errors = ParseErrors::new(vec![
            ParseError::new(ParseErrorKind::UnexpectedEquals).at_line(7).at_column(3),
            ParseError::new(ParseErrorKind::MissingNonterminal).at_line(3).at_column(9),
            ParseError::new(ParseErrorKind::MissingEquals).at_line(3).at_column(1),
        ]);

        let lines: Vec<_> = errors.iter().map(|e| (e.line, e.column)).collect();
        assert_eq!(lines, vec![(3, Some(1)), (3, Some(9)), (7, Some(3))]);
        assert_eq!(errors.first().kind, ParseErrorKind::MissingEquals);
    }

    #[test]
    fn test_file_errors_name_the_path() {
        let error = GrammarError::ParseFile {
            path: PathBuf::from("address.bnf"),
            errors: ParseErrors::new(vec![
                ParseError::new(ParseErrorKind::UnterminatedLiteral).at_line(2).at_column(8),
                ParseError::new(ParseErrorKind::MissingEquals).at_line(5),
            ]),
        };

        assert_eq!(
            error.to_string(),
            "address.bnf: line 2, column 8: unterminated literal\n\
             address.bnf: line 5: expected `=` after nonterminal; `=` and `|` must be separated by whitespace"
        );
    }
}
