/*
    This module compiles BNF text into a Grammar
*/

mod lexer;
pub(crate) mod verifier;

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ParseError, ParseErrorKind, ParseErrors};
use crate::grammar::{Alternative, Grammar, Term};
use lexer::{Lexeme, Token};

pub use lexer::unescape;

/// Where a reference to a nonterminal was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReferenceSite {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Named(String),
    /// A line starting with `|` extends the previous rule
    Continuation,
}

#[derive(Debug, PartialEq)]
struct Rule {
    target: Target,
    alternatives: Vec<Alternative>,
    references: Vec<ReferenceSite>,
}

fn parse_alternative(lexemes: &[Lexeme], references: &mut Vec<ReferenceSite>) -> Result<Alternative, ParseError> {
    lexemes
        .iter()
        .map(|lexeme| match &lexeme.token {
            Token::Equals => Err(ParseError::new(ParseErrorKind::UnexpectedEquals).at_column(lexeme.column)),
            Token::Or => Err(ParseError::new(ParseErrorKind::UnexpectedOr).at_column(lexeme.column)),
            Token::Literal(text) => Ok(Term::Literal(text.clone())),
            Token::Reference(name) => {
                references.push(ReferenceSite {
                    name: name.clone(),
                    line: 0,
                    column: lexeme.column,
                });
                Ok(Term::Reference(name.clone()))
            }
        })
        .collect()
}

fn parse_alternatives(lexemes: &[Lexeme], references: &mut Vec<ReferenceSite>) -> Result<Vec<Alternative>, ParseError> {
    lexemes
        .split(|lexeme| lexeme.token == Token::Or)
        .map(|alternative| parse_alternative(alternative, references))
        .collect()
}

/// Parses the lexemes of one non-blank line
fn parse_rule(lexemes: &[Lexeme]) -> Result<Rule, ParseError> {
    let mut references = Vec::new();

    let (target, rest) = match lexemes.split_first() {
        Some((Lexeme { token: Token::Reference(name), column }, rest)) => match rest.split_first() {
            Some((Lexeme { token: Token::Equals, .. }, rest)) => (Target::Named(name.clone()), rest),
            Some((other, _)) => {
                return Err(ParseError::new(ParseErrorKind::MissingEquals).at_column(other.column));
            }
            None => {
                return Err(ParseError::new(ParseErrorKind::MissingEquals)
                    .at_column(column + name.chars().count()));
            }
        },
        Some((Lexeme { token: Token::Or, .. }, rest)) => (Target::Continuation, rest),
        Some((other, _)) => {
            return Err(ParseError::new(ParseErrorKind::MissingNonterminal).at_column(other.column));
        }
        None => return Err(ParseError::new(ParseErrorKind::MissingNonterminal)),
    };

    let alternatives = parse_alternatives(rest, &mut references)?;

    Ok(Rule {
        target,
        alternatives,
        references,
    })
}

fn is_rule_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with(';')
}

/// Parses one physical line. Blank and comment lines produce no rule.
fn parse_line(line: &str, number: usize) -> Result<Option<Rule>, ParseError> {
    if !is_rule_line(line) {
        return Ok(None);
    }

    let lexemes = lexer::lex_line(line).map_err(|error| error.at_line(number))?;
    let mut rule = parse_rule(&lexemes).map_err(|error| error.at_line(number))?;
    for site in &mut rule.references {
        site.line = number;
    }

    Ok(Some(rule))
}

/// Compile a grammar document.
///
/// Every line is checked, so the returned errors cover the whole document
/// rather than stopping at the first bad line. A nonterminal declared on
/// several lines collects their alternatives in the order they appear. The
/// first declared nonterminal becomes the start symbol.
pub fn parse(text: &str) -> Result<Grammar, ParseErrors> {
    let mut errors = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut rules: HashMap<String, Vec<Alternative>> = HashMap::new();
    let mut references = Vec::new();
    let mut current: Option<String> = None;

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        let rule = match parse_line(line, number) {
            Ok(Some(rule)) => rule,
            Ok(None) => continue,
            Err(error) => {
                errors.push(error);
                continue;
            }
        };

        let name = match rule.target {
            Target::Named(name) => name,
            Target::Continuation => match &current {
                Some(name) => name.clone(),
                None => {
                    errors.push(
                        ParseError::new(ParseErrorKind::MissingNonterminal)
                            .at_line(number)
                            .at_column(line.find('|').map_or(1, |i| line[..i].chars().count() + 1)),
                    );
                    continue;
                }
            },
        };

        match rules.get_mut(&name) {
            Some(alternatives) => alternatives.extend(rule.alternatives),
            None => {
                order.push(name.clone());
                rules.insert(name.clone(), rule.alternatives);
            }
        }
        references.extend(rule.references);
        current = Some(name);
    }

    // Names declared on rejected lines are unknown, so resolution is only
    // checked for documents that are otherwise well formed
    if errors.is_empty() {
        if order.is_empty() {
            errors.push(ParseError::new(ParseErrorKind::EmptyGrammar));
        }
        errors.extend(verifier::unresolved_sites(&references, &rules));
    }

    if !errors.is_empty() {
        debug!(errors = errors.len(), "grammar rejected");
        return Err(ParseErrors::new(errors));
    }

    let start_symbol = order[0].clone();
    Ok(Grammar::from_rules(order, rules, start_symbol))
}
