use std::collections::HashMap;

use super::ReferenceSite;
use crate::error::{ParseError, ParseErrorKind, ParseErrors};
use crate::grammar::Alternative;

pub type RuleTable = HashMap<String, Vec<Alternative>>;

fn unresolved(name: &str) -> ParseError {
    ParseError::new(ParseErrorKind::UnresolvedNonterminal(name.to_owned()))
}

/// Every reference written in the source whose target is never declared
pub fn unresolved_sites<'a>(
    sites: &'a [ReferenceSite],
    rules: &'a RuleTable,
) -> impl Iterator<Item = ParseError> + 'a {
    sites
        .iter()
        .filter(|site| !rules.contains_key(&site.name))
        .map(|site| unresolved(&site.name).at_line(site.line).at_column(site.column))
}

fn alternative_undefined_symbols<'a>(
    alternative: &'a Alternative,
    rules: &'a RuleTable,
) -> impl Iterator<Item = &'a str> {
    alternative.references().filter(|name| !rules.contains_key(*name))
}

/// Checks a rule table assembled in code, where no source positions exist
pub fn verify_table(order: &[String], rules: &RuleTable) -> Result<(), ParseErrors> {
    if order.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyGrammar).into());
    }

    // Walk the declaration order so errors come out in a stable order
    let mut errors: Vec<ParseError> = Vec::new();
    for name in order {
        for alternative in &rules[name] {
            for symbol in alternative_undefined_symbols(alternative, rules) {
                if !errors
                    .iter()
                    .any(|e| e.kind == ParseErrorKind::UnresolvedNonterminal(symbol.to_owned()))
                {
                    errors.push(unresolved(symbol));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ParseErrors::new(errors))
    }
}
