/*
    This module generates sentences
*/

use rand::Rng;
use tracing::trace;

use crate::error::GenerateError;
use crate::grammar::{Alternative, Grammar, Term};

pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 32;

/// Configuration options for generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Expansion depth at which choices are restricted to the alternatives
    /// that finish soonest
    pub max_recursion_depth: usize,
}

impl GeneratorConfig {
    pub fn with_max_depth(max_recursion_depth: usize) -> Self {
        GeneratorConfig { max_recursion_depth }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

pub type GenResult = Result<String, GenerateError>;

/// Expands nonterminals of a grammar into random sentences.
///
/// Below the depth cap every alternative of a nonterminal is equally likely.
/// From the cap on, only alternatives of minimal derivation height are
/// candidates. Each nonterminal they reference has a strictly smaller height,
/// so expansion past the cap is bounded by the height of the nonterminal
/// where the cap was reached, whatever the random source returns.
///
/// The cap limits nesting, not output length. A grammar whose rules branch
/// into several recursive references can still produce texts of megabytes
/// before the cap is reached; lower the cap to keep such outputs small.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'g> {
    grammar: &'g Grammar,
    config: GeneratorConfig,
}

impl<'g> Generator<'g> {
    /// Create a generator over `grammar`. Nothing is precomputed, so this is
    /// cheap and generators can be created per thread.
    pub fn new(grammar: &'g Grammar, config: GeneratorConfig) -> Self {
        Generator { grammar, config }
    }

    /// The grammar being expanded
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// The configuration in use
    pub fn config(&self) -> GeneratorConfig {
        self.config
    }

    /// Generate one sentence starting from the grammar's start symbol
    pub fn generate_start<R: Rng + ?Sized>(&self, rng: &mut R) -> GenResult {
        self.generate(self.grammar.start_symbol(), rng)
    }

    /// Generate one sentence starting from `start`
    pub fn generate<R: Rng + ?Sized>(&self, start: &str, rng: &mut R) -> GenResult {
        let mut output = String::new();
        self.expand_nonterminal(start, 0, rng, &mut output)?;
        Ok(output)
    }

    /// An endless stream of sentences from the start symbol
    pub fn samples<'a, R: Rng + ?Sized>(&'a self, rng: &'a mut R) -> impl Iterator<Item = GenResult> + 'a {
        std::iter::repeat_with(move || self.generate_start(&mut *rng))
    }

    fn expand_nonterminal<R: Rng + ?Sized>(
        &self,
        name: &str,
        depth: usize,
        rng: &mut R,
        output: &mut String,
    ) -> Result<(), GenerateError> {
        let alternatives = self
            .grammar
            .alternatives(name)
            .ok_or_else(|| GenerateError::UnknownNonterminal(name.to_string()))?;

        let alternative = self.select(name, alternatives, depth, rng)?;
        for term in alternative.terms() {
            match term {
                Term::Literal(text) => output.push_str(text),
                Term::Reference(next) => self.expand_nonterminal(next, depth + 1, rng, output)?,
            }
        }

        Ok(())
    }

    fn select<'a, R: Rng + ?Sized>(
        &self,
        name: &str,
        alternatives: &'a [Alternative],
        depth: usize,
        rng: &mut R,
    ) -> Result<&'a Alternative, GenerateError> {
        let no_way_out = || GenerateError::NoTerminatingAlternative(name.to_string());

        if depth < self.config.max_recursion_depth {
            return pick(alternatives, rng).ok_or_else(no_way_out);
        }

        let height = self.grammar.min_height(name).ok_or_else(no_way_out)?;
        let candidates: Vec<&Alternative> = alternatives
            .iter()
            .filter(|alternative| self.grammar.alternative_height(alternative) == Some(height))
            .collect();
        trace!(
            nonterminal = name,
            depth,
            candidates = candidates.len(),
            "depth cap reached"
        );

        pick(&candidates, rng).copied().ok_or_else(no_way_out)
    }
}

/// Uniform choice. A single item draws nothing from the random source.
fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    match items.len() {
        0 | 1 => items.first(),
        len => items.get(rng.gen_range(0..len)),
    }
}

/// Generate one sentence from `start` with a depth cap of `max_depth`
pub fn generate<R: Rng + ?Sized>(grammar: &Grammar, start: &str, rng: &mut R, max_depth: usize) -> GenResult {
    Generator::new(grammar, GeneratorConfig::with_max_depth(max_depth)).generate(start, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    /// Always draws the first of any set of choices
    fn first_choice() -> StepRng {
        StepRng::new(0, 0)
    }

    /// Draws the second of any pair of choices
    fn second_choice() -> StepRng {
        StepRng::new(1 << 63, 0)
    }

    fn greeting() -> Grammar {
        "greeting = \"hi \" name\nname = \"Sam\" | \"Al\"".parse().unwrap()
    }

    #[test]
    fn test_scripted_choices() {
        let grammar = greeting();
        let generator = Generator::new(&grammar, GeneratorConfig::default());

        assert_eq!(generator.generate("greeting", &mut first_choice()).unwrap(), "hi Sam");
        assert_eq!(generator.generate("greeting", &mut second_choice()).unwrap(), "hi Al");
        assert_eq!(generator.generate_start(&mut first_choice()).unwrap(), "hi Sam");
    }

    #[test]
    fn test_no_implicit_separators() {
        let grammar: Grammar = "word = a opt b\na = \"x\"\nb = \"y\"\nopt = \"\" | \"z\"".parse().unwrap();

        assert_eq!(generate(&grammar, "word", &mut first_choice(), 8).unwrap(), "xy");
        assert_eq!(generate(&grammar, "word", &mut second_choice(), 8).unwrap(), "xzy");
    }

    #[test]
    fn test_empty_alternative() {
        let grammar: Grammar = "s = \"<\" y \">\"\ny = | \"z\"".parse().unwrap();
        assert_eq!(generate(&grammar, "s", &mut first_choice(), 8).unwrap(), "<>");
    }

    #[test]
    fn test_deterministic_with_seed() {
        let grammar: Grammar = "\
list = item | item \", \" list
item = \"a\" | \"b\" | \"c\" | \"d\""
            .parse()
            .unwrap();
        let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(16));

        for seed in 0..20 {
            let first = generator.generate_start(&mut StdRng::seed_from_u64(seed)).unwrap();
            let second = generator.generate_start(&mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_recursion_terminates() {
        // The recursive alternative comes second, so a source that always
        // picks it would recurse forever without the depth cap.
        let grammar: Grammar = "recursive = \"x\" | recursive \"+\" recursive".parse().unwrap();

        for max_depth in [0, 1, 5, 12] {
            let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(max_depth));
            let result = generator.generate_start(&mut second_choice()).unwrap();

            // A full binary tree of `recursive` down to the cap, then leaves
            let leaves = 1usize << max_depth;
            assert_eq!(result.matches('x').count(), leaves);
            assert_eq!(result.matches('+').count(), leaves - 1);
        }
    }

    #[test]
    fn test_depth_cap_bounds_nesting_not_length() {
        let grammar: Grammar = "s = \"x\" | s s s".parse().unwrap();

        // Output grows as 3^cap, so only a lower cap keeps it small
        for (max_depth, longest) in [(2, 9), (6, 729)] {
            let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(max_depth));
            assert_eq!(generator.generate_start(&mut second_choice()).unwrap().len(), longest);

            let mut rng = StdRng::seed_from_u64(9);
            for result in generator.samples(&mut rng).take(50) {
                assert!(result.unwrap().len() <= longest);
            }
        }
    }

    #[test]
    fn test_depth_cap_prefers_shallowest() {
        let grammar: Grammar = "\
s = deep | shallow | s s
deep = mid
mid = \"deep\"
shallow = \"shallow\""
            .parse()
            .unwrap();

        // With no headroom every draw is forced; `shallow` is the only
        // alternative of minimal height.
        let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(0));
        for seed in 0..20 {
            let result = generator.generate_start(&mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(result, "shallow");
        }
    }

    #[test]
    fn test_random_draws_always_terminate() {
        let grammar: Grammar = "\
expr = term | term \" + \" expr
term = factor | factor \" * \" term
factor = num | \"(\" expr \")\"
num = \"0\" | \"1\" | \"2\""
            .parse()
            .unwrap();
        let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(10));
        let mut rng = StdRng::seed_from_u64(42);

        for result in generator.samples(&mut rng).take(200) {
            let text = result.unwrap();
            assert!(!text.is_empty());
            assert_eq!(text.matches('(').count(), text.matches(')').count());
        }
    }

    #[test]
    fn test_no_terminating_alternative() {
        let grammar: Grammar = "start = \"a\" | loop\nloop = loop \"!\" | \"(\" loop \")\"".parse().unwrap();
        let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(3));

        assert_eq!(
            generator.generate("loop", &mut first_choice()),
            Err(GenerateError::NoTerminatingAlternative("loop".to_string()))
        );
        // `start` can still finish through its first alternative
        assert_eq!(generator.generate("start", &mut first_choice()).unwrap(), "a");
    }

    #[test]
    fn test_unknown_start_symbol() {
        let grammar = greeting();
        assert_eq!(
            generate(&grammar, "farewell", &mut first_choice(), 8),
            Err(GenerateError::UnknownNonterminal("farewell".to_string()))
        );
    }

    #[test]
    fn test_output_is_only_literals() {
        let grammar = GrammarBuilder::new()
            .add_rule("s", [Term::reference("a"), Term::literal("-"), Term::reference("a")])
            .add_rule("a", [Term::literal("ab")])
            .add_rule("a", [Term::literal("")])
            .build()
            .unwrap();
        let generator = Generator::new(&grammar, GeneratorConfig::default());
        let mut rng = StdRng::seed_from_u64(7);

        for result in generator.samples(&mut rng).take(50) {
            let text = result.unwrap();
            assert!(["-", "ab-", "-ab", "ab-ab"].contains(&text.as_str()));
        }
    }

    #[test]
    fn test_shared_between_threads() {
        let grammar: Grammar = "\
list = item | item \" \" list
item = \"a\" | \"b\""
            .parse()
            .unwrap();
        let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(6));

        let outputs: Vec<Vec<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let mut rng = StdRng::seed_from_u64(99);
                        generator
                            .samples(&mut rng)
                            .take(10)
                            .collect::<Result<Vec<_>, _>>()
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
