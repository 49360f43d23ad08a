mod logging;

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use bnf_gen::parser::unescape;
use bnf_gen::{DEFAULT_MAX_RECURSION_DEPTH, Generator, GeneratorConfig, Grammar};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

/// Generate random sentences from a BNF grammar
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file
    #[arg(required_unless_present = "expr", conflicts_with = "expr")]
    grammar_file: Option<PathBuf>,

    /// Grammar text given inline instead of a file
    #[arg(short, long, value_name = "TEXT")]
    expr: Option<String>,

    /// Start symbol (default: first declared nonterminal)
    #[arg(short, long, value_name = "SYMBOL")]
    start: Option<String>,

    /// Number of texts to generate
    #[arg(short = 'n', long, value_name = "AMOUNT", default_value_t = 1)]
    count: usize,

    /// Seed for reproducible output
    #[arg(long, env = "BNF_GEN_SEED")]
    seed: Option<u64>,

    /// Expansion depth after which only the quickest-terminating alternatives
    /// are chosen. Limits nesting, not output length
    #[arg(short = 'd', long, env = "BNF_GEN_MAX_DEPTH", default_value_t = DEFAULT_MAX_RECURSION_DEPTH)]
    max_depth: usize,

    /// Text written between generated sentences; backslash escapes are honoured
    #[arg(long, default_value = "\\n")]
    delimiter: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Only compile the grammar and report problems
    #[arg(long)]
    check: bool,

    /// Print the compiled grammar as JSON instead of generating
    #[arg(long, conflicts_with = "check")]
    dump: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Sentences separated by the delimiter
    Text,
    /// A JSON array of sentences
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    if let Err(err) = logging::init_tracing(level) {
        eprintln!("failed to initialise tracing: {err}");
    }

    match run(cli, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_grammar(cli: &Cli) -> Result<Grammar, Box<dyn Error>> {
    let grammar = match (&cli.grammar_file, &cli.expr) {
        (Some(path), _) => {
            info!(path = %path.display(), "loading grammar");
            Grammar::from_file(path)?
        }
        (None, Some(text)) => text.parse::<Grammar>()?,
        (None, None) => return Err("a grammar file or --expr is required".into()),
    };

    match &cli.start {
        Some(start) => Ok(grammar.with_start_symbol(start)?),
        None => Ok(grammar),
    }
}

/// Joins generated texts for output. Text output ends with a newline unless
/// nothing was generated.
fn render(samples: &[String], format: Format, delimiter: &str) -> Result<String, Box<dyn Error>> {
    match format {
        Format::Text => {
            let mut text = samples.join(unescape(delimiter)?.as_str());
            if !samples.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            Ok(text)
        }
        Format::Json => Ok(format!("{}\n", serde_json::to_string_pretty(samples)?)),
    }
}

fn check_report(grammar: &Grammar) -> String {
    let mut report = String::new();
    for name in grammar.non_terminating() {
        report.push_str(&format!("warning: nonterminal `{name}` has no terminating alternative\n"));
    }
    report.push_str(&format!(
        "ok: {} nonterminals, {} alternatives, start symbol `{}`\n",
        grammar.rule_count(),
        grammar.alternative_count(),
        grammar.start_symbol()
    ));
    report
}

fn run(cli: Cli, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let grammar = load_grammar(&cli)?;
    info!(
        nonterminals = grammar.rule_count(),
        alternatives = grammar.alternative_count(),
        "loaded grammar"
    );

    if cli.check {
        write!(out, "{}", check_report(&grammar))?;
        return Ok(());
    }

    if cli.dump {
        writeln!(out, "{}", serde_json::to_string_pretty(&grammar)?)?;
        return Ok(());
    }

    if let Some(height) = grammar.min_height(grammar.start_symbol()) {
        debug!(start = grammar.start_symbol(), height, "shallowest derivation");
    } else {
        warn!(start = grammar.start_symbol(), "start symbol has no terminating derivation");
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generator = Generator::new(&grammar, GeneratorConfig::with_max_depth(cli.max_depth));
    let samples = generator
        .samples(&mut rng)
        .take(cli.count)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = samples.len(), "generated");

    write!(out, "{}", render(&samples, cli.format, &cli.delimiter)?)?;
    Ok(())
}
