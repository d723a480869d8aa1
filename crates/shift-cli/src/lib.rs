// shift-cli: shared utilities for the soundshift tools.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use shift_rules::{CompileOptions, Diagnostic, RuleError, RuleSet};

/// Environment variable naming the rule file when `--rules` is absent.
pub const RULES_ENV: &str = "SOUNDSHIFT_RULES";

/// Rule file to load.
///
/// Search order:
/// 1. `path` argument (if provided)
/// 2. `SOUNDSHIFT_RULES` environment variable
pub fn resolve_rules_path(path: Option<&Path>) -> Result<PathBuf, String> {
    if let Some(p) = path {
        return Ok(p.to_path_buf());
    }
    match std::env::var(RULES_ENV) {
        Ok(p) if !p.is_empty() => Ok(PathBuf::from(p)),
        _ => Err(format!("no rule file given; pass --rules or set {RULES_ENV}")),
    }
}

pub fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))
}

/// Read a whole input file; `-` or no path reads stdin.
pub fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(p) if p != Path::new("-") => read_file(p),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(text)
        }
    }
}

/// Words of a lexicon: one per line, surrounding whitespace trimmed,
/// blank lines skipped.
pub fn lexicon_words(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// Buffered writer for `path`, or stdout when absent.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, String> {
    match path {
        Some(p) => {
            let file = fs::File::create(p)
                .map_err(|e| format!("failed to create {}: {}", p.display(), e))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Compile a rule file, printing every diagnostic to stderr.
pub fn compile_rules(source: &str, options: &CompileOptions) -> (RuleSet, usize) {
    let (set, diagnostics) = RuleSet::compile(source, options);
    for diagnostic in &diagnostics {
        eprintln!("{}", describe(diagnostic));
    }
    (set, diagnostics.len())
}

/// One diagnostic as printed on stderr.
pub fn describe(diagnostic: &Diagnostic) -> String {
    let kind = match diagnostic.error {
        RuleError::Lex { .. } => "Lex error",
        RuleError::Parse { .. } => "Parse error",
        RuleError::Syntax { .. } => "Syntax error",
        _ => "error",
    };
    format!("{kind}: {diagnostic}")
}

/// Milliseconds since `started`.
pub fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}
