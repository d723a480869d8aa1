// soundshift: Apply a sound-change rule file to a lexicon.
//
// Reads words (one per line) and writes each word after running it through
// every rule in order. Diagnostics and timings go to stderr.
//
// Usage:
//   soundshift --rules RULES [--lexicon WORDS] [--output OUT] [--verbose | --json]

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use shift_rules::{ApplyOptions, CompileOptions, RuleSet};

use shift_cli::{compile_rules, elapsed_ms, fatal, lexicon_words, open_output, read_file, read_input};

/// Apply sound-change rules to a lexicon.
#[derive(Debug, Parser)]
#[command(name = "soundshift", version, about)]
struct Args {
    /// Rule file. Defaults to $SOUNDSHIFT_RULES.
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Lexicon, one word per line. `-` or absent reads stdin.
    #[arg(short, long)]
    lexicon: Option<PathBuf>,

    /// Output file. Absent writes stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show each rule that changed a word, with its transforms.
    #[arg(short, long)]
    verbose: bool,

    /// Write one JSON trace per word.
    #[arg(long, conflicts_with = "verbose")]
    json: bool,

    /// Allow a match to end right before a diacritic or modifier letter.
    #[arg(long)]
    no_modifier_continuation: bool,

    /// Resume after each match's target, so its right context can start
    /// the next match.
    #[arg(long)]
    rescan_context: bool,
}

fn main() {
    let args = Args::parse();

    let rules_path =
        shift_cli::resolve_rules_path(args.rules.as_deref()).unwrap_or_else(|e| fatal(&e));
    let source = read_file(&rules_path).unwrap_or_else(|e| fatal(&e));

    let started = Instant::now();
    let (set, _) = compile_rules(&source, &CompileOptions::default());
    eprintln!("Parsed {} rules in {:.2} ms", set.len(), elapsed_ms(started));
    if args.verbose {
        for machine in set.rules().iter().filter(|m| m.conflicts() > 0) {
            eprintln!(
                "warning: {machine}: {} transform conflicts resolved while merging states",
                machine.conflicts()
            );
        }
    }

    let lexicon = read_input(args.lexicon.as_deref()).unwrap_or_else(|e| fatal(&e));
    let words = lexicon_words(&lexicon);
    let options = ApplyOptions {
        modifier_continuation: !args.no_modifier_continuation,
        rescan_context: args.rescan_context,
    };
    let mut out = open_output(args.output.as_deref()).unwrap_or_else(|e| fatal(&e));

    let started = Instant::now();
    for word in &words {
        if let Err(e) = write_word(&mut out, &set, word, &options, &args) {
            fatal(&format!("failed to write output: {e}"));
        }
    }
    if let Err(e) = out.flush() {
        fatal(&format!("failed to write output: {e}"));
    }
    eprintln!("Transformed {} words in {:.2} ms", words.len(), elapsed_ms(started));
}

fn write_word(
    out: &mut dyn Write,
    set: &RuleSet,
    word: &str,
    options: &ApplyOptions,
    args: &Args,
) -> io::Result<()> {
    if args.json {
        serde_json::to_writer(&mut *out, &set.trace(word, options))?;
        writeln!(out)
    } else if args.verbose {
        writeln!(out, "{}", set.trace(word, options))
    } else {
        writeln!(out, "{}", set.apply(word, options))
    }
}
