// soundshift-check: Compile a rule file and report on it.
//
// Prints every diagnostic to stderr, then one line per compiled rule with
// its NFA and DFA state counts and the number of transform conflicts
// resolved while merging states. Exits with code 1 if any statement failed.
//
// Usage:
//   soundshift-check [--max-states N] [--keep-trailing-optionals] [RULES]

use std::path::PathBuf;
use std::process;

use clap::Parser;
use shift_rules::CompileOptions;

use shift_cli::{compile_rules, fatal, read_file, resolve_rules_path};

/// Check a sound-change rule file.
#[derive(Debug, Parser)]
#[command(name = "soundshift-check", version, about)]
struct Args {
    /// Rule file. Defaults to $SOUNDSHIFT_RULES.
    rules: Option<PathBuf>,

    /// Upper bound on deterministic states per rule.
    #[arg(long)]
    max_states: Option<usize>,

    /// Build optional groups at the end of an environment instead of
    /// dropping them.
    #[arg(long)]
    keep_trailing_optionals: bool,
}

fn main() {
    let args = Args::parse();

    let path = resolve_rules_path(args.rules.as_deref()).unwrap_or_else(|e| fatal(&e));
    let source = read_file(&path).unwrap_or_else(|e| fatal(&e));

    let mut options = CompileOptions {
        strip_trailing_optionals: !args.keep_trailing_optionals,
        ..CompileOptions::default()
    };
    if let Some(max) = args.max_states {
        options.max_states = max;
    }

    let (set, failed) = compile_rules(&source, &options);
    for (i, machine) in set.rules().iter().enumerate() {
        println!(
            "{:>3}  {:<32} nfa={:<5} dfa={:<5} conflicts={}",
            i + 1,
            machine.to_string(),
            machine.nfa_state_count(),
            machine.dfa_state_count(),
            machine.conflicts()
        );
    }
    println!("{} rules compiled, {} statements failed", set.len(), failed);

    if failed > 0 {
        process::exit(1);
    }
}
