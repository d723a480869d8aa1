// A compiled rule file: declarations plus rules applied in order.

use std::fmt;

use shift_core::ast::Statement;
use shift_fst::{AppliedTransform, ApplyOptions};

use crate::error::{Diagnostic, RuleError};
use crate::inventory::Inventory;
use crate::machine::{CompileOptions, RuleMachine};
use crate::parser::Parser;

/// Compiled rules of one rule file.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    inventory: Inventory,
    rules: Vec<RuleMachine>,
}

impl RuleSet {
    /// Compile a rule file.
    ///
    /// Never fails as a whole: a statement that does not parse or build is
    /// reported as a [`Diagnostic`] and left out, and compilation carries
    /// on with the next statement.
    pub fn compile(source: &str, options: &CompileOptions) -> (Self, Vec<Diagnostic>) {
        let mut set = RuleSet::default();
        let mut diagnostics = Vec::new();
        let mut parser = Parser::new(source);

        while let Some(statement) = parser.parse_next() {
            let line = parser.line();
            if let Err(error) = statement.and_then(|s| set.add(s, options)) {
                let line = error.position().map_or(line, |p| p.line);
                diagnostics.push(Diagnostic { line, error });
            }
        }
        (set, diagnostics)
    }

    fn add(&mut self, statement: Statement, options: &CompileOptions) -> Result<(), RuleError> {
        match statement {
            Statement::Category(decl) => self.inventory.declare_category(&decl),
            Statement::FeatureSet(decl) => {
                self.inventory.declare_feature_set(&decl);
                Ok(())
            }
            Statement::Rule(rule) => {
                let machine = RuleMachine::compile(&rule, &self.inventory, options)?;
                self.rules.push(machine);
                Ok(())
            }
        }
    }

    pub fn rules(&self) -> &[RuleMachine] {
        &self.rules
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run `word` through every rule in declaration order.
    pub fn apply(&self, word: &str, options: &ApplyOptions) -> String {
        self.rules
            .iter()
            .fold(word.to_string(), |current, rule| rule.apply(&current, options).0)
    }

    /// Like [`apply`](Self::apply), recording what each rule did.
    pub fn trace(&self, word: &str, options: &ApplyOptions) -> WordTrace {
        let mut current = word.to_string();
        let mut rules = Vec::with_capacity(self.rules.len());
        for machine in &self.rules {
            let (output, transforms) = machine.apply(&current, options);
            rules.push(RuleTrace {
                rule: machine.rule().to_string(),
                input: current,
                output: output.clone(),
                transforms,
            });
            current = output;
        }
        WordTrace {
            word: word.to_string(),
            result: current,
            rules,
        }
    }
}

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

/// What one rule did to one word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RuleTrace {
    /// The rule in rule-file syntax.
    pub rule: String,
    pub input: String,
    pub output: String,
    pub transforms: Vec<AppliedTransform>,
}

impl RuleTrace {
    pub fn changed(&self) -> bool {
        !self.transforms.is_empty()
    }
}

/// A word's path through a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WordTrace {
    pub word: String,
    pub result: String,
    pub rules: Vec<RuleTrace>,
}

/// Verbose listing: the word, then each rule that fired with its
/// transforms indented beneath it.
impl fmt::Display for WordTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.word, self.result)?;
        for rule in self.rules.iter().filter(|r| r.changed()) {
            write!(f, "\n    {}", rule.rule)?;
            write!(f, "\n        {} → {}", rule.input, rule.output)?;
            for transform in &rule.transforms {
                write!(f, "\n            {transform}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> (RuleSet, Vec<Diagnostic>) {
        RuleSet::compile(source, &CompileOptions::default())
    }

    #[test]
    fn rules_apply_in_order() {
        let (set, diagnostics) = compile("a => e / _ #\ne => i / _ #\n");
        assert!(diagnostics.is_empty());
        assert_eq!(set.len(), 2);
        assert_eq!(set.apply("kala", &ApplyOptions::default()), "kali");
    }

    #[test]
    fn bad_statements_are_skipped() {
        let source = "a => e / _ #\n/ X / _\nb => p / _ [+nasal]\no => u / _ #\n";
        let (set, diagnostics) = compile(source);
        assert_eq!(set.len(), 2);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, 2);
        assert!(matches!(diagnostics[0].error, RuleError::Syntax { .. } | RuleError::Parse { .. }));
        assert_eq!(diagnostics[1].line, 3);
        assert_eq!(diagnostics[1].to_string(), "Line 3: Undefined feature-set 'nasal'.");
        assert_eq!(set.apply("kalo", &ApplyOptions::default()), "kalu");
    }

    #[test]
    fn cyclic_category_reported() {
        let (set, diagnostics) = compile("V { a $V }\n");
        assert!(set.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].to_string(), "Line 1: Category 'V' includes itself.");
    }

    #[test]
    fn trace_lists_changed_rules() {
        let (set, _) = compile("a => e / _ #\nx => y / _\n");
        let trace = set.trace("kala", &ApplyOptions::default());
        assert_eq!(trace.result, "kale");
        assert_eq!(trace.rules.len(), 2);
        assert!(!trace.rules[1].changed());
        assert_eq!(
            trace.to_string(),
            "kala → kale\n    a/e/_#\n        kala → kale\n            a (a) → e (e)"
        );
    }

    #[test]
    fn empty_source() {
        let (set, diagnostics) = compile("; nothing here\n\n");
        assert!(set.is_empty());
        assert!(diagnostics.is_empty());
        assert_eq!(set.apply("word", &ApplyOptions::default()), "word");
    }
}
