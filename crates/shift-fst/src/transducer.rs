// Transducer runtime: rewrite a word with a determinized rule.
//
// Matching is leftmost-longest. From each position the table is walked as
// far as it goes and the longest walk ending in a final state sets the match
// span. Output for the span is settled on one accepting path through the
// source NFA, so a symbol read by the environment never fires a transform
// that belongs to a target path over the same symbol. A position with no
// match keeps its literal input. After a match, scanning resumes past the
// whole span, context included, unless `rescan_context` is set.

use hashbrown::HashSet;

use shift_core::character::is_modifier;
use shift_core::symbol::Symbol;

use crate::determinize::Dfa;
use crate::nfa::{ERROR, START};
use crate::state::StateId;
use crate::transform::{AppliedTransform, TransformId, TransformKind};

/// Runtime options for [`Dfa::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Never end a match right before a diacritic or modifier letter: the
    /// modifier belongs to the segment just matched (`tʰ` is not `t`).
    pub modifier_continuation: bool,
    /// Resume scanning right after the last target symbol instead of after
    /// the right context, so one match's context can be the next match's
    /// target. `a => b / _ a` turns "aaa" into "baa" without it and "bba"
    /// with it.
    pub rescan_context: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            modifier_continuation: true,
            rescan_context: false,
        }
    }
}

/// One edge of an accepting NFA path, taken out of `from` at input index
/// `at`. LAMBDA steps consume nothing.
#[derive(Debug, Clone, Copy)]
struct Step {
    from: StateId,
    symbol: Symbol,
    at: usize,
}

/// Output accumulated along an accepting path.
#[derive(Debug, Clone, Default)]
struct Progress {
    buffer: String,
    applied: Vec<AppliedTransform>,
    /// Input consumed by null transforms, not yet attributed.
    pending: String,
    pending_rule: Option<TransformId>,
    /// Index just past the last target symbol consumed.
    target_end: Option<usize>,
    /// Length of `buffer` when `target_end` was last set.
    target_len: usize,
}

/// A completed match starting at some position.
#[derive(Debug)]
struct Match {
    end: usize,
    output: String,
    applied: Vec<AppliedTransform>,
}

impl Dfa {
    /// Rewrite `word`, returning the result and the transformations
    /// committed, in application order.
    pub fn apply(&self, word: &str, options: &ApplyOptions) -> (String, Vec<AppliedTransform>) {
        let symbols = Symbol::coat(word);
        let mut output = String::with_capacity(word.len());
        let mut applied = Vec::new();
        let mut i = 0;
        while i < symbols.len() {
            if let Some(found) = self.match_at(&symbols, i, options) {
                output.push_str(&found.output);
                applied.extend(found.applied);
                i = found.end;
                continue;
            }
            if let Some(c) = symbols[i].as_char() {
                output.push(c);
            }
            i += 1;
        }
        (output, applied)
    }

    /// Longest match starting at `start`, if any.
    fn match_at(&self, symbols: &[Symbol], start: usize, options: &ApplyOptions) -> Option<Match> {
        let end = self.longest_end(symbols, start, options)?;
        let path = self.accepting_path(symbols, start, end)?;
        let mut progress = self.emit(&path);
        let target_end = progress.target_end.filter(|&t| t > start)?;
        if options.rescan_context {
            progress.buffer.truncate(progress.target_len);
            return Some(Match {
                end: target_end,
                output: progress.buffer,
                applied: progress.applied,
            });
        }
        Some(Match {
            end,
            output: progress.buffer,
            applied: progress.applied,
        })
    }

    /// End of the longest walk from `start` that stops in a final state.
    fn longest_end(&self, symbols: &[Symbol], start: usize, options: &ApplyOptions) -> Option<usize> {
        let mut state: StateId = self.start();
        let mut best = None;
        for (j, &symbol) in symbols.iter().enumerate().skip(start) {
            let Some(next) = self.next(state, symbol) else {
                break;
            };
            state = next;
            if !self.is_final(state) {
                continue;
            }
            let continued = options.modifier_continuation
                && symbols
                    .get(j + 1)
                    .and_then(|s| s.as_char())
                    .is_some_and(is_modifier);
            if !continued {
                best = Some(j + 1);
            }
        }
        best
    }

    // -----------------------------------------------------------------------
    // Path search
    // -----------------------------------------------------------------------

    /// An NFA path from START that reads exactly `symbols[start..end]` and
    /// stops in a final state.
    ///
    /// Edges are tried in insertion order, which puts an optional's content
    /// before its bypass, earlier disjunction branches first, and a longer
    /// set member before a shorter one.
    fn accepting_path(&self, symbols: &[Symbol], start: usize, end: usize) -> Option<Vec<Step>> {
        let mut path = Vec::new();
        let mut tried = HashSet::new();
        self.search(START, start, &symbols[..end], &mut path, &mut tried)
            .then_some(path)
    }

    fn search(
        &self,
        state: StateId,
        at: usize,
        symbols: &[Symbol],
        path: &mut Vec<Step>,
        tried: &mut HashSet<(StateId, usize)>,
    ) -> bool {
        let nfa = self.nfa();
        if at == symbols.len() && nfa.is_final(state) {
            return true;
        }
        if !tried.insert((state, at)) {
            return false;
        }
        let ahead = symbols.get(at).copied();
        let edges = nfa.edges(state);
        // A disjunction guard: the next symbol cannot start any branch.
        if ahead.is_some_and(|s| edges.contains(&(s, ERROR))) {
            return false;
        }
        for &(symbol, to) in edges {
            if to == ERROR {
                continue;
            }
            let after = if symbol == Symbol::Lambda {
                at
            } else if Some(symbol) == ahead {
                at + 1
            } else {
                continue;
            };
            path.push(Step {
                from: state,
                symbol,
                at,
            });
            if self.search(to, after, symbols, path, tried) {
                return true;
            }
            path.pop();
        }
        false
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Replay `path`, firing the transforms on its edges.
    ///
    /// A default transform fires when the path leaves its state by a LAMBDA
    /// edge: the prefix member ended there.
    fn emit(&self, path: &[Step]) -> Progress {
        let nfa = self.nfa();
        let mut progress = Progress::default();
        for step in path {
            if step.symbol == Symbol::Lambda {
                if let Some(default) = nfa.default_transform(step.from) {
                    self.fire_default(&mut progress, default, step.at);
                }
                continue;
            }
            match nfa.edge_transform(step.from, step.symbol) {
                Some(id) => self.fire_edge(&mut progress, id, step.symbol, step.at),
                None => {
                    self.flush_deletion(&mut progress);
                    if let Some(c) = step.symbol.as_char() {
                        progress.buffer.push(c);
                    }
                }
            }
        }
        self.flush_deletion(&mut progress);
        progress
    }

    /// Emit a default transform, ending its unit before position `at`.
    fn fire_default(&self, progress: &mut Progress, id: TransformId, at: usize) {
        let Some(rule) = self.transform(id) else {
            return;
        };
        self.settle(progress, rule.unit);
        let from = std::mem::take(&mut progress.pending);
        progress.pending_rule = None;
        progress.buffer.push_str(&rule.replacement);
        progress.applied.push(rule.applied(from));
        progress.target_end = Some(at);
        progress.target_len = progress.buffer.len();
    }

    fn fire_edge(&self, progress: &mut Progress, id: TransformId, symbol: Symbol, at: usize) {
        let Some(rule) = self.transform(id) else {
            return;
        };
        self.settle(progress, rule.unit);
        match rule.kind {
            TransformKind::Ordinary => {
                let mut from = std::mem::take(&mut progress.pending);
                from.extend(symbol.as_char());
                progress.pending_rule = None;
                progress.buffer.push_str(&rule.replacement);
                progress.applied.push(rule.applied(from));
            }
            TransformKind::Null => {
                progress.pending.extend(symbol.as_char());
                progress.pending_rule = Some(id);
            }
        }
        progress.target_end = Some(at + 1);
        progress.target_len = progress.buffer.len();
    }

    /// Pending input of another unit was deleted.
    fn settle(&self, progress: &mut Progress, unit: u32) {
        let other = progress
            .pending_rule
            .and_then(|id| self.transform(id))
            .is_some_and(|rule| rule.unit != unit);
        if other {
            self.flush_deletion(progress);
        }
    }

    /// Record pending null-transformed input as a deletion.
    fn flush_deletion(&self, progress: &mut Progress) {
        if progress.pending.is_empty() {
            return;
        }
        let from = std::mem::take(&mut progress.pending);
        if let Some(rule) = progress.pending_rule.take().and_then(|id| self.transform(id)) {
            let mut deleted = rule.applied(from);
            deleted.replacement.clear();
            progress.applied.push(deleted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinize::determinize;
    use crate::nfa::{Nfa, START};
    use crate::transform::TransformRule;

    fn ch(c: char) -> Symbol {
        Symbol::Char(c)
    }

    fn run(nfa: &Nfa, word: &str) -> String {
        let dfa = determinize(nfa, 1000).unwrap();
        dfa.apply(word, &ApplyOptions::default()).0
    }

    /// a -> e before the end of the word.
    fn final_a() -> Nfa {
        let mut nfa = Nfa::new();
        let (s1, s2) = (nfa.add_state(true), nfa.add_state(false));
        let e = nfa.add_transform(TransformRule::ordinary("e", "a", "e", 0));
        nfa.add_edge(START, ch('a'), s1);
        nfa.attach(START, ch('a'), e);
        nfa.add_edge(s1, Symbol::End, s2);
        nfa.set_final(s2);
        nfa
    }

    /// {t, ts} -> x anywhere.
    fn affricate() -> Nfa {
        let mut nfa = Nfa::new();
        let (t, exit) = (nfa.add_state(true), nfa.add_state(true));
        let null = nfa.add_transform(TransformRule::null("[T]", "x", 0));
        let x = nfa.add_transform(TransformRule::ordinary("x", "[T]", "x", 0));
        nfa.add_edge(START, ch('t'), t);
        nfa.attach(START, ch('t'), null);
        nfa.add_edge(t, ch('s'), exit);
        nfa.attach(t, ch('s'), x);
        nfa.add_epsilon(t, exit);
        nfa.attach_default(t, x);
        nfa.set_final(exit);
        nfa
    }

    #[test]
    fn word_final_replacement() {
        let nfa = final_a();
        assert_eq!(run(&nfa, "kala"), "kale");
        assert_eq!(run(&nfa, "kalo"), "kalo");
        assert_eq!(run(&nfa, ""), "");
    }

    #[test]
    fn applied_records_literal() {
        let dfa = determinize(&final_a(), 100).unwrap();
        let (out, applied) = dfa.apply("kala", &ApplyOptions::default());
        assert_eq!(out, "kale");
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].to_string(), "a (a) \u{2192} e (e)");
    }

    #[test]
    fn longest_member_wins() {
        let nfa = affricate();
        assert_eq!(run(&nfa, "tsa"), "xa");
        assert_eq!(run(&nfa, "ta"), "xa");
        assert_eq!(run(&nfa, "at"), "ax");
        assert_eq!(run(&nfa, "sat"), "sax");
    }

    #[test]
    fn prefix_member_records_its_own_literal() {
        let dfa = determinize(&affricate(), 100).unwrap();
        let (_, applied) = dfa.apply("tat", &ApplyOptions::default());
        let froms: Vec<&str> = applied.iter().map(|a| a.from_literal.as_str()).collect();
        assert_eq!(froms, vec!["t", "t"]);
        let (_, applied) = dfa.apply("ts", &ApplyOptions::default());
        assert_eq!(applied[0].from_literal, "ts");
    }

    #[test]
    fn modifier_continues_segment() {
        let mut nfa = Nfa::new();
        let s1 = nfa.add_state(true);
        let x = nfa.add_transform(TransformRule::ordinary("x", "t", "x", 0));
        nfa.add_edge(START, ch('t'), s1);
        nfa.attach(START, ch('t'), x);
        nfa.set_final(s1);
        let dfa = determinize(&nfa, 100).unwrap();

        let on = ApplyOptions::default();
        let off = ApplyOptions {
            modifier_continuation: false,
            ..ApplyOptions::default()
        };
        assert_eq!(dfa.apply("t\u{02B0}a", &on).0, "t\u{02B0}a");
        assert_eq!(dfa.apply("t\u{02B0}a", &off).0, "x\u{02B0}a");
        assert_eq!(dfa.apply("ta", &on).0, "xa");
    }

    #[test]
    fn failed_walk_rolls_back() {
        // ab -> X
        let mut nfa = Nfa::new();
        let (s1, s2) = (nfa.add_state(true), nfa.add_state(true));
        let null = nfa.add_transform(TransformRule::null("ab", "X", 0));
        let x = nfa.add_transform(TransformRule::ordinary("X", "ab", "X", 0));
        nfa.add_edge(START, ch('a'), s1);
        nfa.attach(START, ch('a'), null);
        nfa.add_edge(s1, ch('b'), s2);
        nfa.attach(s1, ch('b'), x);
        nfa.set_final(s2);
        assert_eq!(run(&nfa, "ac"), "ac");
        assert_eq!(run(&nfa, "aab"), "aX");
        assert_eq!(run(&nfa, "abab"), "XX");
    }

    #[test]
    fn deletion_is_traced() {
        // a -> nothing before b
        let mut nfa = Nfa::new();
        let (s1, s2) = (nfa.add_state(true), nfa.add_state(false));
        let null = nfa.add_transform(TransformRule::null("a", "", 0));
        nfa.add_edge(START, ch('a'), s1);
        nfa.attach(START, ch('a'), null);
        nfa.add_edge(s1, ch('b'), s2);
        nfa.set_final(s2);
        let dfa = determinize(&nfa, 100).unwrap();
        let (out, applied) = dfa.apply("cab", &ApplyOptions::default());
        assert_eq!(out, "cb");
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].from_literal, "a");
        assert!(applied[0].replacement.is_empty());
    }

    /// a -> b before a
    fn a_before_a() -> Nfa {
        let mut nfa = Nfa::new();
        let (s1, s2) = (nfa.add_state(true), nfa.add_state(false));
        let b = nfa.add_transform(TransformRule::ordinary("b", "a", "b", 0));
        nfa.add_edge(START, ch('a'), s1);
        nfa.attach(START, ch('a'), b);
        nfa.add_edge(s1, ch('a'), s2);
        nfa.set_final(s2);
        nfa
    }

    #[test]
    fn right_context_is_consumed() {
        let nfa = a_before_a();
        assert_eq!(run(&nfa, "aaa"), "baa");
        assert_eq!(run(&nfa, "aaaa"), "baba");
        assert_eq!(run(&nfa, "aab"), "bab");
    }

    #[test]
    fn right_context_rescanned_on_request() {
        let dfa = determinize(&a_before_a(), 100).unwrap();
        let rescan = ApplyOptions {
            rescan_context: true,
            ..ApplyOptions::default()
        };
        let (out, applied) = dfa.apply("aaa", &rescan);
        assert_eq!(out, "bba");
        assert_eq!(applied.len(), 2);
    }

    /// {t, ts} -> x before s. The target's "ts" and the context's "s" share
    /// a symbol after "t".
    fn affricate_before_s() -> Nfa {
        let mut nfa = Nfa::new();
        let (t, exit, env) = (nfa.add_state(true), nfa.add_state(true), nfa.add_state(false));
        let null = nfa.add_transform(TransformRule::null("[T]", "x", 0));
        let x = nfa.add_transform(TransformRule::ordinary("x", "[T]", "x", 0));
        nfa.add_edge(START, ch('t'), t);
        nfa.attach(START, ch('t'), null);
        nfa.add_edge(t, ch('s'), exit);
        nfa.attach(t, ch('s'), x);
        nfa.add_epsilon(t, exit);
        nfa.attach_default(t, x);
        nfa.add_edge(exit, ch('s'), env);
        nfa.set_final(env);
        nfa
    }

    #[test]
    fn context_symbol_does_not_fire_target_transform() {
        let dfa = determinize(&affricate_before_s(), 100).unwrap();
        let (out, applied) = dfa.apply("ts", &ApplyOptions::default());
        assert_eq!(out, "xs");
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].from_literal, "t");
        assert_eq!(dfa.apply("tsa", &ApplyOptions::default()).0, "xsa");
        assert_eq!(dfa.apply("tss", &ApplyOptions::default()).0, "xs");
    }
}
