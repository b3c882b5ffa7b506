//! FOLLOW-sets
//!
//! The lookahead characters that can come right after a non-terminal when
//! parsing from one start symbol. A nullable non-terminal can only derive the
//! empty string if the lookahead may follow it, so the parser uses these sets
//! to drop epsilon alternatives that are bound to fail.

use super::expr::{NonTerminal, Symbol};
use super::first::FirstCharacter;
use super::simplified::SimplifiedGrammar;
use hashbrown::{HashMap, HashSet};
use std::mem;

/// FOLLOW-sets of every non-terminal of a [`SimplifiedGrammar`].
///
/// Anything may follow the start symbol: a grammar that does not end in
/// `EOF` accepts a prefix of the input.
///
/// # Examples
///
/// ```
/// use forkparse::grammar::{FollowSets, NonTerminal, SimplifiedGrammar, SimplifiedRule, SpecialSymbol, Symbol};
///
/// let digits = NonTerminal::new("Digits");
/// let main = NonTerminal::new("Main");
/// let grammar = SimplifiedGrammar::new([
///     (main.clone(), vec![SimplifiedRule::new([Symbol::from(digits.clone()), Symbol::EndOfFile])]),
///     (digits.clone(), vec![
///         SimplifiedRule::new([Symbol::from(SpecialSymbol::digit()), Symbol::from(digits.clone())]),
///         SimplifiedRule::epsilon(),
///     ]),
/// ])?;
///
/// let follow = FollowSets::compute(&grammar, &Symbol::from(main.clone()));
/// assert!(follow.admits(&digits, None));
/// assert!(!follow.admits(&digits, Some('7')));
/// assert!(follow.admits(&main, Some('x')));
/// # Ok::<(), forkparse::GrammarError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FollowSets {
    sets: HashMap<NonTerminal, FirstCharacter>,
}

impl FollowSets {
    #[must_use]
    pub fn compute(grammar: &SimplifiedGrammar, start: &Symbol) -> Self {
        let mut direct: HashMap<&NonTerminal, FirstCharacter> = HashMap::new();
        // `inherits[b]` lists the non-terminals whose FOLLOW-set flows into `b`.
        let mut inherits: HashMap<&NonTerminal, Vec<&NonTerminal>> = HashMap::new();
        if let Symbol::NonTerminal(start) = start {
            direct.insert(start, FirstCharacter::anything());
        }
        for owner in grammar.non_terminals() {
            for rule in grammar.rules(owner).unwrap_or_default() {
                let symbols = rule.symbols();
                for (i, symbol) in symbols.iter().enumerate() {
                    let Symbol::NonTerminal(target) = symbol else {
                        continue;
                    };
                    let (first, reaches_end) = sequence_first(grammar, &symbols[i + 1..]);
                    let set = direct.entry(target).or_default();
                    *set = mem::take(set) + first;
                    if reaches_end && target != owner {
                        inherits.entry(target).or_default().push(owner);
                    }
                }
            }
        }

        let sets = grammar
            .non_terminals()
            .map(|non_terminal| {
                let mut set = FirstCharacter::empty();
                let mut seen = HashSet::new();
                let mut pending = vec![non_terminal];
                while let Some(current) = pending.pop() {
                    if !seen.insert(current) {
                        continue;
                    }
                    if let Some(own) = direct.get(current) {
                        set = set + own.clone();
                    }
                    if let Some(sources) = inherits.get(current) {
                        pending.extend(sources.iter().copied());
                    }
                }
                (non_terminal.clone(), set)
            })
            .collect();
        Self { sets }
    }

    #[must_use]
    pub fn get(&self, non_terminal: &NonTerminal) -> Option<&FirstCharacter> {
        self.sets.get(non_terminal)
    }

    /// Whether `lookahead` can follow `non_terminal`; unknown non-terminals admit everything
    #[must_use]
    pub fn admits(&self, non_terminal: &NonTerminal, lookahead: Option<char>) -> bool {
        self.sets
            .get(non_terminal)
            .is_none_or(|set| set.admits(lookahead))
    }
}

/// FIRST-set of a symbol sequence, and whether the whole sequence is nullable
fn sequence_first(grammar: &SimplifiedGrammar, symbols: &[Symbol]) -> (FirstCharacter, bool) {
    let mut first = FirstCharacter::empty();
    for symbol in symbols {
        match symbol {
            Symbol::Terminal(terminal) => return (first + FirstCharacter::from(terminal), false),
            Symbol::Special(special) => return (first + FirstCharacter::from(special), false),
            Symbol::EndOfFile => return (first + FirstCharacter::end_of_input(), false),
            Symbol::NonTerminal(non_terminal) => {
                if let Some(nested) = grammar.first_set(non_terminal) {
                    first = first + nested.clone();
                }
                if !grammar.is_nullable(non_terminal) {
                    return (first, false);
                }
            }
        }
    }
    (first, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{SimplifiedRule, SpecialSymbol, Terminal};

    fn nt(name: &str) -> NonTerminal {
        NonTerminal::new(name)
    }

    fn t(literal: &str) -> Symbol {
        Symbol::Terminal(Terminal::new(literal).unwrap())
    }

    // Main   = Expr EOF
    // Expr   = Number | '(' Expr Tail ')'
    // Tail   = '+' Expr Tail | _
    // Number = digit Digits
    // Digits = digit Digits | _
    fn sums() -> SimplifiedGrammar {
        let digit = || Symbol::from(SpecialSymbol::digit());
        SimplifiedGrammar::new([
            (nt("Main"), vec![SimplifiedRule::new([nt("Expr").into(), Symbol::EndOfFile])]),
            (
                nt("Expr"),
                vec![
                    SimplifiedRule::new([nt("Number")]),
                    SimplifiedRule::new([t("("), nt("Expr").into(), nt("Tail").into(), t(")")]),
                ],
            ),
            (
                nt("Tail"),
                vec![
                    SimplifiedRule::new([t("+"), nt("Expr").into(), nt("Tail").into()]),
                    SimplifiedRule::epsilon(),
                ],
            ),
            (nt("Number"), vec![SimplifiedRule::new([digit(), nt("Digits").into()])]),
            (
                nt("Digits"),
                vec![SimplifiedRule::new([digit(), nt("Digits").into()]), SimplifiedRule::epsilon()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_follow_flows_through_rule_ends() {
        let grammar = sums();
        let follow = FollowSets::compute(&grammar, &nt("Main").into());
        // Expr is followed by Tail's FIRST, by the ')' after Tail and by EOF.
        let expr = follow.get(&nt("Expr")).unwrap();
        assert!(expr.admits(Some('+')));
        assert!(expr.admits(Some(')')));
        assert!(expr.admits(None));
        assert!(!expr.admits(Some('1')));

        let tail = follow.get(&nt("Tail")).unwrap();
        assert!(tail.admits(Some(')')));
        assert!(!tail.admits(Some('+')));
        assert!(!tail.admits(None));

        // Number and Digits end where Expr ends.
        for name in ["Number", "Digits"] {
            assert!(follow.admits(&nt(name), Some('+')));
            assert!(!follow.admits(&nt(name), Some('7')));
        }
    }

    #[test]
    fn test_start_symbol_is_followed_by_anything() {
        let grammar = sums();
        let follow = FollowSets::compute(&grammar, &nt("Expr").into());
        for lookahead in [None, Some('x'), Some('7'), Some(')')] {
            assert!(follow.admits(&nt("Expr"), lookahead));
            assert!(follow.admits(&nt("Digits"), lookahead));
        }
        assert!(follow.admits(&nt("Unknown"), Some('?')));
    }

    #[test]
    fn test_end_of_file_follows_with_end_of_input() {
        let grammar = SimplifiedGrammar::new([
            (nt("Main"), vec![SimplifiedRule::new([nt("Digits").into(), Symbol::EndOfFile])]),
            (
                nt("Digits"),
                vec![
                    SimplifiedRule::new([Symbol::from(SpecialSymbol::digit()), nt("Digits").into()]),
                    SimplifiedRule::epsilon(),
                ],
            ),
        ])
        .unwrap();
        let follow = FollowSets::compute(&grammar, &nt("Main").into());
        assert!(follow.admits(&nt("Digits"), None));
        assert!(!follow.admits(&nt("Digits"), Some('1')));
    }
}
