//! FIRST-sets
//!
//! A [`FirstCharacter`] describes which lookahead characters can start a rule.
//! Character classes are predicates, so a FIRST-set cannot always be listed
//! explicitly; it is either a whitelist or a blacklist, each combining an
//! explicit character set with an optional predicate.

use super::expr::{CharPredicate, SpecialSymbol, Terminal};
use hashbrown::HashSet;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::Arc;

/// Set of lookahead characters; `None` stands for end of input
pub type CharSet = HashSet<Option<char>>;

/// FIRST-set of a rule or non-terminal.
///
/// A missing `filter` is the constant `false` predicate.
#[derive(Clone)]
pub enum FirstCharacter {
    /// Admits a character iff it is in `chars` or the filter holds
    WhiteList {
        chars: CharSet,
        filter: Option<CharPredicate>,
    },
    /// Admits a character iff it is neither in `chars` nor accepted by the filter
    BlackList {
        chars: CharSet,
        filter: Option<CharPredicate>,
    },
}

fn test(filter: Option<&CharPredicate>, c: Option<char>) -> bool {
    filter.is_some_and(|f| f(c))
}

impl FirstCharacter {
    /// The FIRST-set admitting nothing
    #[must_use]
    pub fn empty() -> Self {
        Self::WhiteList {
            chars: CharSet::new(),
            filter: None,
        }
    }

    /// The FIRST-set admitting everything, end of input included
    #[must_use]
    pub fn anything() -> Self {
        Self::BlackList {
            chars: CharSet::new(),
            filter: None,
        }
    }

    /// The FIRST-set admitting exactly one character
    #[must_use]
    pub fn char(c: char) -> Self {
        Self::WhiteList {
            chars: std::iter::once(Some(c)).collect(),
            filter: None,
        }
    }

    /// The FIRST-set admitting only end of input
    #[must_use]
    pub fn end_of_input() -> Self {
        Self::WhiteList {
            chars: std::iter::once(None).collect(),
            filter: None,
        }
    }

    /// The FIRST-set admitting whatever `filter` accepts
    #[must_use]
    pub fn predicate(filter: CharPredicate) -> Self {
        Self::WhiteList {
            chars: CharSet::new(),
            filter: Some(filter),
        }
    }

    /// Whether `lookahead` can start a string described by this set
    #[must_use]
    pub fn admits(&self, lookahead: Option<char>) -> bool {
        match self {
            Self::WhiteList { chars, filter } => {
                chars.contains(&lookahead) || test(filter.as_ref(), lookahead)
            }
            Self::BlackList { chars, filter } => {
                !(chars.contains(&lookahead) || test(filter.as_ref(), lookahead))
            }
        }
    }

    #[must_use]
    pub const fn is_whitelist(&self) -> bool {
        matches!(self, Self::WhiteList { .. })
    }

    /// Whether this set certainly admits nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::WhiteList { chars, filter: None } if chars.is_empty())
    }

    fn union_white(
        a: CharSet,
        fa: Option<CharPredicate>,
        b: CharSet,
        fb: Option<CharPredicate>,
    ) -> Self {
        let mut chars = a;
        chars.extend(b);
        let filter = match (fa, fb) {
            (None, f) | (f, None) => f,
            (Some(fa), Some(fb)) => {
                Some(Arc::new(move |c: Option<char>| fa(c) || fb(c)) as CharPredicate)
            }
        };
        Self::WhiteList { chars, filter }
    }

    fn union_black(
        a: CharSet,
        fa: Option<CharPredicate>,
        b: CharSet,
        fb: Option<CharPredicate>,
    ) -> Self {
        // Excluded iff both sides exclude.
        let mut chars: CharSet = a
            .iter()
            .filter(|c| b.contains(*c) || test(fb.as_ref(), **c))
            .copied()
            .collect();
        chars.extend(b.iter().filter(|c| test(fa.as_ref(), **c)).copied());
        let filter = match (fa, fb) {
            (Some(fa), Some(fb)) => {
                Some(Arc::new(move |c: Option<char>| fa(c) && fb(c)) as CharPredicate)
            }
            _ => None,
        };
        Self::BlackList { chars, filter }
    }

    fn union_mixed(
        white: CharSet,
        white_filter: Option<CharPredicate>,
        black: CharSet,
        black_filter: Option<CharPredicate>,
    ) -> Self {
        // Excluded iff the blacklist excludes and the whitelist does not admit.
        let chars = black
            .into_iter()
            .filter(|c| !white.contains(c) && !test(white_filter.as_ref(), *c))
            .collect();
        let filter = black_filter.map(|black_filter| {
            Arc::new(move |c: Option<char>| {
                black_filter(c) && !white.contains(&c) && !test(white_filter.as_ref(), c)
            }) as CharPredicate
        });
        Self::BlackList { chars, filter }
    }
}

impl Default for FirstCharacter {
    fn default() -> Self {
        Self::empty()
    }
}

impl Add for FirstCharacter {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::WhiteList { chars: a, filter: fa }, Self::WhiteList { chars: b, filter: fb }) => {
                Self::union_white(a, fa, b, fb)
            }
            (Self::BlackList { chars: a, filter: fa }, Self::BlackList { chars: b, filter: fb }) => {
                Self::union_black(a, fa, b, fb)
            }
            (Self::WhiteList { chars: w, filter: fw }, Self::BlackList { chars: b, filter: fb })
            | (Self::BlackList { chars: b, filter: fb }, Self::WhiteList { chars: w, filter: fw }) => {
                Self::union_mixed(w, fw, b, fb)
            }
        }
    }
}

impl Sum for FirstCharacter {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::empty(), Add::add)
    }
}

impl From<&Terminal> for FirstCharacter {
    fn from(terminal: &Terminal) -> Self {
        Self::char(terminal.first_char())
    }
}

impl From<&SpecialSymbol> for FirstCharacter {
    fn from(symbol: &SpecialSymbol) -> Self {
        let symbol = symbol.clone();
        Self::predicate(Arc::new(move |c: Option<char>| symbol.matches(c)))
    }
}

impl fmt::Debug for FirstCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, chars, filter) = match self {
            Self::WhiteList { chars, filter } => ("WhiteList", chars, filter),
            Self::BlackList { chars, filter } => ("BlackList", chars, filter),
        };
        let mut listed: Vec<_> = chars.iter().collect();
        listed.sort_unstable();
        f.debug_struct(name)
            .field("chars", &listed)
            .field("filter", &filter.is_some())
            .finish()
    }
}
