//! Status markers
//!
//! A marker is three symbols, one per reason slot:
//!
//! - self: the file itself (missing output, edited source)
//! - external: upstream documents whose rendered output feeds this one
//! - internal: plain resource files the document reads
//!
//! Symbols are totally ordered by priority and every slot holds the
//! strongest symbol among the candidates found for it.

use std::fmt;

use serde::{Serialize, Serializer};

/// One marker symbol, declared from lowest to highest priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Symbol {
    /// `' '` nothing to do
    #[default]
    Current,
    /// `-` only the presentation page needs regenerating
    PresentOnly,
    /// `*` scheduled by the planner for no reason this engine can see
    Unexplained,
    /// `u` an upstream output was already refreshed
    UpstreamUpdated,
    /// `e` an upstream document must still execute
    UpstreamPending,
    /// `s` newer than its rendered output
    Stale,
    /// `m` rendered output does not exist
    ArtifactMissing,
    /// `?` file not found
    Missing,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Current => ' ',
            Symbol::PresentOnly => '-',
            Symbol::Unexplained => '*',
            Symbol::UpstreamUpdated => 'u',
            Symbol::UpstreamPending => 'e',
            Symbol::Stale => 's',
            Symbol::ArtifactMissing => 'm',
            Symbol::Missing => '?',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            ' ' => Symbol::Current,
            '-' => Symbol::PresentOnly,
            '*' => Symbol::Unexplained,
            'u' => Symbol::UpstreamUpdated,
            'e' => Symbol::UpstreamPending,
            's' => Symbol::Stale,
            'm' => Symbol::ArtifactMissing,
            '?' => Symbol::Missing,
            _ => return None,
        })
    }

    /// Highest-priority symbol of the candidates (`Current` if none)
    pub fn strongest(candidates: impl IntoIterator<Item = Symbol>) -> Symbol {
        candidates.into_iter().max().unwrap_or_default()
    }
}

/// Three-slot classification of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Marker {
    pub own: Symbol,
    pub external: Symbol,
    pub internal: Symbol,
}

impl Marker {
    pub const CURRENT: Marker = Marker::uniform(Symbol::Current);
    pub const MISSING: Marker = Marker::uniform(Symbol::Missing);
    pub const PRESENT_ONLY: Marker = Marker::uniform(Symbol::PresentOnly);

    pub const fn new(own: Symbol, external: Symbol, internal: Symbol) -> Self {
        Self {
            own,
            external,
            internal,
        }
    }

    const fn uniform(symbol: Symbol) -> Self {
        Self::new(symbol, symbol, symbol)
    }

    /// Builds a marker from slot candidates, filling blank slots with `-`
    /// when any slot is set
    pub fn reduce(
        own: impl IntoIterator<Item = Symbol>,
        external: impl IntoIterator<Item = Symbol>,
        internal: impl IntoIterator<Item = Symbol>,
    ) -> Self {
        Self::new(
            Symbol::strongest(own),
            Symbol::strongest(external),
            Symbol::strongest(internal),
        )
        .filled()
    }

    /// Replaces blank slots with `-` unless the whole marker is blank
    pub fn filled(self) -> Self {
        if self.is_current() {
            return self;
        }
        let fill = |s: Symbol| if s == Symbol::Current { Symbol::PresentOnly } else { s };
        Self::new(fill(self.own), fill(self.external), fill(self.internal))
    }

    pub fn slots(&self) -> [Symbol; 3] {
        [self.own, self.external, self.internal]
    }

    /// `"   "` nothing to do
    pub fn is_current(&self) -> bool {
        *self == Self::CURRENT
    }

    /// `"???"` file not found
    pub fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }

    /// `"---"` presentation only
    pub fn is_present_only(&self) -> bool {
        *self == Self::PRESENT_ONLY
    }

    /// Needs execution: anything but blank or `---`
    pub fn needs_execution(&self) -> bool {
        !self.is_current() && !self.is_present_only()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.slots() {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Marker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<Symbol> = s
            .chars()
            .map(|c| Symbol::from_char(c).ok_or_else(|| format!("Unknown marker symbol '{}'", c)))
            .collect::<Result<_, _>>()?;
        match symbols.as_slice() {
            [own, external, internal] => Ok(Self::new(*own, *external, *internal)),
            _ => Err(format!("Marker must have 3 symbols, got '{}'", s)),
        }
    }
}

impl Serialize for Marker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
