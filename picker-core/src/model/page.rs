//! `src/model/page.rs`
//! ============================================================================
//! # Paging primitives
//!
//! Small value types shared by the loader, the background tasks and item
//! sources: the opaque [`Filter`], the [`Epoch`] generation counter, the
//! possibly-unknown [`Total`] and the [`PageRequest`] handed to a fetch.

use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Opaque filter token. Absent and empty are two different filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter(Option<CompactString>);

impl Filter {
    /// The filter a picker starts with before any text was typed.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn new(text: impl Into<CompactString>) -> Self {
        Self(Some(text.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.0.is_none()
    }
}

impl From<&str> for Filter {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Filter {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<Option<&str>> for Filter {
    fn from(text: Option<&str>) -> Self {
        Self(text.map(CompactString::new))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(text) => write!(f, "{text:?}"),
            None => f.write_str("<none>"),
        }
    }
}

/// Generation counter; one value per (filter, loader) generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    #[must_use]
    pub const fn first() -> Self {
        Self(1)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Best-known item count for a filter.
///
/// Sources are free to change their answer between calls; nothing here
/// assumes the count is stable or matches the sum of loaded pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Total {
    #[default]
    Unknown,

    Known(usize),
}

impl Total {
    /// Maps the classic "negative means unknown" integer convention.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        usize::try_from(raw).map_or(Self::Unknown, Self::Known)
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// `true` for a confirmed empty result set.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        matches!(self, Self::Known(0))
    }

    /// `true` only when the count is known and larger than `held`.
    #[must_use]
    pub const fn known_to_exceed(self, held: usize) -> bool {
        match self {
            Self::Known(n) => n > held,
            Self::Unknown => false,
        }
    }

    /// `true` when more items may exist beyond `held`: unknown counts
    /// always might.
    #[must_use]
    pub const fn may_exceed(self, held: usize) -> bool {
        match self {
            Self::Known(n) => n > held,
            Self::Unknown => true,
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(n) => write!(f, "{n}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// A claimed fetch: which filter, starting where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub epoch: Epoch,
    pub filter: Filter,
    pub offset: usize,
}
