//! Aggregate counters from `GET /api/admin/stats`.
//!
//! Counters are only re-rendered when the fetched value differs from the
//! last displayed one.  A failed fetch shows a placeholder and forgets the
//! last value, so the next successful fetch always counts as a change.

use serde::{Deserialize, Serialize};

/// Text shown in place of a counter whose value is not known.
pub const PLACEHOLDER: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_templates: u64,
    pub total_renders: u64,
}

/// One displayed counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Counter {
    Value(u64),
    #[default]
    Unknown,
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Counter::Value(v) => write!(f, "{v}"),
            Counter::Unknown => f.write_str(PLACEHOLDER),
        }
    }
}

/// Which counters a stats update actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsChange {
    pub templates: bool,
    pub renders: bool,
}

impl StatsChange {
    pub fn any(self) -> bool {
        self.templates || self.renders
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsBoard {
    templates: Counter,
    renders: Counter,
    last: Option<Stats>,
}

impl StatsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn templates(&self) -> Counter {
        self.templates
    }

    pub fn renders(&self) -> Counter {
        self.renders
    }

    /// Last successfully displayed values, `None` after a failure.
    pub fn last(&self) -> Option<Stats> {
        self.last
    }

    /// Record a successful fetch, updating only counters whose value moved.
    pub fn apply(&mut self, stats: Stats) -> StatsChange {
        let change = StatsChange {
            templates: self.last.map_or(true, |l| l.total_templates != stats.total_templates),
            renders: self.last.map_or(true, |l| l.total_renders != stats.total_renders),
        };

        if change.templates {
            self.templates = Counter::Value(stats.total_templates);
        }
        if change.renders {
            self.renders = Counter::Value(stats.total_renders);
        }
        self.last = Some(stats);
        change
    }

    /// Record a failed fetch: both counters degrade to the placeholder.
    pub fn fail(&mut self) {
        self.templates = Counter::Unknown;
        self.renders = Counter::Unknown;
        self.last = None;
    }
}
