//! Pass/fail rollups over the catalog tree.
//!
//! Nothing here is stored: every snapshot is derived from the current
//! [`ResultStore`], so a rollup can never drift from the recorded results.
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::catalog::{Catalog, CatalogNode, NodeKind};
use crate::status::TestStatus;
use crate::store::ResultStore;

/// Counts for one subtree at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub partial: usize,
}

impl ScoreSnapshot {
    /// Snapshot of a single leaf.
    #[must_use]
    pub const fn leaf(status: TestStatus) -> Self {
        Self {
            total: 1,
            passed: matches!(status, TestStatus::Pass) as usize,
            failed: matches!(status, TestStatus::Fail) as usize,
            partial: matches!(status, TestStatus::Partial) as usize,
        }
    }

    #[must_use]
    pub const fn tested(&self) -> usize {
        self.passed + self.failed + self.partial
    }

    #[must_use]
    pub const fn untested(&self) -> usize {
        self.total.saturating_sub(self.tested())
    }

    /// `round(passed / total * 100)`, or 0 for an empty subtree.
    #[must_use]
    pub const fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        // Half-up integer rounding of passed * 100 / total.
        let pct = (self.passed * 200 + self.total) / (self.total * 2);
        pct as u32
    }
}

impl Add for ScoreSnapshot {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total: self.total + rhs.total,
            passed: self.passed + rhs.passed,
            failed: self.failed + rhs.failed,
            partial: self.partial + rhs.partial,
        }
    }
}

impl AddAssign for ScoreSnapshot {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ScoreSnapshot {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Rollup for one node plus its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeScore {
    pub id: String,
    pub title: String,
    pub kind: NodeKind,
    pub score: ScoreSnapshot,
    pub percentage: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeScore>,
}

impl NodeScore {
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&NodeScore> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Full rollup tree for a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub revision: u64,
    pub root: NodeScore,
}

impl Scorecard {
    #[must_use]
    pub const fn overall(&self) -> ScoreSnapshot {
        self.root.score
    }

    #[must_use]
    pub fn tabs(&self) -> &[NodeScore] {
        &self.root.children
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&NodeScore> {
        self.root.find(id)
    }
}

/// Read-only view computing snapshots from a borrowed store.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregator<'a> {
    store: &'a ResultStore,
}

impl<'a> ScoreAggregator<'a> {
    #[must_use]
    pub const fn new(store: &'a ResultStore) -> Self {
        Self { store }
    }

    /// Snapshot over an arbitrary id list (ids absent from the store count as untested).
    pub fn score_ids<I, S>(&self, ids: I) -> ScoreSnapshot
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .map(|id| ScoreSnapshot::leaf(self.store.status(id.as_ref())))
            .sum()
    }

    /// Snapshot for `node`, linear in its leaf count.
    #[must_use]
    pub fn score_node(&self, node: &CatalogNode) -> ScoreSnapshot {
        let own = self.score_ids(node.tests.iter().map(|t| t.id.as_str()));
        own + node
            .children
            .iter()
            .map(|child| self.score_node(child))
            .sum::<ScoreSnapshot>()
    }

    /// Rollup tree built bottom-up so every parent is the sum of its parts.
    #[must_use]
    pub fn node_score(&self, node: &CatalogNode) -> NodeScore {
        let children: Vec<NodeScore> = node
            .children
            .iter()
            .map(|child| self.node_score(child))
            .collect();
        let score = self.score_ids(node.tests.iter().map(|t| t.id.as_str()))
            + children.iter().map(|c| c.score).sum::<ScoreSnapshot>();
        NodeScore {
            id: node.id.clone(),
            title: node.title.clone(),
            kind: node.kind,
            score,
            percentage: score.percentage(),
            children,
        }
    }

    #[must_use]
    pub fn scorecard(&self, catalog: &Catalog) -> Scorecard {
        Scorecard {
            revision: self.store.revision(),
            root: self.node_score(&catalog.root),
        }
    }
}

/// Scorecard memoised on the store's revision counter.
///
/// A cache is bound to one store and one catalog; call [`ScoreCache::invalidate`]
/// before reusing it with a different pair.
#[derive(Debug, Clone, Default)]
pub struct ScoreCache {
    cached: Option<Scorecard>,
}

impl ScoreCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached scorecard, recomputed whenever `store` has changed since the last call.
    pub fn scorecard(&mut self, catalog: &Catalog, store: &ResultStore) -> &Scorecard {
        let fresh = self
            .cached
            .as_ref()
            .is_some_and(|card| card.revision == store.revision());
        if !fresh {
            log::debug!("recomputing scorecard at revision {}", store.revision());
            self.cached = Some(ScoreAggregator::new(store).scorecard(catalog));
        }
        self.cached
            .get_or_insert_with(|| ScoreAggregator::new(store).scorecard(catalog))
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
