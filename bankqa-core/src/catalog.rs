//! Static test catalog: tabs, components and categories down to test leaves.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::player::Scenario;
use crate::status::{TestId, TestStatus, ToggleVariant};

/// Grouping level of a catalog node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Application,
    Tab,
    Component,
    Category,
}

/// A single test scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: TestId,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
    #[serde(default)]
    pub variant: ToggleVariant,
    /// Terminal status produced when the scenario is played back
    #[serde(default = "default_outcome")]
    pub outcome: TestStatus,
}

fn default_outcome() -> TestStatus {
    TestStatus::Pass
}

impl TestCase {
    #[must_use]
    pub fn new(id: impl Into<TestId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            steps: Vec::new(),
            expected: None,
            actual: None,
            variant: ToggleVariant::Binary,
            outcome: TestStatus::Pass,
        }
    }

    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    #[must_use]
    pub const fn with_variant(mut self, variant: ToggleVariant) -> Self {
        self.variant = variant;
        self
    }

    #[must_use]
    pub const fn with_outcome(mut self, outcome: TestStatus) -> Self {
        self.outcome = outcome;
        self
    }

    /// Playback fixture for this test.
    #[must_use]
    pub fn scenario(&self) -> Scenario {
        Scenario {
            test_id: self.id.clone(),
            label: self.title.clone(),
            steps: self.steps.clone(),
            terminal_status: self.outcome,
        }
    }
}

/// Named group in the catalog tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogNode {
    pub id: String,
    pub title: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<CatalogNode>,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

impl CatalogNode {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            children: Vec::new(),
            tests: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: CatalogNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_test(mut self, test: TestCase) -> Self {
        self.tests.push(test);
        self
    }

    /// Cross-environment grid: one component per row, one ternary test per
    /// `(row, column)` pair keyed `"{row}-{column}"`.
    #[must_use]
    pub fn matrix(
        id: impl Into<String>,
        title: impl Into<String>,
        rows: &[(&str, &str)],
        columns: &[&str],
    ) -> Self {
        let mut node = Self::new(id, title, NodeKind::Tab);
        for (row_id, row_title) in rows {
            let mut component = Self::new(*row_id, *row_title, NodeKind::Component);
            for column in columns {
                component.tests.push(
                    TestCase::new(format!("{row_id}-{column}"), format!("{row_title} on {column}"))
                        .with_variant(ToggleVariant::Ternary),
                );
            }
            node.children.push(component);
        }
        node
    }

    /// Leaf tests of this subtree in depth-first order (own tests first).
    #[must_use]
    pub fn all_tests(&self) -> Vec<&TestCase> {
        let mut out = Vec::new();
        self.collect_tests(&mut out);
        out
    }

    fn collect_tests<'a>(&'a self, out: &mut Vec<&'a TestCase>) {
        out.extend(self.tests.iter());
        for child in &self.children {
            child.collect_tests(out);
        }
    }

    #[must_use]
    pub fn test_ids(&self) -> Vec<&str> {
        self.all_tests().into_iter().map(|t| t.id.as_str()).collect()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.tests.len() + self.children.iter().map(Self::leaf_count).sum::<usize>()
    }

    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<&CatalogNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_node(id))
    }

    #[must_use]
    pub fn find_test(&self, test_id: &str) -> Option<&TestCase> {
        self.tests
            .iter()
            .find(|t| t.id == test_id)
            .or_else(|| self.children.iter().find_map(|c| c.find_test(test_id)))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate test id '{0}'")]
    DuplicateTestId(TestId),
    #[error("test '{title}' under '{node}' has an empty id")]
    EmptyTestId { node: String, title: String },
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whole catalog, rooted at an application node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub root: CatalogNode,
}

impl Catalog {
    /// Wrap `root` after checking every test id is present and unique.
    ///
    /// # Errors
    ///
    /// Returns an error if a test id is empty or appears more than once.
    pub fn new(root: CatalogNode) -> Result<Self, CatalogError> {
        let catalog = Self { root };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from JSON (`{"root": {...}}`).
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// # Errors
    ///
    /// Returns an error if a test id is empty or appears more than once.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        validate_node(&self.root, &mut seen)
    }

    #[must_use]
    pub fn tabs(&self) -> &[CatalogNode] {
        &self.root.children
    }

    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<&CatalogNode> {
        self.root.find_node(id)
    }

    #[must_use]
    pub fn find_test(&self, test_id: &str) -> Option<&TestCase> {
        self.root.find_test(test_id)
    }

    /// Cycle used when toggling `test_id`; unknown ids toggle as binary.
    #[must_use]
    pub fn variant_of(&self, test_id: &str) -> ToggleVariant {
        self.find_test(test_id)
            .map_or(ToggleVariant::Binary, |t| t.variant)
    }

    #[must_use]
    pub fn all_tests(&self) -> Vec<&TestCase> {
        self.root.all_tests()
    }
}

fn validate_node<'a>(node: &'a CatalogNode, seen: &mut HashSet<&'a str>) -> Result<(), CatalogError> {
    for test in &node.tests {
        if test.id.trim().is_empty() {
            return Err(CatalogError::EmptyTestId {
                node: node.id.clone(),
                title: test.title.clone(),
            });
        }
        if !seen.insert(test.id.as_str()) {
            return Err(CatalogError::DuplicateTestId(test.id.clone()));
        }
    }
    node.children
        .iter()
        .try_for_each(|child| validate_node(child, seen))
}
