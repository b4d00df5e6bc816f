use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Labels that encode the review state of a pull request.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum WorkflowLabel {
    /// The PR waits for a review from the translation team.
    ReviewNeeded,
    /// A reviewer requested changes, the author has to reply with `/done`.
    ChangesRequested,
    /// The PR was approved once and needs a second approval.
    NeedsPlusOne,
    /// The PR was approved twice.
    ReadyToMerge,
}

impl WorkflowLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowLabel::ReviewNeeded => "review needed",
            WorkflowLabel::ChangesRequested => "changes requested",
            WorkflowLabel::NeedsPlusOne => "needs +1",
            WorkflowLabel::ReadyToMerge => "ready to merge",
        }
    }
}

impl Display for WorkflowLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the labels currently attached to a pull request.
///
/// Labels outside of the workflow vocabulary are kept as well, the workflow never touches them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LabelSet(HashSet<String>);

impl LabelSet {
    pub fn contains(&self, label: WorkflowLabel) -> bool {
        self.0.contains(label.as_str())
    }

    pub fn insert(&mut self, label: WorkflowLabel) {
        self.0.insert(label.as_str().to_string());
    }

    /// Removes the label if it is present. Removing a missing label does nothing.
    pub fn remove(&mut self, label: WorkflowLabel) {
        self.0.remove(label.as_str());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Workflow labels present in the set, in the order in which they appear in the workflow.
    pub fn workflow_labels(&self) -> Vec<WorkflowLabel> {
        [
            WorkflowLabel::ReviewNeeded,
            WorkflowLabel::ChangesRequested,
            WorkflowLabel::NeedsPlusOne,
            WorkflowLabel::ReadyToMerge,
        ]
        .into_iter()
        .filter(|label| self.contains(*label))
        .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Debug for LabelSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Sorted, so that logs and snapshots are stable.
        let mut labels: Vec<&str> = self.0.iter().map(|s| s.as_str()).collect();
        labels.sort_unstable();
        f.debug_set().entries(labels).finish()
    }
}
