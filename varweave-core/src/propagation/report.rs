//! Propagation reports.
//!
//! Every chain returns a report describing what happened to each variable it
//! visited. Failures inside a chain are recorded here rather than returned
//! as errors.

use crate::error::ExecutionError;

/// Why a variable in the chain was not recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The variable has no code to run.
    NoCode,
    /// These dependencies have no value yet.
    MissingDependencies(Vec<String>),
    /// None of its dependencies changed during this chain.
    Settled,
}

/// What happened to one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Executed and the value changed.
    Updated,
    /// Executed, but produced the value it already had.
    Unchanged,
    /// Not executed.
    Skipped(SkipReason),
    /// The executor failed; the old value is kept.
    Failed(ExecutionError),
}

impl StepOutcome {
    /// Whether the executor was invoked for this step.
    pub fn executed(&self) -> bool {
        matches!(
            self,
            StepOutcome::Updated | StepOutcome::Unchanged | StepOutcome::Failed(_)
        )
    }
}

/// One visited variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationStep {
    pub name: String,
    pub outcome: StepOutcome,
}

/// Result of a `set_value`, `recompute` or `recompute_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// The variable that started the chain, `None` for a full recompute.
    pub source: Option<String>,
    /// Whether the source's value actually changed.
    pub source_changed: bool,
    /// Visited variables, in processing order.
    pub steps: Vec<PropagationStep>,
}

impl PropagationReport {
    pub(crate) fn new(source: Option<&str>, source_changed: bool) -> Self {
        Self {
            source: source.map(str::to_string),
            source_changed,
            steps: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, outcome: StepOutcome) {
        self.steps.push(PropagationStep {
            name: name.into(),
            outcome,
        });
    }

    /// Number of executor invocations made by the chain.
    pub fn executor_calls(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.executed()).count()
    }

    /// Variables whose value changed, in order.
    pub fn updated(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, StepOutcome::Updated))
    }

    /// Variables that were skipped, in order.
    pub fn skipped(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, StepOutcome::Skipped(_)))
    }

    /// Executor failures, in order.
    pub fn failed(&self) -> Vec<&ExecutionError> {
        self.steps
            .iter()
            .filter_map(|s| match &s.outcome {
                StepOutcome::Failed(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    /// Outcome recorded for `name`, if it was visited.
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.outcome)
    }

    fn names_where(&self, pred: impl Fn(&StepOutcome) -> bool) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| pred(&s.outcome))
            .map(|s| s.name.as_str())
            .collect()
    }
}
