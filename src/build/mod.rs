/// Build pipeline: spec parsing, reference resolution, step execution and
/// the cache-backed orchestrator that ties them together.
pub mod executor;
pub mod orchestrator;
pub mod parser;
pub mod resolver;

use serde::{Deserialize, Serialize};

pub use executor::{ExecutionResult, StepExecutor};
pub use orchestrator::{BuildReport, Orchestrator, StepOutcome};
pub use resolver::Resolver;

/// One shell command block and its position in the build.
///
/// Cache entries are keyed by both fields, so moving a definition to a
/// different index makes it a different cache subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub definition: String,
    pub index: usize,
}

impl Step {
    pub fn new(definition: impl Into<String>, index: usize) -> Self {
        Self {
            definition: definition.into(),
            index,
        }
    }

    /// Turn parsed step bodies into indexed steps
    pub fn sequence(definitions: Vec<String>) -> Vec<Step> {
        definitions
            .into_iter()
            .enumerate()
            .map(|(index, definition)| Step { definition, index })
            .collect()
    }
}

/// A file or directory a step is inferred to depend on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedObject {
    pub path: String,
    pub sha: String,
}
