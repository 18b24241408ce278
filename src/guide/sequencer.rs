//! Step sequencer
//!
//! Maps a step index to the prompt the guide asks at that step. Scripts are
//! plain data, validated once when built; lookups are pure.

use super::draft::DraftField;
use super::selection::MultiSelectState;
use super::turn::{ChoiceOption, NewTurn};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// What the guide asks at one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    Prompt {
        prompt: String,
    },
    SingleSelect {
        prompt: String,
        options: Vec<ChoiceOption>,
    },
    MultiSelect {
        prompt: String,
        options: Vec<ChoiceOption>,
        max_selections: usize,
    },
}

impl StepSpec {
    pub fn prompt(&self) -> &str {
        match self {
            StepSpec::Prompt { prompt }
            | StepSpec::SingleSelect { prompt, .. }
            | StepSpec::MultiSelect { prompt, .. } => prompt,
        }
    }

    /// Assistant turn that asks this step
    pub(crate) fn to_turn(&self, step: usize) -> NewTurn {
        let turn = NewTurn::assistant(self.prompt()).at_step(step);
        match self {
            StepSpec::Prompt { .. } => turn,
            StepSpec::SingleSelect { options, .. } => turn.with_options(options.clone()),
            StepSpec::MultiSelect {
                options,
                max_selections,
                ..
            } => turn.with_deck(MultiSelectState::new(options.clone(), *max_selections)),
        }
    }
}

/// One scripted step and the draft field its answer fills
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub field: DraftField,
    pub spec: StepSpec,
}

impl Step {
    pub fn prompt(field: DraftField, prompt: impl Into<String>) -> Self {
        Self {
            field,
            spec: StepSpec::Prompt {
                prompt: prompt.into(),
            },
        }
    }

    pub fn single_select(
        field: DraftField,
        prompt: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        Self {
            field,
            spec: StepSpec::SingleSelect {
                prompt: prompt.into(),
                options,
            },
        }
    }

    pub fn multi_select(
        field: DraftField,
        prompt: impl Into<String>,
        options: Vec<ChoiceOption>,
        max_selections: usize,
    ) -> Self {
        Self {
            field,
            spec: StepSpec::MultiSelect {
                prompt: prompt.into(),
                options,
                max_selections,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("A script needs at least one step")]
    Empty,
    #[error("Step {step} offers no options")]
    NoOptions { step: usize },
    #[error("Step {step} repeats option id {id}")]
    DuplicateOption { step: usize, id: String },
    #[error("Step {step} must allow at least one selection")]
    ZeroCap { step: usize },
}

/// Fixed, ordered list of steps.
///
/// Prompts live at indices `0..len()`. The terminal index is `len()`: a
/// session that reaches it is complete and has nothing left to ask.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    steps: Vec<Step>,
}

impl StepSequencer {
    pub fn new(steps: Vec<Step>) -> Result<Self, ScriptError> {
        if steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        for (index, step) in steps.iter().enumerate() {
            validate_step(index, &step.spec)?;
        }
        Ok(Self { steps })
    }

    /// The default blueprint drafting script
    pub fn blueprint() -> Self {
        Self {
            steps: blueprint_steps(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn terminal_index(&self) -> usize {
        self.steps.len()
    }

    pub fn is_terminal(&self, step_index: usize) -> bool {
        step_index >= self.terminal_index()
    }

    /// Spec to ask at `step_index`; `None` once the terminal index is reached
    pub fn next(&self, step_index: usize) -> Option<&StepSpec> {
        self.steps.get(step_index).map(|step| &step.spec)
    }

    pub fn step(&self, step_index: usize) -> Option<&Step> {
        self.steps.get(step_index)
    }
}

fn validate_step(index: usize, spec: &StepSpec) -> Result<(), ScriptError> {
    let options = match spec {
        StepSpec::Prompt { .. } => return Ok(()),
        StepSpec::SingleSelect { options, .. } => options,
        StepSpec::MultiSelect {
            options,
            max_selections,
            ..
        } => {
            if *max_selections == 0 {
                return Err(ScriptError::ZeroCap { step: index });
            }
            options
        }
    };
    if options.is_empty() {
        return Err(ScriptError::NoOptions { step: index });
    }
    let mut seen = HashSet::new();
    for option in options {
        if !seen.insert(option.id.as_str()) {
            return Err(ScriptError::DuplicateOption {
                step: index,
                id: option.id.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Default script
// ============================================================================

/// Components deck cap
pub const MAX_COMPONENTS: usize = 5;

fn starting_points() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption::new("lamp", "LAMP Stack", "Apache + MySQL + PHP stack").recommended(),
        ChoiceOption::new("nginx", "Nginx + PHP", "Web tier with PHP runtime"),
        ChoiceOption::new("postgres", "Postgres Service", "Database-only blueprint"),
        ChoiceOption::new("custom", "Custom App", "Bring your own service mix"),
    ]
}

fn components() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption::new("web", "Web Tier", "Frontend or API layer"),
        ChoiceOption::new("db", "Database", "Relational or NoSQL data store"),
        ChoiceOption::new("cache", "Cache", "Redis or Memcached"),
        ChoiceOption::new("queue", "Queue", "Background job processor"),
        ChoiceOption::new("search", "Search", "Search index service"),
        ChoiceOption::new("monitoring", "Monitoring", "Telemetry and alerts"),
    ]
}

fn blueprint_steps() -> Vec<Step> {
    vec![
        Step::prompt(
            DraftField::AppType,
            "What kind of application is this blueprint for?",
        ),
        Step::single_select(
            DraftField::StartingPoint,
            "Here are a few starting points you can pick from:",
            starting_points(),
        ),
        Step::multi_select(
            DraftField::Components,
            "Select up to 5 application components to include:",
            components(),
            MAX_COMPONENTS,
        ),
        Step::prompt(
            DraftField::Dependencies,
            "Any dependencies between components? (comma-separated, e.g. web->db)",
        ),
        Step::prompt(
            DraftField::Inputs,
            "What runtime inputs/variables should users provide? (comma-separated)",
        ),
        Step::prompt(
            DraftField::Day2Actions,
            "Any day-2 actions to support? (comma-separated)",
        ),
        Step::prompt(
            DraftField::TargetEnvironment,
            "Target environment label (e.g., AHV, ESXi, AWS)?",
        ),
    ]
}
