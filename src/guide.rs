//! Guided drafting conversation
//!
//! Elm-style state machine: `transition` is pure and returns effects that the
//! runtime executes.

pub mod draft;
mod effect;
pub mod event;
pub mod selection;
pub mod sequencer;
pub mod state;
pub(crate) mod transition;
pub mod turn;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use draft::{export_draft, BlueprintDraft, DraftField, ExportError};
pub use effect::Effect;
pub use event::Event;
#[allow(unused_imports)] // Public API re-exports
pub use selection::{MultiSelectState, SelectionError};
#[allow(unused_imports)] // Public API re-exports
pub use sequencer::{Step, StepSequencer, StepSpec};
pub use state::{GuideContext, GuidePhase, GuideSession};
pub use transition::{transition, TransitionError};
#[allow(unused_imports)] // Public API re-exports
pub use turn::{ChoiceOption, Evidence, Role, Turn, TurnId};
