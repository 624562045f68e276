pub mod config;
pub mod design;
pub mod dial;
pub mod performance;
pub mod rig;
pub mod scene;
pub mod sequencer;
pub mod session;
pub mod stimulus;
pub mod trigger;

pub use config::{ExperimentConfig, Monitor, TrialTiming};
pub use design::{generate_blocks, generate_trials};
pub use dial::{DialRequest, ResponseDial};
pub use performance::{cue_accuracy, summarize, BlockPerformance, BlockTally};
pub use rig::Rig;
pub use scene::Scene;
pub use sequencer::{TrialPlan, TrialSequencer, TrialState};
pub use session::{BlockSummary, PracticeSummary, Session, SessionReport};
pub use stimulus::{assign_palette, generate_characteristics, random_trial_spec};
pub use trigger::{encode, ConditionKey};
