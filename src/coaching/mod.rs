pub mod controller;
mod loop_worker;
pub mod options;
pub mod parser;
pub mod prompt;
pub mod scheduler;
pub mod state;

pub use controller::{AnalysisLoop, CoachPorts, LoopConfig};
pub use options::{merge, AnalysisOptions, AnalysisOptionsPatch, SkillLevel};
pub use parser::{parse, ParsedFeedback};
pub use prompt::build_prompt;
pub use scheduler::RateScheduler;
pub use state::{LoopSnapshot, LoopStatus};
