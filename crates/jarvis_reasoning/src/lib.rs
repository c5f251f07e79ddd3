pub mod context;
pub mod decision;
pub mod engine;
pub mod entities;
pub mod followup;
pub mod intent;

pub use context::{ContextSummary, ContextTracker, FamilyContext, IntentContext, RecentEntity, TurnInput};
pub use decision::{DecisionEngine, DecisionLogEntry, DecisionRule, RuleInput};
pub use engine::{Brain, BrainError, BrainStats, TurnOutcome};
pub use entities::EntityExtractor;
pub use intent::IntentClassifier;
