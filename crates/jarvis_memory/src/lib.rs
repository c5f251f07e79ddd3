pub mod errors;
pub mod long_term;
pub mod short_term;
pub mod store;

pub use errors::{jaccard, ErrorMemory, ErrorRecord, ErrorStats};
pub use long_term::{merge_pattern, LongTermMemory, MergeOutcome, MergePolicy, PatternEntry};
pub use short_term::{MemoryEntry, ShortTermMemory, ShortTermStats};
pub use store::{BrainStore, SqliteStore};
