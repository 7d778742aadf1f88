mod completions;
mod store;

pub use completions::{CompletionLog, CompletionRecord, InMemoryCompletionLog};
pub use store::{InMemoryReadModelStore, ReadModelStore};
