mod locks;
mod orchestrator;
mod store;
mod summarizer;
mod turn;

pub use locks::SessionLocks;
pub use orchestrator::{
    ChatError, ChatOrchestrator, ChatOutcome, ChatTurnRequest, SummaryOutcome, reply_chunks,
};
pub use store::{InMemorySessionStore, SessionStore, SessionStoreError, SessionStoreFuture};
pub use summarizer::{Summarizer, SummaryError, flatten_history};
pub use turn::{Turn, TurnRole};
