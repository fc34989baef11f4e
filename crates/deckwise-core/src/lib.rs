// Client-side normalization, enrichment and session-context engine.
//
// Pure, synchronous building blocks: level normalization, catalog lookup,
// card enrichment, the filter/sort view, the session cache and the chat
// context state machine. I/O lives in the remote and app crates.

pub mod catalog;
pub mod chat;
pub mod enrich;
pub mod error;
pub mod level;
pub mod model;
pub mod session;
pub mod view;
pub mod wire;

pub use catalog::CatalogIndex;
pub use chat::{ChatSessionManager, ChatState, ChatTranscript, MessageToken, OutgoingMessage};
pub use error::{LoadFailure, Resource, SessionError};
pub use level::{LevelLabel, UnifiedLevel};
pub use model::{AccountSnapshot, CatalogEntry, NormalizedItem, OwnedItem, Rarity};
pub use session::SessionCache;
pub use view::{CollectionView, RarityFilter, SortKey};
