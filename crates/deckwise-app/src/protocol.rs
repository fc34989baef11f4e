// Message types exchanged between the front end, the app loop and the
// spawned remote tasks.

use deckwise_core::session::{AccountTicket, CatalogTicket};
use deckwise_core::view::CollectionSummary;
use deckwise_core::{AccountSnapshot, CatalogEntry, MessageToken, NormalizedItem, RarityFilter, SortKey};
use deckwise_remote::RemoteError;

// ---------------------------------------------------------------------------
// Front end -> app
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Fetch the account for a raw, user-entered tag.
    LoadAccount { tag: String },
    /// Fetch the catalog unless it is cached or already loading.
    LoadCatalog,
    SetRarityFilter(RarityFilter),
    SetSortKey(SortKey),
    SendChat { text: String },
    /// Re-send the current view.
    ShowCollection,
    ShowDeck,
    ShowCatalog,
    /// Discard everything cached for this session.
    Teardown,
    Quit,
}

// ---------------------------------------------------------------------------
// App -> front end
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    AccountLoading { tag: String },
    AccountLoaded(Box<AccountOverview>),
    AccountLoadFailed { message: String },
    CatalogLoading,
    CatalogLoaded { entries: usize },
    CatalogLoadFailed { message: String },
    /// Catalog listing, sent in reply to `ShowCatalog`.
    Catalog(Vec<CatalogEntry>),
    /// The filtered, sorted collection changed (or was asked for).
    CollectionChanged(Box<CollectionSnapshot>),
    Deck(Vec<NormalizedItem>),
    /// A message went out; its placeholder is showing.
    ChatPending { token: MessageToken, text: String },
    /// The placeholder for `token` was replaced with the reply.
    ChatReply { token: MessageToken, text: String },
    /// The placeholder for `token` was replaced with an error line.
    ChatFailed { token: MessageToken, message: String },
    /// A command was refused before anything changed.
    Rejected { reason: String },
    SessionReset,
}

/// Account fields shown in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountOverview {
    pub tag: String,
    pub name: String,
    pub leadership_level: Option<u32>,
    pub trophies: Option<u32>,
    pub best_trophies: Option<u32>,
    pub arena: String,
    pub card_count: usize,
}

impl AccountOverview {
    pub fn from_snapshot(account: &AccountSnapshot) -> Self {
        Self {
            tag: account.tag.clone(),
            name: account.name.clone(),
            leadership_level: account.leadership_level,
            trophies: account.trophies,
            best_trophies: account.best_trophies,
            arena: account.arena.name.clone(),
            card_count: account.cards.len(),
        }
    }
}

/// The derived view plus the selection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub rarity: RarityFilter,
    pub sort: SortKey,
    pub items: Vec<NormalizedItem>,
    pub summary: CollectionSummary,
}

// ---------------------------------------------------------------------------
// Remote tasks -> app
// ---------------------------------------------------------------------------

/// Completion of a spawned remote call. Tickets and tokens let the app
/// discard results that no longer belong to the live session.
#[derive(Debug)]
pub enum RemoteEvent {
    AccountFetched {
        ticket: AccountTicket,
        result: Result<AccountSnapshot, RemoteError>,
    },
    CatalogFetched {
        ticket: CatalogTicket,
        result: Result<Vec<CatalogEntry>, RemoteError>,
    },
    ChatAnswered {
        token: MessageToken,
        result: Result<String, RemoteError>,
    },
}
