// Integration tests for the deckwise client.
//
// These drive the full app loop over its channels with an in-memory remote,
// checking that account loading, catalog enrichment, the filter/sort view,
// chat context attachment and session teardown work together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deckwise_app::app::{self, AppState};
use deckwise_app::config::*;
use deckwise_app::protocol::*;
use deckwise_core::chat::ChatRequest;
use deckwise_core::model::{Arena, OwnedItem};
use deckwise_core::{AccountSnapshot, CatalogEntry, LevelLabel, Rarity, RarityFilter, SortKey};
use deckwise_remote::{PlayerTag, RemoteError, RemoteService};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

// ===========================================================================
// Test helpers
// ===========================================================================

/// In-memory remote. Account fetches can be held until the test releases
/// them, so ordering against teardown and reloads is deterministic.
struct ScriptedRemote {
    accounts: HashMap<String, AccountSnapshot>,
    catalog: Vec<CatalogEntry>,
    account_gate: Option<Arc<Semaphore>>,
    chats: Mutex<Vec<ChatRequest>>,
    catalog_calls: Mutex<usize>,
}

impl ScriptedRemote {
    fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert("#AAA".to_string(), account_a());
        accounts.insert("#BBB".to_string(), account_b());
        Self {
            accounts,
            catalog: catalog(),
            account_gate: None,
            chats: Mutex::new(Vec::new()),
            catalog_calls: Mutex::new(0),
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            account_gate: Some(gate),
            ..Self::new()
        }
    }

    fn chats(&self) -> Vec<ChatRequest> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteService for ScriptedRemote {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, RemoteError> {
        *self.catalog_calls.lock().unwrap() += 1;
        Ok(self.catalog.clone())
    }

    async fn fetch_account(&self, tag: &PlayerTag) -> Result<AccountSnapshot, RemoteError> {
        if let Some(gate) = &self.account_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.accounts
            .get(tag.as_str())
            .cloned()
            .ok_or_else(|| RemoteError::Service("Player not found".into()))
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<String, RemoteError> {
        let mut chats = self.chats.lock().unwrap();
        chats.push(request.clone());
        Ok(format!("reply {}", chats.len()))
    }
}

fn owned(id: u64, name: &str, level: u32, max_level: u32, evo: u32) -> OwnedItem {
    OwnedItem {
        id: Some(id),
        name: name.into(),
        level,
        max_level,
        evolution_tier: evo,
        icon_url: None,
        rarity: None,
        elixir_cost: None,
        count: None,
    }
}

fn entry(id: u64, name: &str, rarity: &str, cost: Option<u32>) -> CatalogEntry {
    CatalogEntry {
        id: Some(id),
        name: name.into(),
        rarity: Some(rarity.into()),
        elixir_cost: cost,
        max_level: None,
        icon_url: Some(format!("https://cdn.example/{id}.png")),
    }
}

fn catalog() -> Vec<CatalogEntry> {
    vec![
        entry(1, "Knight", "common", Some(3)),
        entry(2, "Archers", "common", Some(3)),
        entry(3, "Hog Rider", "rare", Some(4)),
        entry(4, "Princess", "legendary", Some(3)),
        entry(5, "Mirror", "epic", None),
        entry(6, "Golden Knight", "champion", Some(4)),
    ]
}

/// Knight evolved, Princess on a 6-level scale, Mirror with no cost.
fn account_a() -> AccountSnapshot {
    AccountSnapshot {
        tag: "#AAA".into(),
        name: "Alpha".into(),
        leadership_level: Some(14),
        trophies: Some(7100),
        best_trophies: Some(7500),
        arena: Arena {
            id: Some(54_000_020),
            name: "Legendary Arena".into(),
        },
        cards: vec![
            owned(1, "Knight", 14, 14, 1),
            owned(2, "Archers", 3, 9, 0),
            owned(3, "Hog Rider", 9, 11, 0),
            owned(4, "Princess", 5, 6, 0),
            owned(5, "Mirror", 7, 8, 0),
        ],
        current_deck: vec![owned(1, "Knight", 14, 14, 1), owned(3, "Hog Rider", 9, 11, 0)],
    }
}

fn account_b() -> AccountSnapshot {
    AccountSnapshot {
        tag: "#BBB".into(),
        name: "Bravo".into(),
        leadership_level: Some(9),
        trophies: Some(3000),
        best_trophies: None,
        arena: Arena {
            id: None,
            name: "Unknown arena".into(),
        },
        cards: vec![owned(6, "Golden Knight", 1, 6, 0)],
        current_deck: Vec::new(),
    }
}

fn inline_config(preload_catalog: bool) -> Config {
    Config {
        remote: RemoteConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout_secs: 5,
        },
        view: ViewConfig {
            rarity: RarityFilter::All,
            sort: SortKey::LevelDesc,
        },
        chat: ChatConfig {
            thinking_placeholder: "Thinking...".into(),
        },
        preload_catalog,
        credentials: CredentialsConfig::default(),
    }
}

struct Harness {
    cmd_tx: mpsc::Sender<UserCommand>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(remote: Arc<ScriptedRemote>, preload_catalog: bool) -> Self {
        let (remote_tx, remote_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (ui_tx, ui_rx) = mpsc::channel(256);
        let state = AppState::new(inline_config(preload_catalog), remote, remote_tx);
        let handle = tokio::spawn(app::run(cmd_rx, remote_rx, ui_tx, state));
        Self {
            cmd_tx,
            ui_rx,
            handle,
        }
    }

    async fn send(&self, cmd: UserCommand) {
        self.cmd_tx.send(cmd).await.unwrap();
    }

    /// Receive updates until one matches, returning it.
    async fn wait_for(&mut self, pred: impl Fn(&UiUpdate) -> bool) -> UiUpdate {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                let update = self.ui_rx.recv().await.expect("ui channel closed");
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    async fn next_collection(&mut self) -> CollectionSnapshot {
        match self
            .wait_for(|u| matches!(u, UiUpdate::CollectionChanged(_)))
            .await
        {
            UiUpdate::CollectionChanged(snapshot) => *snapshot,
            _ => unreachable!(),
        }
    }

    /// Send a view command and return the collection it produced.
    async fn apply(&mut self, cmd: UserCommand) -> CollectionSnapshot {
        self.send(cmd).await;
        self.next_collection().await
    }

    async fn collection(&mut self) -> CollectionSnapshot {
        self.apply(UserCommand::ShowCollection).await
    }

    /// Load an account and consume the collection update that follows it.
    async fn load(&mut self, tag: &str) -> AccountOverview {
        self.send(UserCommand::LoadAccount { tag: tag.into() }).await;
        let overview = match self
            .wait_for(|u| matches!(u, UiUpdate::AccountLoaded(_)))
            .await
        {
            UiUpdate::AccountLoaded(overview) => *overview,
            _ => unreachable!(),
        };
        self.next_collection().await;
        overview
    }

    async fn wait_catalog(&mut self) {
        self.wait_for(|u| matches!(u, UiUpdate::CatalogLoaded { .. }))
            .await;
    }

    async fn chat(&mut self, text: &str) -> String {
        self.send(UserCommand::SendChat { text: text.into() }).await;
        match self
            .wait_for(|u| matches!(u, UiUpdate::ChatReply { .. } | UiUpdate::Rejected { .. }))
            .await
        {
            UiUpdate::ChatReply { text, .. } => text,
            UiUpdate::Rejected { reason } => panic!("chat rejected: {reason}"),
            _ => unreachable!(),
        }
    }

    async fn quit(self) {
        self.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let result = self.handle.await.unwrap();
        assert!(result.is_ok());
    }
}

fn names(snapshot: &CollectionSnapshot) -> Vec<String> {
    snapshot.items.iter().map(|i| i.name.clone()).collect()
}

// ===========================================================================
// Account + catalog
// ===========================================================================

#[tokio::test]
async fn account_load_with_preloaded_catalog_enriches_cards() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote.clone(), true);
    h.wait_catalog().await;

    let overview = h.load("aaa").await;
    assert_eq!(overview.tag, "#AAA");
    assert_eq!(overview.name, "Alpha");
    assert_eq!(overview.best_trophies, Some(7500));
    assert_eq!(overview.card_count, 5);

    let snapshot = h.collection().await;
    // Level descending: evolved Knight (15) first.
    let knight = &snapshot.items[0];
    assert_eq!(knight.name, "Knight");
    assert_eq!(knight.unified_level, 15);
    assert_eq!(knight.label, LevelLabel::Elite);
    assert_eq!(knight.display_name(), "Knight [Evo 1]");
    assert_eq!(knight.rarity.as_deref(), Some("common"));
    assert_eq!(knight.icon_url.as_deref(), Some("https://cdn.example/1.png"));

    let archers = snapshot.items.iter().find(|i| i.name == "Archers").unwrap();
    assert_eq!(archers.unified_level, 8);
    assert_eq!(archers.label, LevelLabel::Weak);
    let hog = snapshot.items.iter().find(|i| i.name == "Hog Rider").unwrap();
    assert_eq!(hog.unified_level, 12);
    assert_eq!(hog.label, LevelLabel::Good);

    assert_eq!(snapshot.summary.total, 5);
    assert_eq!(*remote.catalog_calls.lock().unwrap(), 1);

    h.quit().await;
}

#[tokio::test]
async fn catalog_is_fetched_alongside_first_account() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote.clone(), false);

    // The catalog may land before or after the account; either way the
    // collection ends up enriched.
    h.send(UserCommand::LoadAccount { tag: "#AAA".into() }).await;
    h.wait_for(|u| match u {
        UiUpdate::CollectionChanged(s) => {
            !s.items.is_empty() && s.items.iter().all(|i| i.rarity.is_some())
        }
        _ => false,
    })
    .await;

    // A second account reuses the cached catalog.
    h.load("#BBB").await;
    assert_eq!(*remote.catalog_calls.lock().unwrap(), 1);

    h.quit().await;
}

#[tokio::test]
async fn deck_is_enriched() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote, true);
    h.wait_catalog().await;
    h.load("#AAA").await;

    h.send(UserCommand::ShowDeck).await;
    let deck = match h.wait_for(|u| matches!(u, UiUpdate::Deck(_))).await {
        UiUpdate::Deck(items) => items,
        _ => unreachable!(),
    };
    assert_eq!(deck.len(), 2);
    assert_eq!(deck[1].name, "Hog Rider");
    assert_eq!(deck[1].elixir_cost, Some(4));

    h.quit().await;
}

#[tokio::test]
async fn catalog_listing_waits_for_fetch() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote, false);

    h.send(UserCommand::ShowCatalog).await;
    let listing = match h.wait_for(|u| matches!(u, UiUpdate::Catalog(_))).await {
        UiUpdate::Catalog(entries) => entries,
        _ => unreachable!(),
    };
    assert_eq!(listing.len(), 6);

    h.quit().await;
}

#[tokio::test]
async fn unknown_account_shows_service_message() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote, false);

    h.send(UserCommand::LoadAccount { tag: "#ZZZ".into() }).await;
    let update = h
        .wait_for(|u| matches!(u, UiUpdate::AccountLoadFailed { .. }))
        .await;
    assert_eq!(
        update,
        UiUpdate::AccountLoadFailed {
            message: "Player not found".into()
        }
    );

    h.send(UserCommand::SendChat { text: "hi".into() }).await;
    let update = h.wait_for(|u| matches!(u, UiUpdate::Rejected { .. })).await;
    assert_eq!(
        update,
        UiUpdate::Rejected {
            reason: "no account loaded".into()
        }
    );

    h.quit().await;
}

#[tokio::test]
async fn second_load_while_first_in_flight_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let remote = Arc::new(ScriptedRemote::gated(gate.clone()));
    let mut h = Harness::start(remote, false);

    h.send(UserCommand::LoadAccount { tag: "#AAA".into() }).await;
    h.wait_for(|u| matches!(u, UiUpdate::AccountLoading { .. }))
        .await;
    h.send(UserCommand::LoadAccount { tag: "#BBB".into() }).await;
    let update = h.wait_for(|u| matches!(u, UiUpdate::Rejected { .. })).await;
    assert_eq!(
        update,
        UiUpdate::Rejected {
            reason: "account load already in progress".into()
        }
    );

    gate.add_permits(1);
    let overview = match h.wait_for(|u| matches!(u, UiUpdate::AccountLoaded(_))).await {
        UiUpdate::AccountLoaded(o) => o,
        _ => unreachable!(),
    };
    assert_eq!(overview.tag, "#AAA");

    h.quit().await;
}

// ===========================================================================
// Filter / sort
// ===========================================================================

#[tokio::test]
async fn rarity_filter_and_cost_sort() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote, true);
    h.wait_catalog().await;
    h.load("#AAA").await;

    let snapshot = h
        .apply(UserCommand::SetRarityFilter(RarityFilter::Only(Rarity::Common)))
        .await;
    assert_eq!(names(&snapshot), vec!["Knight", "Archers"]);
    // Summary covers the whole collection regardless of the filter.
    assert_eq!(snapshot.summary.total, 5);

    h.apply(UserCommand::SetRarityFilter(RarityFilter::All)).await;
    let snapshot = h.apply(UserCommand::SetSortKey(SortKey::CostAsc)).await;
    // Ties keep collection order; the cost-less Mirror goes last.
    assert_eq!(
        names(&snapshot),
        vec!["Knight", "Archers", "Princess", "Hog Rider", "Mirror"]
    );

    let snapshot = h.apply(UserCommand::SetSortKey(SortKey::CostDesc)).await;
    assert_eq!(
        names(&snapshot),
        vec!["Hog Rider", "Knight", "Archers", "Princess", "Mirror"]
    );

    let snapshot = h.apply(UserCommand::SetSortKey(SortKey::LevelAsc)).await;
    assert_eq!(names(&snapshot)[0], "Archers");

    h.quit().await;
}

// ===========================================================================
// Chat context
// ===========================================================================

#[tokio::test]
async fn context_sent_once_per_account() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote.clone(), true);
    h.wait_catalog().await;

    h.load("#AAA").await;
    assert_eq!(h.chat("hi").await, "reply 1");
    assert_eq!(h.chat("bye").await, "reply 2");

    h.load("#BBB").await;
    assert_eq!(h.chat("hello").await, "reply 3");

    let chats = remote.chats();
    assert_eq!(chats.len(), 3);

    let first = chats[0].context.as_ref().expect("first message carries context");
    assert_eq!(first.account.tag, "#AAA");
    assert_eq!(first.catalog.as_ref().map(Vec::len), Some(6));
    assert!(chats[1].context.is_none());

    let third = chats[2].context.as_ref().expect("new account resends context");
    assert_eq!(third.account.tag, "#BBB");

    h.quit().await;
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote.clone(), false);
    h.load("#AAA").await;

    h.send(UserCommand::SendChat { text: "   ".into() }).await;
    let update = h.wait_for(|u| matches!(u, UiUpdate::Rejected { .. })).await;
    assert_eq!(
        update,
        UiUpdate::Rejected {
            reason: "message is empty".into()
        }
    );

    // The rejected message did not consume the context.
    h.chat("hi").await;
    assert!(remote.chats()[0].context.is_some());

    h.quit().await;
}

// ===========================================================================
// Teardown
// ===========================================================================

#[tokio::test]
async fn teardown_discards_late_account_result() {
    let gate = Arc::new(Semaphore::new(0));
    let remote = Arc::new(ScriptedRemote::gated(gate.clone()));
    let mut h = Harness::start(remote, false);

    h.send(UserCommand::LoadAccount { tag: "#AAA".into() }).await;
    h.wait_for(|u| matches!(u, UiUpdate::AccountLoading { .. }))
        .await;
    h.send(UserCommand::Teardown).await;
    h.wait_for(|u| matches!(u, UiUpdate::SessionReset)).await;

    // Release the stale fetch, then ask for the view; nothing may have landed.
    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = h.collection().await;
    assert!(snapshot.items.is_empty());

    h.send(UserCommand::SendChat { text: "hi".into() }).await;
    let update = h.wait_for(|u| matches!(u, UiUpdate::Rejected { .. })).await;
    assert_eq!(
        update,
        UiUpdate::Rejected {
            reason: "no account loaded".into()
        }
    );

    // A fresh load works normally after the reset.
    gate.add_permits(1);
    let overview = h.load("#BBB").await;
    assert_eq!(overview.tag, "#BBB");

    h.quit().await;
}

#[tokio::test]
async fn teardown_resends_context_for_same_account() {
    let remote = Arc::new(ScriptedRemote::new());
    let mut h = Harness::start(remote.clone(), false);

    h.load("#AAA").await;
    h.chat("hi").await;
    h.send(UserCommand::Teardown).await;
    h.wait_for(|u| matches!(u, UiUpdate::SessionReset)).await;

    h.load("#AAA").await;
    h.chat("again").await;

    let chats = remote.chats();
    assert!(chats[0].context.is_some());
    assert!(chats[1].context.is_some());

    h.quit().await;
}
