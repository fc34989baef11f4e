// Application state and orchestration logic.
//
// The central event loop: takes user commands from the front end, spawns
// remote calls, folds their results back into the session cache and pushes
// UI updates out. All state mutation happens on this task.

use std::sync::Arc;

use deckwise_core::enrich::enrich_all;
use deckwise_core::session::{AccountTicket, CatalogLoad, CatalogTicket, Completion};
use deckwise_core::{
    AccountSnapshot, CatalogEntry, ChatSessionManager, ChatTranscript, CollectionView,
    MessageToken, NormalizedItem, SessionCache, SessionError,
};
use deckwise_remote::{PlayerTag, RemoteError, RemoteService};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::{AccountOverview, CollectionSnapshot, RemoteEvent, UiUpdate, UserCommand};

/// Shown in place of a reply when the assistant could not be reached.
pub const CHAT_TRANSPORT_ERROR: &str = "Could not reach the assistant";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a command was refused. Nothing changes when one is returned.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub session: SessionCache,
    pub view: CollectionView,
    /// Enriched copy of the account's current deck.
    pub deck: Vec<NormalizedItem>,
    pub chat: ChatSessionManager,
    pub transcript: ChatTranscript,
    /// A catalog listing was asked for before the catalog arrived.
    pub catalog_listing_requested: bool,
    remote: Arc<dyn RemoteService>,
    remote_tx: mpsc::Sender<RemoteEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        remote: Arc<dyn RemoteService>,
        remote_tx: mpsc::Sender<RemoteEvent>,
    ) -> Self {
        let view = CollectionView::new(config.view.rarity, config.view.sort);
        let transcript = ChatTranscript::new(config.chat.thinking_placeholder.clone());
        Self {
            config,
            session: SessionCache::new(),
            view,
            deck: Vec::new(),
            chat: ChatSessionManager::new(),
            transcript,
            catalog_listing_requested: false,
            remote,
            remote_tx,
        }
    }

    // -- account -------------------------------------------------------------

    /// Validate the tag and spawn the account fetch.
    ///
    /// The previous account's collection, deck and transcript are dropped as
    /// soon as the load begins.
    pub fn start_account_load(&mut self, raw_tag: &str) -> Result<PlayerTag, CommandError> {
        let tag = PlayerTag::parse(raw_tag)?;
        let ticket = self.session.begin_account_load()?;

        self.view.clear_items();
        self.deck.clear();
        self.transcript.clear();

        let remote = Arc::clone(&self.remote);
        let tx = self.remote_tx.clone();
        let fetch_tag = tag.clone();
        tokio::spawn(async move {
            let result = remote.fetch_account(&fetch_tag).await;
            if tx
                .send(RemoteEvent::AccountFetched { ticket, result })
                .await
                .is_err()
            {
                debug!("app loop gone, dropping account result");
            }
        });

        info!("Account load started for {}", tag);
        Ok(tag)
    }

    pub fn apply_account_result(
        &mut self,
        ticket: AccountTicket,
        result: Result<AccountSnapshot, RemoteError>,
    ) -> Completion {
        let completion = self
            .session
            .complete_account_load(ticket, result.map_err(RemoteError::into_load_failure));
        if completion == Completion::Stored {
            self.rebuild_collection();
        }
        completion
    }

    // -- catalog -------------------------------------------------------------

    /// Spawn the catalog fetch. Returns `false` when the catalog is already
    /// cached and nothing was started.
    pub fn start_catalog_load(&mut self) -> Result<bool, CommandError> {
        let ticket = match self.session.begin_catalog_load()? {
            CatalogLoad::Started(ticket) => ticket,
            CatalogLoad::AlreadyCached => return Ok(false),
        };

        let remote = Arc::clone(&self.remote);
        let tx = self.remote_tx.clone();
        tokio::spawn(async move {
            let result = remote.fetch_catalog().await;
            if tx
                .send(RemoteEvent::CatalogFetched { ticket, result })
                .await
                .is_err()
            {
                debug!("app loop gone, dropping catalog result");
            }
        });

        info!("Catalog load started");
        Ok(true)
    }

    pub fn apply_catalog_result(
        &mut self,
        ticket: CatalogTicket,
        result: Result<Vec<CatalogEntry>, RemoteError>,
    ) -> Completion {
        let completion = self
            .session
            .complete_catalog_load(ticket, result.map_err(RemoteError::into_load_failure));
        // A catalog that lands after the account changes rarity, cost and
        // icon fallbacks, so the collection is derived again.
        if completion == Completion::Stored && self.session.account().is_some() {
            self.rebuild_collection();
        }
        completion
    }

    // -- derived view --------------------------------------------------------

    /// Re-enrich the loaded account against the current catalog.
    pub fn rebuild_collection(&mut self) {
        let Some(account) = self.session.account() else {
            self.view.clear_items();
            self.deck.clear();
            return;
        };
        let catalog = self.session.catalog();
        let items = enrich_all(&account.cards, catalog);
        self.deck = enrich_all(&account.current_deck, catalog);
        debug!(
            cards = items.len(),
            deck = self.deck.len(),
            with_catalog = catalog.is_some(),
            "collection rebuilt"
        );
        self.view.set_items(items);
    }

    pub fn collection_snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            rarity: self.view.rarity(),
            sort: self.view.sort_key(),
            items: self.view.recompute(),
            summary: self.view.summary(),
        }
    }

    // -- chat ----------------------------------------------------------------

    /// Build the payload, record the placeholder and spawn the send.
    pub fn send_chat(&mut self, text: &str) -> Result<MessageToken, CommandError> {
        let outgoing = self.chat.build_outgoing_payload(&self.session, text)?;
        let token = outgoing.token;
        self.transcript.push_outgoing(token, &outgoing.request.text);

        let remote = Arc::clone(&self.remote);
        let tx = self.remote_tx.clone();
        tokio::spawn(async move {
            let result = remote.send_chat(&outgoing.request).await;
            if tx
                .send(RemoteEvent::ChatAnswered { token, result })
                .await
                .is_err()
            {
                debug!("app loop gone, dropping chat reply");
            }
        });

        Ok(token)
    }

    /// Settle the placeholder for `token`. Returns the update to show, or
    /// `None` when the placeholder no longer exists (e.g. after a reset).
    pub fn apply_chat_result(
        &mut self,
        token: MessageToken,
        result: Result<String, RemoteError>,
    ) -> Option<UiUpdate> {
        match result {
            Ok(reply) => self
                .transcript
                .resolve(token, &reply)
                .then_some(UiUpdate::ChatReply { token, text: reply }),
            Err(e) => {
                warn!("chat request {} failed: {}", token, e);
                let message = chat_error_message(&e);
                self.transcript
                    .fail(token, &message)
                    .then_some(UiUpdate::ChatFailed { token, message })
            }
        }
    }

    // -- lifecycle -----------------------------------------------------------

    /// Discard the whole session. In-flight results are dropped on arrival.
    pub fn teardown(&mut self) {
        self.session.teardown();
        self.view = CollectionView::new(self.config.view.rarity, self.config.view.sort);
        self.deck.clear();
        self.chat.reset();
        self.transcript.clear();
        self.catalog_listing_requested = false;
    }
}

fn chat_error_message(e: &RemoteError) -> String {
    match e {
        RemoteError::Service(message) => message.clone(),
        _ => CHAT_TRANSPORT_ERROR.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. User commands from the front end
/// 2. Results of spawned remote calls
///
/// Pushes UI updates through `ui_tx`.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut remote_rx: mpsc::Receiver<RemoteEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    // AppState keeps a sender, so this only closes if the state is rebuilt
    // without one; stop polling rather than spin.
    let mut remote_open = true;

    if state.config.preload_catalog {
        start_catalog(&mut state, &ui_tx).await;
    }

    loop {
        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Remote results ---
            event = remote_rx.recv(), if remote_open => {
                match event {
                    Some(event) => {
                        handle_remote_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("Remote channel closed");
                        remote_open = false;
                    }
                }
            }
        }
    }

    info!("Application event loop exited");
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Handle a command from the front end.
pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::LoadAccount { tag } => match state.start_account_load(&tag) {
            Ok(tag) => {
                let _ = ui_tx
                    .send(UiUpdate::AccountLoading {
                        tag: tag.to_string(),
                    })
                    .await;
                send_collection(state, ui_tx).await;
                // Enrichment wants the catalog; fetch it alongside if missing.
                if state.session.catalog().is_none() && !state.session.is_catalog_loading() {
                    start_catalog(state, ui_tx).await;
                }
            }
            Err(e) => reject(ui_tx, e).await,
        },
        UserCommand::LoadCatalog => start_catalog(state, ui_tx).await,
        UserCommand::SetRarityFilter(rarity) => {
            if state.view.set_rarity(rarity) {
                debug!("rarity filter set to {}", rarity);
            }
            send_collection(state, ui_tx).await;
        }
        UserCommand::SetSortKey(sort) => {
            if state.view.set_sort(sort) {
                debug!("sort key set to {}", sort);
            }
            send_collection(state, ui_tx).await;
        }
        UserCommand::SendChat { text } => match state.send_chat(&text) {
            Ok(token) => {
                let _ = ui_tx
                    .send(UiUpdate::ChatPending {
                        token,
                        text: state.config.chat.thinking_placeholder.clone(),
                    })
                    .await;
            }
            Err(e) => reject(ui_tx, e).await,
        },
        UserCommand::ShowCollection => send_collection(state, ui_tx).await,
        UserCommand::ShowDeck => {
            if state.session.account().is_none() {
                reject(ui_tx, SessionError::NoAccountLoaded.into()).await;
            } else {
                let _ = ui_tx.send(UiUpdate::Deck(state.deck.clone())).await;
            }
        }
        UserCommand::ShowCatalog => {
            if let Some(entries) = state.session.catalog_entries() {
                let listing = entries.as_ref().clone();
                let _ = ui_tx.send(UiUpdate::Catalog(listing)).await;
            } else {
                // Listed once the fetch completes.
                state.catalog_listing_requested = true;
                if !state.session.is_catalog_loading() {
                    start_catalog(state, ui_tx).await;
                }
            }
        }
        UserCommand::Teardown => {
            state.teardown();
            let _ = ui_tx.send(UiUpdate::SessionReset).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

/// Fold a remote result back into the state.
pub async fn handle_remote_event(
    state: &mut AppState,
    event: RemoteEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        RemoteEvent::AccountFetched { ticket, result } => {
            match state.apply_account_result(ticket, result) {
                Completion::Stored => {
                    if let Some(account) = state.session.account() {
                        let overview = AccountOverview::from_snapshot(account);
                        let _ = ui_tx
                            .send(UiUpdate::AccountLoaded(Box::new(overview)))
                            .await;
                    }
                    send_collection(state, ui_tx).await;
                }
                Completion::Failed(failure) => {
                    let _ = ui_tx
                        .send(UiUpdate::AccountLoadFailed {
                            message: failure.user_message().to_string(),
                        })
                        .await;
                }
                Completion::Discarded => {}
            }
        }
        RemoteEvent::CatalogFetched { ticket, result } => {
            match state.apply_catalog_result(ticket, result) {
                Completion::Stored => {
                    let entries = state.session.catalog().map_or(0, |c| c.len());
                    let _ = ui_tx.send(UiUpdate::CatalogLoaded { entries }).await;
                    if state.session.account().is_some() {
                        send_collection(state, ui_tx).await;
                    }
                    if std::mem::take(&mut state.catalog_listing_requested) {
                        if let Some(entries) = state.session.catalog_entries() {
                            let listing = entries.as_ref().clone();
                            let _ = ui_tx.send(UiUpdate::Catalog(listing)).await;
                        }
                    }
                }
                Completion::Failed(failure) => {
                    state.catalog_listing_requested = false;
                    let _ = ui_tx
                        .send(UiUpdate::CatalogLoadFailed {
                            message: failure.user_message().to_string(),
                        })
                        .await;
                }
                Completion::Discarded => {}
            }
        }
        RemoteEvent::ChatAnswered { token, result } => {
            if let Some(update) = state.apply_chat_result(token, result) {
                let _ = ui_tx.send(update).await;
            }
        }
    }
}

async fn start_catalog(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    match state.start_catalog_load() {
        Ok(true) => {
            let _ = ui_tx.send(UiUpdate::CatalogLoading).await;
        }
        Ok(false) => {
            let entries = state.session.catalog().map_or(0, |c| c.len());
            let _ = ui_tx.send(UiUpdate::CatalogLoaded { entries }).await;
        }
        Err(e) => reject(ui_tx, e).await,
    }
}

async fn send_collection(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let snapshot = state.collection_snapshot();
    let _ = ui_tx
        .send(UiUpdate::CollectionChanged(Box::new(snapshot)))
        .await;
}

async fn reject(ui_tx: &mpsc::Sender<UiUpdate>, e: CommandError) {
    debug!("command rejected: {}", e);
    let _ = ui_tx
        .send(UiUpdate::Rejected {
            reason: e.to_string(),
        })
        .await;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
