// Session cache: the single mutable store for the loaded account and catalog.
//
// All writes go through the begin/complete pairs below. Each `begin_*` hands
// out a ticket stamped with the current session generation; `teardown`
// bumps the generation so results that arrive afterwards are discarded
// instead of resurrecting a dead session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::catalog::CatalogIndex;
use crate::error::{LoadFailure, Resource, SessionError};
use crate::model::{AccountSnapshot, CatalogEntry};

/// Proof that an account load was started. Required to complete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountTicket {
    session: u64,
    account: u64,
}

/// Proof that a catalog load was started. Required to complete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTicket {
    session: u64,
}

/// Outcome of `begin_catalog_load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogLoad {
    /// A fetch should be issued; complete it with this ticket.
    Started(CatalogTicket),
    /// The catalog is already cached for this session; nothing to do.
    AlreadyCached,
}

/// What a `complete_*` call did with the result it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Stored,
    Failed(LoadFailure),
    /// The ticket predates a teardown (or a newer load); result dropped.
    Discarded,
}

/// Session-scoped cache of the account and catalog snapshots.
#[derive(Debug, Default)]
pub struct SessionCache {
    account: Option<Arc<AccountSnapshot>>,
    account_loaded_at: Option<DateTime<Utc>>,
    catalog: Option<CatalogIndex>,
    account_loading: bool,
    catalog_loading: bool,
    /// Bumped on teardown.
    session_generation: u64,
    /// Bumped on every account load that begins.
    account_generation: u64,
    last_account_failure: Option<LoadFailure>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // -- reads ---------------------------------------------------------------

    pub fn account(&self) -> Option<&Arc<AccountSnapshot>> {
        self.account.as_ref()
    }

    pub fn account_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.account_loaded_at
    }

    pub fn catalog(&self) -> Option<&CatalogIndex> {
        self.catalog.as_ref()
    }

    pub fn catalog_entries(&self) -> Option<&Arc<Vec<CatalogEntry>>> {
        self.catalog.as_ref().map(CatalogIndex::entries)
    }

    pub fn is_account_loading(&self) -> bool {
        self.account_loading
    }

    pub fn is_catalog_loading(&self) -> bool {
        self.catalog_loading
    }

    /// Identifies the current account lifetime. Changes whenever an account
    /// load begins or the session is torn down.
    pub fn account_generation(&self) -> (u64, u64) {
        (self.session_generation, self.account_generation)
    }

    pub fn last_account_failure(&self) -> Option<&LoadFailure> {
        self.last_account_failure.as_ref()
    }

    // -- account -------------------------------------------------------------

    /// Start an account load. Rejected while another is in flight; otherwise
    /// the current snapshot is dropped immediately.
    pub fn begin_account_load(&mut self) -> Result<AccountTicket, SessionError> {
        if self.account_loading {
            return Err(SessionError::AlreadyInProgress {
                resource: Resource::Account,
            });
        }
        self.account = None;
        self.account_loaded_at = None;
        self.last_account_failure = None;
        self.account_loading = true;
        self.account_generation += 1;
        debug!(generation = self.account_generation, "account load started");
        Ok(AccountTicket {
            session: self.session_generation,
            account: self.account_generation,
        })
    }

    /// Finish an account load. The only writer of the account snapshot.
    pub fn complete_account_load(
        &mut self,
        ticket: AccountTicket,
        result: Result<AccountSnapshot, LoadFailure>,
    ) -> Completion {
        if ticket.session != self.session_generation || ticket.account != self.account_generation {
            debug!(?ticket, "discarding stale account result");
            return Completion::Discarded;
        }
        self.account_loading = false;
        match result {
            Ok(snapshot) => {
                info!(
                    "account {} loaded with {} cards",
                    snapshot.tag,
                    snapshot.cards.len()
                );
                self.account = Some(Arc::new(snapshot));
                self.account_loaded_at = Some(Utc::now());
                Completion::Stored
            }
            Err(failure) => {
                info!("account load failed: {}", failure);
                self.account = None;
                self.account_loaded_at = None;
                self.last_account_failure = Some(failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    // -- catalog -------------------------------------------------------------

    /// Start a catalog load unless one is cached or already in flight.
    pub fn begin_catalog_load(&mut self) -> Result<CatalogLoad, SessionError> {
        if self.catalog.is_some() {
            return Ok(CatalogLoad::AlreadyCached);
        }
        if self.catalog_loading {
            return Err(SessionError::AlreadyInProgress {
                resource: Resource::Catalog,
            });
        }
        self.catalog_loading = true;
        debug!("catalog load started");
        Ok(CatalogLoad::Started(CatalogTicket {
            session: self.session_generation,
        }))
    }

    /// Finish a catalog load. A no-op if a catalog is already cached.
    pub fn complete_catalog_load(
        &mut self,
        ticket: CatalogTicket,
        result: Result<Vec<CatalogEntry>, LoadFailure>,
    ) -> Completion {
        if ticket.session != self.session_generation {
            debug!("discarding stale catalog result");
            return Completion::Discarded;
        }
        self.catalog_loading = false;
        if self.catalog.is_some() {
            return Completion::Discarded;
        }
        match result {
            Ok(entries) => {
                info!("catalog loaded with {} entries", entries.len());
                self.catalog = Some(CatalogIndex::new(Arc::new(entries)));
                Completion::Stored
            }
            Err(failure) => {
                info!("catalog load failed: {}", failure);
                Completion::Failed(failure)
            }
        }
    }

    // -- lifecycle -----------------------------------------------------------

    /// Drop all state, including in-flight markers. Results for loads begun
    /// before this call will be discarded on arrival.
    pub fn teardown(&mut self) {
        self.session_generation += 1;
        self.account = None;
        self.account_loaded_at = None;
        self.catalog = None;
        self.account_loading = false;
        self.catalog_loading = false;
        self.last_account_failure = None;
        info!(generation = self.session_generation, "session torn down");
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
