use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::{PageId, Permissions, TransactionId};

/// Lock mode requested on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Many transactions may read concurrently
    Shared,
    /// A single transaction may read and write
    Exclusive,
}

impl From<Permissions> for LockMode {
    fn from(perm: Permissions) -> Self {
        match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// Lock held on one page. Pages without an entry are unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Shared(HashSet<TransactionId>),
    Exclusive(TransactionId),
}

impl LockState {
    fn is_held_by(&self, tid: TransactionId) -> bool {
        match self {
            LockState::Shared(holders) => holders.contains(&tid),
            LockState::Exclusive(holder) => *holder == tid,
        }
    }
}

#[derive(Default)]
struct LockTable {
    /// Per-page lock state
    page_locks: HashMap<PageId, LockState>,
    /// Reverse index: pages each transaction holds any lock on
    txn_locks: HashMap<TransactionId, HashSet<PageId>>,
}

impl LockTable {
    fn record(&mut self, tid: TransactionId, page_id: PageId) {
        self.txn_locks.entry(tid).or_default().insert(page_id);
    }
}

/// LockManager tracks page-level shared/exclusive locks.
///
/// `acquire` never waits: it grants or denies immediately, and the caller
/// decides whether to retry. All table updates happen under one mutex.
#[derive(Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to lock `page_id` for `tid`. Returns whether the lock was
    /// granted.
    ///
    /// A shared request is granted unless another transaction holds the page
    /// exclusively. An exclusive request is granted when no other transaction
    /// holds the page in any mode; a sole shared holder is upgraded in place.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        let mut guard = self.table.lock();
        let table = &mut *guard;

        let granted = match table.page_locks.get_mut(&page_id) {
            Some(state) => Self::try_grant(state, tid, mode),
            None => {
                let state = match mode {
                    LockMode::Shared => LockState::Shared(HashSet::from([tid])),
                    LockMode::Exclusive => LockState::Exclusive(tid),
                };
                table.page_locks.insert(page_id, state);
                true
            }
        };

        if granted {
            table.record(tid, page_id);
            trace!(%tid, %page_id, ?mode, "lock granted");
        }
        granted
    }

    fn try_grant(state: &mut LockState, tid: TransactionId, mode: LockMode) -> bool {
        match mode {
            LockMode::Shared => match state {
                LockState::Shared(holders) => {
                    holders.insert(tid);
                    true
                }
                // an exclusive lock covers reads by its holder
                LockState::Exclusive(holder) => *holder == tid,
            },
            LockMode::Exclusive => match state {
                LockState::Shared(holders) if holders.len() == 1 && holders.contains(&tid) => {
                    *state = LockState::Exclusive(tid);
                    true
                }
                LockState::Shared(_) => false,
                LockState::Exclusive(holder) => *holder == tid,
            },
        }
    }

    /// Releases whatever lock `tid` holds on `page_id`.
    pub fn release(&self, tid: TransactionId, page_id: PageId) {
        let mut table = self.table.lock();
        Self::release_locked(&mut table, tid, page_id);

        if let Some(pages) = table.txn_locks.get_mut(&tid) {
            pages.remove(&page_id);
            if pages.is_empty() {
                table.txn_locks.remove(&tid);
            }
        }
    }

    /// Releases every lock held by `tid`.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let Some(pages) = table.txn_locks.remove(&tid) else {
            return;
        };

        for page_id in pages {
            Self::release_locked(&mut table, tid, page_id);
        }
        trace!(%tid, "released all locks");
    }

    fn release_locked(table: &mut LockTable, tid: TransactionId, page_id: PageId) {
        let now_unlocked = match table.page_locks.get_mut(&page_id) {
            Some(LockState::Shared(holders)) => {
                holders.remove(&tid);
                holders.is_empty()
            }
            Some(LockState::Exclusive(holder)) => *holder == tid,
            None => false,
        };

        if now_unlocked {
            table.page_locks.remove(&page_id);
        }
    }

    /// Returns true if `tid` holds a lock of either mode on `page_id`.
    pub fn holds(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.table
            .lock()
            .page_locks
            .get(&page_id)
            .is_some_and(|state| state.is_held_by(tid))
    }

    /// Returns the pages `tid` currently holds locks on.
    pub fn pages_locked_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .txn_locks
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns a copy of the lock state of `page_id`, or None when unlocked.
    pub fn lock_state(&self, page_id: PageId) -> Option<LockState> {
        self.table.lock().page_locks.get(&page_id).cloned()
    }
}
