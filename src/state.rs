// 🧭 App State - ledger + entitlement flag behind one persist() boundary
//
// Every mutation re-serializes the full snapshot. A failed write keeps the
// in-memory state, logs a warning and is retried by the next persist().

use crate::findings::Finding;
use crate::ledger::{Aggregates, EntryKind, Ledger};
use crate::letter::{DisputeLetter, LetterGenerator};
use crate::store::{KeyValueStore, ENTITLEMENT_KEY, LEDGER_KEY};
use anyhow::Result;
use chrono::NaiveDate;

/// Result of asking for a dispute letter
#[derive(Debug, Clone, PartialEq)]
pub enum LetterOutcome {
    Ready(DisputeLetter),
    /// Not entitled: send the user to the upgrade flow instead
    UpgradeRequired,
}

pub struct AppState {
    store: Box<dyn KeyValueStore>,
    ledger: Ledger,
    premium: bool,
    last_persist_error: Option<String>,
}

impl AppState {
    /// Restore from the store. Missing keys mean a fresh session; an
    /// unreadable ledger snapshot is logged and replaced by an empty one.
    pub fn load(store: Box<dyn KeyValueStore>) -> Result<Self> {
        let ledger = match store.get(LEDGER_KEY)? {
            Some(json) => Ledger::from_json(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored ledger unreadable, starting empty");
                Ledger::new()
            }),
            None => Ledger::new(),
        };

        let premium = store.get(ENTITLEMENT_KEY)?.as_deref() == Some("true");

        tracing::debug!(entries = ledger.len(), premium, "app state loaded");

        Ok(AppState {
            store,
            ledger,
            premium,
            last_persist_error: None,
        })
    }

    // ------------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------------

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn aggregates(&self) -> Aggregates {
        self.ledger.aggregates()
    }

    /// Returns the new entry id; invalid amounts are silently ignored
    pub fn add_entry(&mut self, amount: f64, kind: EntryKind) -> Option<i64> {
        let id = self.ledger.add_entry(amount, kind)?;
        self.persist_logged();
        Some(id)
    }

    pub fn add_entry_str(&mut self, amount: &str, kind: EntryKind) -> Option<i64> {
        let id = self.ledger.add_entry_str(amount, kind)?;
        self.persist_logged();
        Some(id)
    }

    pub fn remove_entry(&mut self, id: i64) -> bool {
        let removed = self.ledger.remove_entry(id);
        if removed {
            self.persist_logged();
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Entitlement
    // ------------------------------------------------------------------------

    pub fn is_premium(&self) -> bool {
        self.premium
    }

    /// Profile toggle: flip and persist the flag
    pub fn toggle_premium(&mut self) -> bool {
        self.set_premium(!self.premium);
        self.premium
    }

    pub fn set_premium(&mut self, premium: bool) {
        self.premium = premium;
        self.persist_logged();
    }

    // ------------------------------------------------------------------------
    // Letters
    // ------------------------------------------------------------------------

    pub fn draft_letter(&self, finding: &Finding, date: NaiveDate) -> LetterOutcome {
        if !self.premium {
            return LetterOutcome::UpgradeRequired;
        }
        LetterOutcome::Ready(LetterGenerator::generate(finding, date))
    }

    pub fn draft_letter_today(&self, finding: &Finding) -> LetterOutcome {
        self.draft_letter(finding, chrono::Local::now().date_naive())
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Write the full snapshot (ledger + flag) to the store.
    pub fn persist(&mut self) -> Result<()> {
        let snapshot = self.ledger.to_json()?;
        let result = self
            .store
            .set(LEDGER_KEY, &snapshot)
            .and_then(|_| self.store.set(ENTITLEMENT_KEY, if self.premium { "true" } else { "false" }));

        match &result {
            Ok(()) => self.last_persist_error = None,
            Err(e) => self.last_persist_error = Some(format!("{:#}", e)),
        }
        result
    }

    /// Most recent write failure, cleared by the next successful persist
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    fn persist_logged(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!(error = %format!("{:#}", e), "persist failed, keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Store whose writes can be switched off
    struct FlakyStore {
        inner: MemoryStore,
        failing: Arc<AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.inner.set(key, value)
        }
    }

    fn finding() -> Finding {
        Finding::new("Charge-Off Violation", "15 USC 1681eb", "Maximum possible accuracy failure.")
    }

    #[test]
    fn test_fresh_state() {
        let state = AppState::load(Box::new(MemoryStore::new())).unwrap();
        assert!(state.ledger().is_empty());
        assert!(!state.is_premium());
    }

    #[test]
    fn test_every_mutation_persists_snapshot() {
        let store = MemoryStore::new();
        store.set(ENTITLEMENT_KEY, "true").unwrap();
        store
            .set(LEDGER_KEY, r#"[{"id":1,"amt":100,"type":"income","category":"General"}]"#)
            .unwrap();

        let mut state = AppState::load(Box::new(store)).unwrap();
        assert!(state.is_premium());
        assert_eq!(state.aggregates().income, 100.0);

        let id = state.add_entry(40.0, EntryKind::Expense).unwrap();
        assert_eq!(state.aggregates().surplus, 60.0);

        let stored = state.store.get(LEDGER_KEY).unwrap().unwrap();
        assert_eq!(Ledger::from_json(&stored).unwrap().len(), 2);

        assert!(state.remove_entry(id));
        assert!(!state.remove_entry(id));
        let stored = state.store.get(LEDGER_KEY).unwrap().unwrap();
        assert_eq!(Ledger::from_json(&stored).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_entries_ignored() {
        let mut state = AppState::load(Box::new(MemoryStore::new())).unwrap();
        assert_eq!(state.add_entry(0.0, EntryKind::Income), None);
        assert_eq!(state.add_entry(-5.0, EntryKind::Expense), None);
        assert_eq!(state.add_entry_str("ten", EntryKind::Expense), None);
        assert!(state.ledger().is_empty());
        assert_eq!(state.store.get(LEDGER_KEY).unwrap(), None);
    }

    #[test]
    fn test_toggle_premium_persists() {
        let mut state = AppState::load(Box::new(MemoryStore::new())).unwrap();
        assert!(state.toggle_premium());
        assert_eq!(state.store.get(ENTITLEMENT_KEY).unwrap(), Some("true".to_string()));
        assert!(!state.toggle_premium());
        assert_eq!(state.store.get(ENTITLEMENT_KEY).unwrap(), Some("false".to_string()));
    }

    #[test]
    fn test_letter_gated_by_entitlement() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut state = AppState::load(Box::new(MemoryStore::new())).unwrap();

        assert_eq!(state.draft_letter(&finding(), date), LetterOutcome::UpgradeRequired);

        state.set_premium(true);
        match state.draft_letter(&finding(), date) {
            LetterOutcome::Ready(letter) => {
                assert_eq!(letter.file_name, "dispute-charge-off-violation.pdf")
            }
            LetterOutcome::UpgradeRequired => panic!("premium user should get a letter"),
        }
    }

    #[test]
    fn test_persist_failure_keeps_memory_and_recovers() {
        let failing = Arc::new(AtomicBool::new(true));
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failing: failing.clone(),
        };
        let mut state = AppState::load(Box::new(store)).unwrap();

        state.add_entry(25.0, EntryKind::Income).unwrap();
        assert_eq!(state.ledger().len(), 1);
        assert!(state.last_persist_error().unwrap().contains("disk full"));
        assert_eq!(state.store.get(LEDGER_KEY).unwrap(), None);

        failing.store(false, Ordering::SeqCst);
        state.add_entry(5.0, EntryKind::Expense).unwrap();
        assert_eq!(state.last_persist_error(), None);

        let stored = state.store.get(LEDGER_KEY).unwrap().unwrap();
        assert_eq!(Ledger::from_json(&stored).unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_ledger_starts_empty() {
        let store = MemoryStore::new();
        store.set(LEDGER_KEY, "{not json").unwrap();
        let state = AppState::load(Box::new(store)).unwrap();
        assert!(state.ledger().is_empty());
    }
}
