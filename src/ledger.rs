// 💰 Ledger - flat list of income/expense entries with derived totals
// Totals are recomputed on every read, never stored

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    /// Parse form input ("income" / "expense", case-insensitive)
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "income" => Some(EntryKind::Income),
            "expense" => Some(EntryKind::Expense),
            _ => None,
        }
    }

    pub fn sign(&self) -> char {
        match self {
            EntryKind::Income => '+',
            EntryKind::Expense => '-',
        }
    }
}

/// One ledger row. Field names match the stored JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Creation timestamp in milliseconds, unique within a ledger
    pub id: i64,

    #[serde(rename = "amt")]
    pub amount: f64,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Aggregates {
    pub income: f64,
    pub expenses: f64,
    pub surplus: f64,
}

/// `{label, value}` pair handed to a chart renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the stored JSON array.
    ///
    /// Rows with a non-positive or non-finite amount are dropped, as are rows
    /// repeating an earlier id. Categories are reset to "General".
    pub fn from_json(json: &str) -> Result<Self> {
        let stored: Vec<LedgerEntry> =
            serde_json::from_str(json).context("Failed to parse ledger JSON")?;

        let total = stored.len();
        let mut seen = HashSet::new();
        let mut repaired = 0usize;
        let mut entries = Vec::with_capacity(total);

        for mut entry in stored {
            if !entry.amount.is_finite() || entry.amount <= 0.0 || !seen.insert(entry.id) {
                continue;
            }
            if entry.category != DEFAULT_CATEGORY {
                entry.category = DEFAULT_CATEGORY.to_string();
                repaired += 1;
            }
            entries.push(entry);
        }

        let dropped = total - entries.len();
        if dropped > 0 || repaired > 0 {
            tracing::warn!(dropped, repaired, kept = entries.len(), "stored ledger had invalid rows");
        }

        Ok(Ledger { entries })
    }

    /// Full snapshot in the stored JSON format
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.entries).context("Failed to serialize ledger")
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry stamped with the current time.
    /// Returns the new id, or None when the amount is rejected.
    pub fn add_entry(&mut self, amount: f64, kind: EntryKind) -> Option<i64> {
        self.add_entry_at(amount, kind, chrono::Utc::now().timestamp_millis())
    }

    /// Form variant: the amount arrives as text
    pub fn add_entry_str(&mut self, amount: &str, kind: EntryKind) -> Option<i64> {
        let amount: f64 = amount.trim().parse().ok()?;
        self.add_entry(amount, kind)
    }

    /// Append with an explicit timestamp. Ids stay strictly increasing even
    /// when two entries land in the same millisecond; once the id space is
    /// exhausted the entry is rejected.
    pub fn add_entry_at(&mut self, amount: f64, kind: EntryKind, timestamp_ms: i64) -> Option<i64> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }

        let id = match self.entries.iter().map(|e| e.id).max() {
            Some(last) if last >= timestamp_ms => match last.checked_add(1) {
                Some(next) => next,
                None => {
                    tracing::warn!(last, "ledger id space exhausted, entry rejected");
                    return None;
                }
            },
            _ => timestamp_ms,
        };

        self.entries.push(LedgerEntry {
            id,
            amount,
            kind,
            category: DEFAULT_CATEGORY.to_string(),
        });

        Some(id)
    }

    /// Remove by id. Unknown ids are a no-op; returns whether anything was removed.
    pub fn remove_entry(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn aggregates(&self) -> Aggregates {
        let income = self.total(EntryKind::Income);
        let expenses = self.total(EntryKind::Expense);

        Aggregates {
            income,
            expenses,
            surplus: income - expenses,
        }
    }

    pub fn chart_slices(&self) -> Vec<ChartSlice> {
        let totals = self.aggregates();
        vec![
            ChartSlice { label: "Income", value: totals.income },
            ChartSlice { label: "Bills", value: totals.expenses },
        ]
    }

    /// Write entries as CSV (id, amount, type, category)
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            wtr.serialize(entry).context("Failed to write ledger row")?;
        }
        wtr.flush().context("Failed to flush ledger CSV")?;
        Ok(())
    }

    fn total(&self, kind: EntryKind) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_amounts() {
        let mut ledger = Ledger::new();

        assert_eq!(ledger.add_entry(0.0, EntryKind::Income), None);
        assert_eq!(ledger.add_entry(-5.0, EntryKind::Expense), None);
        assert_eq!(ledger.add_entry(f64::NAN, EntryKind::Income), None);
        assert_eq!(ledger.add_entry(f64::INFINITY, EntryKind::Income), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_rejects_non_numeric_input() {
        let mut ledger = Ledger::new();

        assert_eq!(ledger.add_entry_str("", EntryKind::Income), None);
        assert_eq!(ledger.add_entry_str("abc", EntryKind::Income), None);
        assert_eq!(ledger.add_entry_str("0", EntryKind::Expense), None);
        assert!(ledger.is_empty());

        assert!(ledger.add_entry_str(" 12.50 ", EntryKind::Expense).is_some());
        assert_eq!(ledger.entries()[0].amount, 12.5);
    }

    #[test]
    fn test_aggregates() {
        let mut ledger = Ledger::new();
        ledger.add_entry(100.0, EntryKind::Income);
        ledger.add_entry(40.0, EntryKind::Expense);

        assert_eq!(
            ledger.aggregates(),
            Aggregates { income: 100.0, expenses: 40.0, surplus: 60.0 }
        );
        assert_eq!(
            ledger.chart_slices(),
            vec![
                ChartSlice { label: "Income", value: 100.0 },
                ChartSlice { label: "Bills", value: 40.0 },
            ]
        );
    }

    #[test]
    fn test_empty_aggregates() {
        assert_eq!(Ledger::new().aggregates(), Aggregates::default());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut ledger = Ledger::new();
        let keep = ledger.add_entry_at(10.0, EntryKind::Income, 1_000).unwrap();
        let gone = ledger.add_entry_at(20.0, EntryKind::Expense, 2_000).unwrap();

        assert!(ledger.remove_entry(gone));
        assert_eq!(ledger.len(), 1);

        assert!(!ledger.remove_entry(gone));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].id, keep);
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let mut ledger = Ledger::new();
        let a = ledger.add_entry_at(1.0, EntryKind::Income, 5_000).unwrap();
        let b = ledger.add_entry_at(2.0, EntryKind::Income, 5_000).unwrap();
        let c = ledger.add_entry_at(3.0, EntryKind::Income, 4_000).unwrap();

        assert_eq!((a, b, c), (5_000, 5_001, 5_002));

        assert!(ledger.remove_entry(b));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_id_overflow_rejects_entry() {
        let mut ledger = Ledger::from_json(
            r#"[{"id":9223372036854775807,"amt":1,"type":"income","category":"General"}]"#,
        )
        .unwrap();

        assert_eq!(ledger.add_entry(5.0, EntryKind::Income), None);
        assert_eq!(ledger.add_entry_at(5.0, EntryKind::Income, 1_000), None);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].id, i64::MAX);
    }

    #[test]
    fn test_from_json_drops_invalid_rows() {
        let ledger = Ledger::from_json(
            r#"[
                {"id":1,"amt":10,"type":"income","category":"General"},
                {"id":2,"amt":0,"type":"income","category":"General"},
                {"id":3,"amt":-4,"type":"expense","category":"General"},
                {"id":1,"amt":99,"type":"expense","category":"General"},
                {"id":4,"amt":7,"type":"expense","category":"Rent"}
            ]"#,
        )
        .unwrap();

        let ids: Vec<i64> = ledger.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(ledger.entries()[0].amount, 10.0);
        assert_eq!(ledger.entries()[1].category, "General");
        assert_eq!(
            ledger.aggregates(),
            Aggregates { income: 10.0, expenses: 7.0, surplus: 3.0 }
        );
    }

    #[test]
    fn test_remove_after_load_drops_exactly_one() {
        let mut ledger = Ledger::from_json(
            r#"[
                {"id":5,"amt":1,"type":"income","category":"General"},
                {"id":5,"amt":2,"type":"income","category":"General"},
                {"id":6,"amt":3,"type":"income","category":"General"}
            ]"#,
        )
        .unwrap();

        assert_eq!(ledger.len(), 2);
        assert!(ledger.remove_entry(5));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_category_is_general() {
        let mut ledger = Ledger::new();
        ledger.add_entry(5.0, EntryKind::Expense);
        assert_eq!(ledger.entries()[0].category, "General");
    }

    #[test]
    fn test_json_matches_stored_format() {
        let mut ledger = Ledger::new();
        ledger.add_entry_at(100.0, EntryKind::Income, 1_700_000_000_000);

        let json = ledger.to_json().unwrap();
        assert_eq!(
            json,
            r#"[{"id":1700000000000,"amt":100.0,"type":"income","category":"General"}]"#
        );

        let restored = Ledger::from_json(r#"[{"id":1,"amt":40,"type":"expense","category":"General"}]"#).unwrap();
        assert_eq!(restored.aggregates().expenses, 40.0);
        assert_eq!(restored.entries()[0].kind, EntryKind::Expense);
    }

    #[test]
    fn test_export_csv() {
        let mut ledger = Ledger::new();
        ledger.add_entry_at(100.0, EntryKind::Income, 1);
        ledger.add_entry_at(40.5, EntryKind::Expense, 2);

        let mut out = Vec::new();
        ledger.export_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();

        assert_eq!(
            csv,
            "id,amt,type,category\n1,100.0,income,General\n2,40.5,expense,General\n"
        );
    }

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!(EntryKind::parse("Income"), Some(EntryKind::Income));
        assert_eq!(EntryKind::parse(" expense "), Some(EntryKind::Expense));
        assert_eq!(EntryKind::parse("transfer"), None);
        assert_eq!(EntryKind::Expense.sign(), '-');
    }
}
