// Power Play - Core Library
// Scan pipeline, dispute letters and the budget ledger, shared by CLI, TUI and API server

pub mod config;
pub mod findings;
pub mod rules;          // Violation rule table
pub mod ocr;            // OCR collaborator
pub mod scanner;        // Scan pipeline (OCR → rules → findings)
pub mod letter;         // Dispute letter template + PDF
pub mod ledger;         // Budget ledger
pub mod store;          // Key-value persistence
pub mod entitlement;    // Plans + checkout collaborator
pub mod state;          // AppState with explicit persist()
pub mod reference;      // Consumer laws, ChexSystems dispute types

// Re-export commonly used types
pub use config::AppConfig;
pub use findings::Finding;
pub use rules::{RuleEngine, ViolationRule};
pub use ocr::{OcrEngine, OcrError, TesseractEngine};
pub use scanner::{ScanError, ScanStage, Scanner, StageListener, SCAN_FAILED_NOTICE};
pub use letter::{DisputeLetter, LetterGenerator};
pub use ledger::{Aggregates, ChartSlice, EntryKind, Ledger, LedgerEntry};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use entitlement::{CheckoutBackend, CheckoutError, Plan, Purchase, StubCheckout};
pub use state::{AppState, LetterOutcome};

use std::sync::Arc;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scanner wired to the configured Tesseract binary and the built-in rules
pub fn scanner_from_config(config: &AppConfig) -> Scanner {
    let ocr = TesseractEngine::new(&config.ocr.tesseract_bin, &config.ocr.language);
    Scanner::new(Arc::new(ocr), RuleEngine::builtin()).with_analysis_delay(config.analysis_delay)
}

/// Install the global tracing subscriber (RUST_LOG overrides the default filter).
/// Logs go to stderr so they never mix with command output.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
