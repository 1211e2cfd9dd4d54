// 📷 Scan Pipeline - image → OCR text → findings
// One scan at a time; a second request while busy is rejected, not queued

use crate::findings::Finding;
use crate::ocr::{OcrEngine, OcrError};
use crate::rules::RuleEngine;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Message shown to the user for every scan failure
pub const SCAN_FAILED_NOTICE: &str = "Scan failed. Ensure document is clear.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Idle,
    RunningOcr,
    Analyzing,
}

impl ScanStage {
    /// Progress text for the indicator; empty when idle
    pub fn status_message(&self) -> &'static str {
        match self {
            ScanStage::Idle => "",
            ScanStage::RunningOcr => "Running OCR Engine...",
            ScanStage::Analyzing => "Analyzing violations...",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ScanStage::RunningOcr,
            2 => ScanStage::Analyzing,
            _ => ScanStage::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ScanStage::Idle => 0,
            ScanStage::RunningOcr => 1,
            ScanStage::Analyzing => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    Busy,

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("OCR returned no text")]
    EmptyText,
}

impl ScanError {
    /// What the user sees. Busy is reported separately; everything else
    /// collapses into the single generic notice.
    pub fn user_notice(&self) -> &'static str {
        match self {
            ScanError::Busy => "A scan is already running.",
            ScanError::Ocr(_) | ScanError::EmptyText => SCAN_FAILED_NOTICE,
        }
    }
}

/// Called on every stage change, including the return to Idle
pub type StageListener = Box<dyn Fn(ScanStage) + Send + Sync>;

pub struct Scanner {
    ocr: Arc<dyn OcrEngine>,
    rules: RuleEngine,
    analysis_delay: Duration,
    stage: AtomicU8,
    listener: Option<StageListener>,
}

impl Scanner {
    pub fn new(ocr: Arc<dyn OcrEngine>, rules: RuleEngine) -> Self {
        Scanner {
            ocr,
            rules,
            analysis_delay: Duration::ZERO,
            stage: AtomicU8::new(ScanStage::Idle.as_u8()),
            listener: None,
        }
    }

    /// Pause between OCR and classification
    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    /// Push stage changes to a progress indicator
    pub fn with_stage_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(ScanStage) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn stage(&self) -> ScanStage {
        ScanStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    pub fn is_scanning(&self) -> bool {
        self.stage() != ScanStage::Idle
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Run the whole pipeline on one image.
    pub async fn scan(&self, image: &[u8]) -> Result<Vec<Finding>, ScanError> {
        let _guard = self.begin()?;
        let scan_id = uuid::Uuid::new_v4();

        tracing::info!(%scan_id, engine = self.ocr.name(), bytes = image.len(), "scan started");

        let text = match self.ocr.recognize(image).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(%scan_id, error = %e, "OCR failed");
                return Err(e.into());
            }
        };

        if text.trim().is_empty() {
            tracing::warn!(%scan_id, "OCR returned no text");
            return Err(ScanError::EmptyText);
        }

        self.set_stage(ScanStage::Analyzing);
        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }

        let findings = self.rules.classify(&text);
        tracing::info!(
            %scan_id,
            findings = findings.len(),
            rules = ?self.rules.matched_rule_ids(&text),
            "scan finished"
        );

        Ok(findings)
    }

    fn begin(&self) -> Result<StageGuard<'_>, ScanError> {
        self.stage
            .compare_exchange(
                ScanStage::Idle.as_u8(),
                ScanStage::RunningOcr.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| {
                tracing::warn!("scan requested while another is in flight");
                ScanError::Busy
            })?;

        self.notify(ScanStage::RunningOcr);
        Ok(StageGuard { scanner: self })
    }

    fn set_stage(&self, stage: ScanStage) {
        self.stage.store(stage.as_u8(), Ordering::Release);
        self.notify(stage);
    }

    fn notify(&self, stage: ScanStage) {
        if let Some(listener) = &self.listener {
            listener(stage);
        }
    }
}

// Returns the scanner to Idle however the scan ends, cancellation included.
struct StageGuard<'a> {
    scanner: &'a Scanner,
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.scanner.set_stage(ScanStage::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct FixedText(&'static str);

    #[async_trait]
    impl OcrEngine for FixedText {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl OcrEngine for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
            Err(OcrError::ProcessingError("unreadable".to_string()))
        }
    }

    /// Blocks inside recognize until released
    struct Gated {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl OcrEngine for Gated {
        fn name(&self) -> &str {
            "gated"
        }

        async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("late payment".to_string())
        }
    }

    fn scanner(ocr: impl OcrEngine + 'static) -> Scanner {
        Scanner::new(Arc::new(ocr), RuleEngine::builtin())
    }

    #[tokio::test]
    async fn test_scan_classifies_ocr_text() {
        let scanner = scanner(FixedText("Account 30 days PAST due, charged off"));
        let findings = scanner.scan(b"img").await.unwrap();

        let titles: Vec<_> = findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Inaccurate Late Payment", "Charge-Off Violation"]);
        assert_eq!(scanner.stage(), ScanStage::Idle);
    }

    #[tokio::test]
    async fn test_scan_fallback_finding() {
        let scanner = scanner(FixedText("Account in good standing"));
        let findings = scanner.scan(b"img").await.unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Metro 2 Data Format Error");
    }

    #[tokio::test]
    async fn test_ocr_failure_is_generic_notice() {
        let scanner = scanner(Failing);
        let err = scanner.scan(b"img").await.unwrap_err();

        assert!(matches!(err, ScanError::Ocr(_)));
        assert_eq!(err.user_notice(), SCAN_FAILED_NOTICE);
        assert!(!scanner.is_scanning());
    }

    #[tokio::test]
    async fn test_empty_ocr_text_fails() {
        let scanner = scanner(FixedText("  \n "));
        let err = scanner.scan(b"img").await.unwrap_err();

        assert!(matches!(err, ScanError::EmptyText));
        assert_eq!(err.user_notice(), SCAN_FAILED_NOTICE);
        assert_eq!(scanner.stage(), ScanStage::Idle);
    }

    #[tokio::test]
    async fn test_listener_sees_every_stage() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let scanner = scanner(FixedText("charge off"))
            .with_stage_listener(move |stage| sink.lock().unwrap().push(stage));

        scanner.scan(b"img").await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ScanStage::RunningOcr, ScanStage::Analyzing, ScanStage::Idle]
        );
    }

    #[tokio::test]
    async fn test_listener_skips_analysis_on_empty_text() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let scanner = scanner(FixedText(""))
            .with_stage_listener(move |stage| sink.lock().unwrap().push(stage));

        assert!(scanner.scan(b"img").await.is_err());
        assert_eq!(*seen.lock().unwrap(), vec![ScanStage::RunningOcr, ScanStage::Idle]);
    }

    #[tokio::test]
    async fn test_stage_is_analyzing_during_delay() {
        let scanner = Arc::new(
            scanner(FixedText("past due")).with_analysis_delay(Duration::from_secs(30)),
        );

        let task = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.scan(b"img").await })
        };

        for _ in 0..1_000 {
            if scanner.stage() == ScanStage::Analyzing {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(scanner.stage(), ScanStage::Analyzing);
        assert_eq!(scanner.stage().status_message(), "Analyzing violations...");
        assert!(scanner.is_scanning());

        // Dropping the scan mid-analysis still releases the busy flag
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(scanner.stage(), ScanStage::Idle);
    }

    #[tokio::test]
    async fn test_second_scan_rejected_while_busy() {
        let gated = Arc::new(Gated {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let scanner = Arc::new(Scanner::new(gated.clone(), RuleEngine::builtin()));

        let first = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.scan(b"first").await })
        };

        gated.entered.notified().await;
        assert_eq!(scanner.stage(), ScanStage::RunningOcr);
        assert_eq!(scanner.stage().status_message(), "Running OCR Engine...");

        let second = scanner.scan(b"second").await;
        assert!(matches!(second, Err(ScanError::Busy)));

        gated.release.notify_one();
        let findings = first.await.unwrap().unwrap();
        assert_eq!(findings[0].title, "Inaccurate Late Payment");

        // Guard released: scanning again is allowed
        assert_eq!(scanner.stage(), ScanStage::Idle);
    }

    #[tokio::test]
    async fn test_analysis_delay_applies() {
        let scanner = scanner(FixedText("late")).with_analysis_delay(Duration::from_millis(20));
        let started = std::time::Instant::now();
        scanner.scan(b"img").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
