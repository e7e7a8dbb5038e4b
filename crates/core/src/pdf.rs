use crate::error::IngestError;
use lopdf::Document;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// One way of pulling text out of a PDF.
pub trait PdfExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError>;
}

/// Layout-aware extraction backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutPdfExtractor;

impl PdfExtractor for LayoutPdfExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        // pdf-extract panics on some malformed inputs instead of returning an error.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(error)) => Err(IngestError::PdfParse(error.to_string())),
            Err(_) => Err(IngestError::PdfParse(
                "pdf-extract panicked while reading the document".to_string(),
            )),
        }
    }
}

/// Plain per-page text from `lopdf`, cheaper and more tolerant.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut text = String::new();
        for (page_no, _page_id) in document.get_pages() {
            let page_text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;
            text.push_str(&page_text);
            text.push('\n');
        }

        Ok(text)
    }
}

/// Result of a single strategy attempt.
#[derive(Debug)]
pub enum StrategyOutcome {
    Text(String),
    Empty,
    Failed(IngestError),
}

/// Ordered list of extractors; the first one that yields non-blank text wins.
#[derive(Clone)]
pub struct PdfFallbackChain {
    strategies: Vec<Arc<dyn PdfExtractor>>,
}

impl Default for PdfFallbackChain {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(LayoutPdfExtractor) as Arc<dyn PdfExtractor>,
            Arc::new(LopdfExtractor),
        ])
    }
}

impl std::fmt::Debug for PdfFallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .strategies
            .iter()
            .map(|strategy| strategy.name())
            .collect::<Vec<_>>();
        f.debug_struct("PdfFallbackChain")
            .field("strategies", &names)
            .finish()
    }
}

impl PdfFallbackChain {
    pub fn new(strategies: Vec<Arc<dyn PdfExtractor>>) -> Self {
        Self { strategies }
    }

    pub fn attempt(strategy: &dyn PdfExtractor, bytes: &[u8]) -> StrategyOutcome {
        match strategy.extract_text(bytes) {
            Ok(text) if text.trim().is_empty() => StrategyOutcome::Empty,
            Ok(text) => StrategyOutcome::Text(text.trim().to_string()),
            Err(error) => StrategyOutcome::Failed(error),
        }
    }

    /// Returns trimmed text, or an empty string when every strategy came up dry.
    pub fn extract(&self, bytes: &[u8]) -> String {
        for strategy in &self.strategies {
            match Self::attempt(strategy.as_ref(), bytes) {
                StrategyOutcome::Text(text) => {
                    debug!(strategy = strategy.name(), chars = text.len(), "pdf text extracted");
                    return text;
                }
                StrategyOutcome::Empty => {
                    debug!(strategy = strategy.name(), "pdf strategy returned no text");
                }
                StrategyOutcome::Failed(error) => {
                    warn!(strategy = strategy.name(), %error, "pdf strategy failed");
                }
            }
        }

        String::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct FixedExtractor {
        pub label: &'static str,
        pub result: Result<&'static str, &'static str>,
        pub calls: AtomicUsize,
    }

    impl FixedExtractor {
        pub(crate) fn ok(label: &'static str, text: &'static str) -> Self {
            Self {
                label,
                result: Ok(text),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(label: &'static str) -> Self {
            Self {
                label,
                result: Err("broken xref table"),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PdfExtractor for FixedExtractor {
        fn name(&self) -> &'static str {
            self.label
        }

        fn extract_text(&self, _bytes: &[u8]) -> Result<String, IngestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .map(str::to_string)
                .map_err(|reason| IngestError::PdfParse(reason.to_string()))
        }
    }

    #[test]
    fn primary_text_wins_and_secondary_is_not_called() {
        let primary = Arc::new(FixedExtractor::ok("primary", "  Layout text \n"));
        let secondary = Arc::new(FixedExtractor::ok("secondary", "plain text"));
        let chain = PdfFallbackChain::new(vec![
            primary.clone() as Arc<dyn PdfExtractor>,
            secondary.clone(),
        ]);

        assert_eq!(chain.extract(b"%PDF"), "Layout text");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn whitespace_only_primary_falls_back() {
        let chain = PdfFallbackChain::new(vec![
            Arc::new(FixedExtractor::ok("primary", " \n\t ")) as Arc<dyn PdfExtractor>,
            Arc::new(FixedExtractor::ok("secondary", "Recovered page text\n")),
        ]);

        assert_eq!(chain.extract(b"%PDF"), "Recovered page text");
    }

    #[test]
    fn failing_primary_falls_back() {
        let chain = PdfFallbackChain::new(vec![
            Arc::new(FixedExtractor::failing("primary")) as Arc<dyn PdfExtractor>,
            Arc::new(FixedExtractor::ok("secondary", "Second strategy")),
        ]);

        assert_eq!(chain.extract(b"%PDF"), "Second strategy");
    }

    #[test]
    fn all_strategies_failing_yields_empty_text() {
        let chain = PdfFallbackChain::new(vec![
            Arc::new(FixedExtractor::failing("primary")) as Arc<dyn PdfExtractor>,
            Arc::new(FixedExtractor::ok("secondary", "   ")),
        ]);

        assert_eq!(chain.extract(b"%PDF"), "");
    }

    #[test]
    fn default_chain_survives_garbage_input() {
        let chain = PdfFallbackChain::default();
        assert_eq!(chain.extract(b"%PDF-1.4\n%broken"), "");
    }

    #[test]
    fn attempt_reports_empty_for_blank_text() {
        let strategy = FixedExtractor::ok("blank", "\n\n");
        assert!(matches!(
            PdfFallbackChain::attempt(&strategy, b""),
            StrategyOutcome::Empty
        ));
    }
}
