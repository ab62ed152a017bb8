pub mod error;
pub mod gemini;
pub mod json;

use crate::domain::report::{Report, TrendAnalysis};
use crate::llm::error::LlmError;
use chrono::{DateTime, Utc};

pub const ANALYSIS_FAILED_TEXT: &str = "분석 중 오류가 발생했습니다.";
pub const ANALYSIS_EMPTY_TEXT: &str = "분석 정보를 가져올 수 없습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

#[async_trait::async_trait]
pub trait MarketAnalyst: Send + Sync {
    fn provider(&self) -> Provider;

    /// One grounded call producing a whole report, or a typed failure.
    async fn generate_report(&self, now: DateTime<Utc>) -> Result<Report, LlmError>;

    /// One grounded free-text call about a single stock.
    async fn try_analyze_trend(&self, ticker: &str, name: &str)
        -> Result<TrendAnalysis, LlmError>;
}

/// Stock analysis never fails towards the caller: errors become a fixed fallback text.
pub async fn analyze_trend(analyst: &dyn MarketAnalyst, ticker: &str, name: &str) -> TrendAnalysis {
    match analyst.try_analyze_trend(ticker, name).await {
        Ok(analysis) => analysis,
        Err(err) => {
            tracing::warn!(
                provider = ?analyst.provider(),
                %ticker,
                %name,
                error = %err,
                "stock trend analysis failed; using fallback text"
            );
            TrendAnalysis {
                text: ANALYSIS_FAILED_TEXT.to_string(),
                grounding_chunks: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingAnalyst;

    #[async_trait::async_trait]
    impl MarketAnalyst for FailingAnalyst {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_report(&self, _now: DateTime<Utc>) -> Result<Report, LlmError> {
            Err(LlmError::MissingCredential)
        }

        async fn try_analyze_trend(
            &self,
            _ticker: &str,
            _name: &str,
        ) -> Result<TrendAnalysis, LlmError> {
            Err(LlmError::EmptyResponse {
                provider: Provider::Gemini,
            })
        }
    }

    #[tokio::test]
    async fn analysis_failure_yields_fallback() {
        let res = analyze_trend(&FailingAnalyst, "005930", "Samsung Electronics").await;
        assert_eq!(res.text, "분석 중 오류가 발생했습니다.");
        assert!(res.grounding_chunks.is_empty());
    }
}
