use crate::config::Settings;
use crate::domain::report::{GroundingChunk, Report, TrendAnalysis};
use crate::llm::error::LlmError;
use crate::llm::{json, MarketAnalyst, Provider, ANALYSIS_EMPTY_TEXT};
use crate::session::KeySource;
use crate::time::kr_market;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_REPORT_MODEL: &str = "gemini-3-pro-preview";
const DEFAULT_TREND_MODEL: &str = "gemini-3-flash-preview";

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    keys: KeySource,
    base_url: String,
    report_model: String,
    trend_model: String,
}

impl GeminiClient {
    /// Builds a client reading the key from settings. A missing key is not an error here; the
    /// first call reports it as `LlmError::MissingCredential`.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let report_model = std::env::var("GEMINI_REPORT_MODEL")
            .unwrap_or_else(|_| DEFAULT_REPORT_MODEL.to_string());
        let trend_model = std::env::var("GEMINI_TREND_MODEL")
            .unwrap_or_else(|_| DEFAULT_TREND_MODEL.to_string());

        // No timeout unless asked for; grounded report generation can take minutes.
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build reqwest client")?;

        Ok(Self {
            http,
            keys: KeySource::Static(settings.gemini_api_key.clone()),
            base_url,
            report_model,
            trend_model,
        })
    }

    pub fn with_key_source(mut self, keys: KeySource) -> Self {
        self.keys = keys;
        self
    }

    async fn generate_content(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let api_key = self
            .keys
            .resolve()
            .await
            .ok_or(LlmError::MissingCredential)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );

        let t0 = std::time::Instant::now();
        let res = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(req)
            .send()
            .await
            .map_err(|source| LlmError::Transport {
                provider: Provider::Gemini,
                source,
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|source| LlmError::Transport {
            provider: Provider::Gemini,
            source,
        })?;

        tracing::debug!(
            %model,
            http_status = %status,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "gemini generateContent finished"
        );

        if !status.is_success() {
            return Err(LlmError::from_status(Provider::Gemini, status.as_u16(), text));
        }

        serde_json::from_str::<GenerateContentResponse>(&text).map_err(|err| LlmError::Contract {
            provider: Provider::Gemini,
            detail: format!("failed to decode generateContent response: {err}"),
            raw_output: Some(text),
        })
    }

    fn report_request(now: DateTime<Utc>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(Self::report_prompt(now))],
            tools: vec![Tool::google_search()],
            generation_config: Some(GenerationConfig {
                response_mime_type: JSON_MIME,
                response_schema: Self::report_schema(),
            }),
        }
    }

    fn trend_request(ticker: &str, name: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(Self::trend_prompt(ticker, name))],
            tools: vec![Tool::google_search()],
            generation_config: None,
        }
    }

    fn report_prompt(now: DateTime<Utc>) -> String {
        let title_date = kr_market::title_date(kr_market::seoul_date(now));
        [
            format!("현재 시간 (서울): {}", kr_market::format_seoul(now)),
            format!("현재 시간 (뉴욕): {}", kr_market::format_new_york(now)),
            String::new(),
            "당신은 여의도 증권가의 수석 애널리스트입니다.".to_string(),
            "**반드시 Google Search 도구를 사용하여** 현재 한국 주식 시장(KOSPI, KOSDAQ)과 환율, 글로벌 경제 영향을 분석하세요.".to_string(),
            "**모든 응답은 한국어(Korean)로 작성해야 합니다.**".to_string(),
            String::new(),
            "보고서 작성 요구사항 (JSON 포맷):".to_string(),
            format!("1. reportTitle: \"국내 증시 데일리 브리핑 - [{title_date}]\""),
            "2. marketIndices: 5개 핵심 지표 (KOSPI, KOSDAQ, USD/KRW(원달러 환율), S&P500(참조), VIX).".to_string(),
            "3. marketOverview: 코스피/코스닥 시황 요약 및 외국인/기관 수급 현황 (마크다운).".to_string(),
            "4. gainers: 한국 시장 상승 상위 종목.".to_string(),
            "5. losers: 하락 상위 종목.".to_string(),
            "6. aiTrend: 국내 주도 테마 (반도체/2차전지/AI) 분석.".to_string(),
            "7. economicContext: 환율, 유가 등이 한국 시장에 미치는 영향 (마크다운).".to_string(),
            "8. conclusion: 내일 장 전망 및 전략 (마크다운).".to_string(),
        ]
        .join("\n")
    }

    fn trend_prompt(ticker: &str, name: &str) -> String {
        format!(
            "종목: {name} ({ticker}). Google Search를 사용하여 최근 1개월 흐름과 주요 뉴스를 한국어로 3줄 요약하세요."
        )
    }

    fn report_schema() -> serde_json::Value {
        let stock_item = serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "ticker": {"type": "STRING"},
                "name": {"type": "STRING"},
                "price": {"type": "STRING"},
                "change": {"type": "STRING"}
            },
            "required": ["ticker", "name", "price", "change"]
        });

        serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "reportTitle": {"type": "STRING"},
                "marketIndices": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": {"type": "STRING"},
                            "value": {"type": "STRING"},
                            "change": {"type": "STRING"},
                            "isPositive": {"type": "BOOLEAN"}
                        },
                        "required": ["name", "value", "change", "isPositive"]
                    }
                },
                "marketOverview": {"type": "STRING"},
                "gainers": {"type": "ARRAY", "items": stock_item},
                "losers": {"type": "ARRAY", "items": stock_item},
                "aiTrend": {
                    "type": "OBJECT",
                    "properties": {
                        "rising": {"type": "ARRAY", "items": stock_item},
                        "falling": {"type": "ARRAY", "items": stock_item},
                        "summary": {"type": "STRING"}
                    },
                    "required": ["rising", "falling", "summary"]
                },
                "economicContext": {"type": "STRING"},
                "conclusion": {"type": "STRING"}
            },
            "required": [
                "reportTitle",
                "marketIndices",
                "marketOverview",
                "gainers",
                "losers",
                "aiTrend",
                "economicContext",
                "conclusion"
            ]
        })
    }

    fn response_text(res: &GenerateContentResponse) -> String {
        let mut out = String::new();
        let Some(candidate) = res.candidates.first() else {
            return out;
        };
        let parts = candidate
            .content
            .as_ref()
            .map(|c| c.parts.as_slice())
            .unwrap_or_default();
        for part in parts {
            if part.thought.unwrap_or(false) {
                continue;
            }
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
        out
    }

    fn response_grounding(res: &GenerateContentResponse) -> Option<Vec<GroundingChunk>> {
        res.candidates
            .first()?
            .grounding_metadata
            .as_ref()?
            .grounding_chunks
            .clone()
    }
}

#[async_trait::async_trait]
impl MarketAnalyst for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_report(&self, now: DateTime<Utc>) -> Result<Report, LlmError> {
        let req = Self::report_request(now);
        tracing::info!(model = %self.report_model, "requesting market report");

        let res = self.generate_content(&self.report_model, &req).await?;
        let text = Self::response_text(&res);
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: Provider::Gemini,
            });
        }

        let grounding = Self::response_grounding(&res);
        let citations = grounding.as_ref().map_or(0, Vec::len);
        let date = kr_market::seoul_date(now).to_string();

        let report = json::parse_report(&text, Uuid::new_v4(), date, grounding).map_err(|err| {
            LlmError::Contract {
                provider: Provider::Gemini,
                detail: format!("{err:#}"),
                raw_output: Some(text.clone()),
            }
        })?;

        tracing::info!(
            report_id = %report.id,
            date = %report.date,
            gainers = report.gainers.len(),
            losers = report.losers.len(),
            citations,
            "market report generated"
        );
        Ok(report)
    }

    async fn try_analyze_trend(
        &self,
        ticker: &str,
        name: &str,
    ) -> Result<TrendAnalysis, LlmError> {
        let req = Self::trend_request(ticker, name);
        let res = self.generate_content(&self.trend_model, &req).await?;

        let text = Self::response_text(&res);
        let text = if text.trim().is_empty() {
            ANALYSIS_EMPTY_TEXT.to_string()
        } else {
            text
        };

        Ok(TrendAnalysis {
            text,
            grounding_chunks: Self::response_grounding(&res).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: "user",
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

impl Tool {
    fn google_search() -> Self {
        Self {
            google_search: GoogleSearch {},
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn report_request_declares_search_and_json_output() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let v = serde_json::to_value(GeminiClient::report_request(now)).unwrap();

        assert_eq!(v["tools"], json!([{"google_search": {}}]));
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["contents"][0]["role"], "user");

        let required = v["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 8);
        let props = &v["generationConfig"]["responseSchema"]["properties"];
        assert!(props.get("id").is_none());
        assert!(props.get("date").is_none());
        assert!(props.get("groundingChunks").is_none());
    }

    #[test]
    fn trend_request_is_free_text() {
        let v = serde_json::to_value(GeminiClient::trend_request("005930", "삼성전자")).unwrap();
        assert!(v.get("generationConfig").is_none());
        assert_eq!(v["tools"], json!([{"google_search": {}}]));
        let text = v["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("종목: 삼성전자 (005930)."));
        assert!(text.contains("3줄 요약"));
    }

    #[test]
    fn report_prompt_anchors_both_timezones() {
        // 2026-10-16 00:00 UTC = 09:00 KST = 20:00 EDT on the 15th.
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let prompt = GeminiClient::report_prompt(now);
        assert!(prompt.contains("현재 시간 (서울): 2026. 10. 16. 오전 9:00:00"));
        assert!(prompt.contains("현재 시간 (뉴욕): 10/15/2026, 8:00:00 PM"));
        assert!(prompt.contains("국내 증시 데일리 브리핑 - [2026년 10월 16일]"));
        assert!(prompt.contains("Google Search"));
    }

    #[test]
    fn extracts_text_and_grounding_from_response() {
        let res: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"a\":"},
                    {"text": "1}"}
                ]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "webSearchQueries": ["코스피"],
                    "groundingChunks": [
                        {"web": {"uri": "https://vertexaisearch.cloud.google.com/x", "title": "hankyung.com"}},
                        {}
                    ]
                }
            }],
            "usageMetadata": {"totalTokenCount": 10}
        }))
        .unwrap();

        assert_eq!(GeminiClient::response_text(&res), "{\"a\":1}");
        let chunks = GeminiClient::response_grounding(&res).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].web.as_ref().unwrap().title, "hankyung.com");
        assert!(chunks[1].web.is_none());
    }

    #[test]
    fn missing_grounding_stays_absent() {
        let res: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "요약"}]}}]
        }))
        .unwrap();
        assert!(GeminiClient::response_grounding(&res).is_none());

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(GeminiClient::response_text(&empty), "");
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let settings = Settings {
            gemini_api_key: None,
            sentry_dsn: None,
            preferences_path: "unused.json".into(),
        };
        let client = GeminiClient::from_settings(&settings).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let err = client.generate_report(now).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential));

        let analysis = crate::llm::analyze_trend(&client, "005930", "Samsung Electronics").await;
        assert_eq!(analysis.text, crate::llm::ANALYSIS_FAILED_TEXT);
        assert!(analysis.grounding_chunks.is_empty());
    }
}
