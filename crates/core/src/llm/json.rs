use crate::domain::contract::LlmReport;
use crate::domain::report::{GroundingChunk, Report};
use anyhow::Context;
use uuid::Uuid;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Grounded responses sometimes lead with a sentence; take first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_report(
    text: &str,
    id: Uuid,
    date: String,
    grounding_chunks: Option<Vec<GroundingChunk>>,
) -> anyhow::Result<Report> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmReport>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON for report schema: {json_str}"))?;
    parsed.validate_and_into_report(id, date, grounding_chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::WebSource;
    use serde_json::json;

    fn item(ticker: &str) -> serde_json::Value {
        json!({"ticker": ticker, "name": format!("종목 {ticker}"), "price": "10,000", "change": "+1.0%"})
    }

    fn valid_report_json() -> String {
        json!({
            "reportTitle": "국내 증시 데일리 브리핑 - [2026년 10월 16일]",
            "marketIndices": [
                {"name": "KOSPI", "value": "2,650.45", "change": "+0.8%", "isPositive": true},
                {"name": "VIX", "value": "15.50", "change": "-1.2%", "isPositive": true}
            ],
            "marketOverview": "외국인 순매수",
            "gainers": [item("005930"), item("035420")],
            "losers": [item("373220")],
            "aiTrend": {"rising": [item("042700")], "falling": [], "summary": "HBM 수요"},
            "economicContext": "원달러 환율 1,345원",
            "conclusion": "박스권 예상"
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn parse_report_populates_every_field() {
        let id = Uuid::new_v4();
        let report = parse_report(&valid_report_json(), id, "2026-10-16".to_string(), None).unwrap();
        assert_eq!(report.id, id);
        assert_eq!(report.date, "2026-10-16");
        assert!(report.report_title.starts_with("국내 증시 데일리 브리핑"));
        assert_eq!(report.market_indices.len(), 2);
        assert_eq!(report.gainers.len(), 2);
        assert_eq!(report.losers.len(), 1);
        assert_eq!(report.ai_trend.rising[0].ticker, "042700");
        assert!(!report.market_overview.is_empty());
        assert!(!report.economic_context.is_empty());
        assert!(!report.conclusion.is_empty());
        assert!(report.grounding_chunks.is_none());
    }

    #[test]
    fn parse_report_keeps_attached_citations_as_given() {
        let chunks = vec![
            GroundingChunk {
                web: Some(WebSource {
                    uri: "https://news.example/1".to_string(),
                    title: "뉴스".to_string(),
                }),
            },
            GroundingChunk { web: None },
        ];
        let report = parse_report(
            &valid_report_json(),
            Uuid::nil(),
            "2026-10-16".to_string(),
            Some(chunks.clone()),
        )
        .unwrap();
        assert_eq!(report.grounding_chunks, Some(chunks));
    }

    #[test]
    fn parse_report_rejects_non_json() {
        assert!(parse_report("시장 분석 결과입니다.", Uuid::nil(), String::new(), None).is_err());
    }
}
