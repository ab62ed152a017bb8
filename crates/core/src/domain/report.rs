use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndex {
    pub name: String,
    pub value: String,
    pub change: String,
    pub is_positive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub ticker: String,
    pub name: String,
    pub price: String,
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTrend {
    pub rising: Vec<StockItem>,
    pub falling: Vec<StockItem>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// Citation attached to a grounded response. `web` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    /// Seoul calendar date the report was generated on (YYYY-MM-DD).
    pub date: String,
    pub report_title: String,
    pub market_overview: String,
    pub market_indices: Vec<MarketIndex>,
    pub gainers: Vec<StockItem>,
    pub losers: Vec<StockItem>,
    pub ai_trend: AiTrend,
    pub economic_context: String,
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub text: String,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// How the stock was listed in the report; biases the simulated history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendBias {
    Gainer,
    Loser,
    #[default]
    Neutral,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grounding_chunk_without_web_is_legal() {
        let chunks: Vec<GroundingChunk> = serde_json::from_value(json!([
            {"web": {"uri": "https://example.com/a", "title": "A"}},
            {},
            {"retrievedContext": {"uri": "x"}}
        ]))
        .unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].web.is_some());
        assert!(chunks[1].web.is_none());
        assert!(chunks[2].web.is_none());
    }

    #[test]
    fn report_uses_camel_case_on_the_wire() {
        let report = Report {
            id: Uuid::nil(),
            date: "2026-10-16".to_string(),
            report_title: "t".to_string(),
            market_overview: "o".to_string(),
            market_indices: vec![],
            gainers: vec![],
            losers: vec![],
            ai_trend: AiTrend {
                rising: vec![],
                falling: vec![],
                summary: "s".to_string(),
            },
            economic_context: "e".to_string(),
            conclusion: "c".to_string(),
            grounding_chunks: None,
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["reportTitle"], "t");
        assert_eq!(v["aiTrend"]["summary"], "s");
        assert!(v.get("groundingChunks").is_none());
    }
}
