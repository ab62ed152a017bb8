use crate::domain::report::{AiTrend, GroundingChunk, MarketIndex, Report, StockItem};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report fields the model is asked to produce. Every field is required; `id`, `date` and
/// grounding chunks are attached client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmReport {
    pub report_title: String,
    pub market_indices: Vec<LlmMarketIndex>,
    pub market_overview: String,
    pub gainers: Vec<LlmStockItem>,
    pub losers: Vec<LlmStockItem>,
    pub ai_trend: LlmAiTrend,
    pub economic_context: String,
    pub conclusion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmMarketIndex {
    pub name: String,
    pub value: String,
    pub change: String,
    pub is_positive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmStockItem {
    pub ticker: String,
    pub name: String,
    pub price: String,
    pub change: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAiTrend {
    pub rising: Vec<LlmStockItem>,
    pub falling: Vec<LlmStockItem>,
    pub summary: String,
}

impl LlmReport {
    pub fn validate_and_into_report(
        self,
        id: Uuid,
        date: String,
        grounding_chunks: Option<Vec<GroundingChunk>>,
    ) -> anyhow::Result<Report> {
        let report_title = non_blank(self.report_title, "reportTitle")?;
        let market_overview = non_blank(self.market_overview, "marketOverview")?;
        let economic_context = non_blank(self.economic_context, "economicContext")?;
        let conclusion = non_blank(self.conclusion, "conclusion")?;

        let market_indices = self
            .market_indices
            .into_iter()
            .map(LlmMarketIndex::into_index)
            .collect();

        Ok(Report {
            id,
            date,
            report_title,
            market_overview,
            market_indices,
            gainers: into_items(self.gainers),
            losers: into_items(self.losers),
            ai_trend: AiTrend {
                rising: into_items(self.ai_trend.rising),
                falling: into_items(self.ai_trend.falling),
                summary: self.ai_trend.summary.trim().to_string(),
            },
            economic_context,
            conclusion,
            grounding_chunks,
        })
    }
}

// Table rows are kept as given, blank codes and names included.
impl LlmMarketIndex {
    fn into_index(self) -> MarketIndex {
        MarketIndex {
            name: self.name.trim().to_string(),
            value: self.value.trim().to_string(),
            change: self.change.trim().to_string(),
            is_positive: self.is_positive,
        }
    }
}

impl LlmStockItem {
    fn into_item(self) -> StockItem {
        StockItem {
            ticker: self.ticker.trim().to_string(),
            name: self.name.trim().to_string(),
            price: self.price.trim().to_string(),
            change: self.change.trim().to_string(),
        }
    }
}

fn into_items(items: Vec<LlmStockItem>) -> Vec<StockItem> {
    items.into_iter().map(LlmStockItem::into_item).collect()
}

fn non_blank(value: String, field: &str) -> anyhow::Result<String> {
    let trimmed = value.trim();
    ensure!(!trimmed.is_empty(), "{field} must be non-empty");
    Ok(trimmed.to_string())
}
