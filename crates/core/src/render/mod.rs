//! Text renderings of a report: citation links, per-section copy text and a full markdown
//! document.

use crate::domain::report::{GroundingChunk, Report, StockItem};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

/// Renderable sources. Chunks without `web` are dropped and a blank title shows the uri.
pub fn citations(chunks: Option<&[GroundingChunk]>) -> Vec<Citation> {
    chunks
        .unwrap_or_default()
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter(|web| !web.uri.trim().is_empty())
        .map(|web| Citation {
            title: if web.title.trim().is_empty() {
                web.uri.clone()
            } else {
                web.title.clone()
            },
            uri: web.uri.clone(),
        })
        .collect()
}

pub fn change_is_positive(change: &str) -> bool {
    change.trim_start().starts_with('+')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    MarketOverview,
    Gainers,
    Losers,
    AiTrend,
    AiRising,
    AiFalling,
    EconomicContext,
    Conclusion,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Section::MarketOverview => "시장 동향 요약 (KOSPI & KOSDAQ)",
            Section::Gainers => "상승 상위 종목 (국내)",
            Section::Losers => "하락 상위 종목 (국내)",
            Section::AiTrend => "주도 테마 동향",
            Section::AiRising => "강세 종목 (Rising)",
            Section::AiFalling => "조정/하락세 (Falling)",
            Section::EconomicContext => "환율 및 글로벌 경제 현황",
            Section::Conclusion => "내일 장 전망 및 전략",
        }
    }
}

impl std::str::FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market_overview" => Ok(Section::MarketOverview),
            "gainers" => Ok(Section::Gainers),
            "losers" => Ok(Section::Losers),
            "ai_trend" => Ok(Section::AiTrend),
            "ai_rising" => Ok(Section::AiRising),
            "ai_falling" => Ok(Section::AiFalling),
            "economic_context" => Ok(Section::EconomicContext),
            "conclusion" => Ok(Section::Conclusion),
            other => anyhow::bail!("unknown report section: {other}"),
        }
    }
}

/// Copy text of one section, as placed on the clipboard or handed to a share sheet.
pub fn section_text(report: &Report, section: Section) -> String {
    match section {
        Section::MarketOverview => report.market_overview.clone(),
        Section::EconomicContext => report.economic_context.clone(),
        Section::Conclusion => report.conclusion.clone(),
        Section::AiTrend => format!("테마 요약: {}", report.ai_trend.summary),
        Section::Gainers => table_text(section.title(), &report.gainers),
        Section::Losers => table_text(section.title(), &report.losers),
        Section::AiRising => table_text(section.title(), &report.ai_trend.rising),
        Section::AiFalling => table_text(section.title(), &report.ai_trend.falling),
    }
}

fn table_text(title: &str, items: &[StockItem]) -> String {
    if items.is_empty() {
        return format!("{title}\n데이터 없음");
    }
    let mut out = format!("{title}\n종목명(코드) | 현재가 | 등락률");
    for item in items {
        let _ = write!(
            out,
            "\n{}({}) | {} | {}",
            item.name, item.ticker, item.price, item.change
        );
    }
    out
}

pub fn report_markdown(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", report.report_title);
    let _ = writeln!(out, "\n_{}_\n", report.date);

    if !report.market_indices.is_empty() {
        out.push_str("| 지표 | 값 | 등락 |\n|---|---:|---:|\n");
        for idx in &report.market_indices {
            let _ = writeln!(out, "| {} | {} | {} |", idx.name, idx.value, idx.change);
        }
        out.push('\n');
    }

    push_section(&mut out, Section::MarketOverview.title(), &report.market_overview);
    push_table(&mut out, Section::Gainers.title(), &report.gainers);
    push_table(&mut out, Section::Losers.title(), &report.losers);

    push_section(&mut out, Section::AiTrend.title(), &report.ai_trend.summary);
    push_table(&mut out, Section::AiRising.title(), &report.ai_trend.rising);
    push_table(&mut out, Section::AiFalling.title(), &report.ai_trend.falling);

    push_section(&mut out, Section::EconomicContext.title(), &report.economic_context);
    push_section(&mut out, Section::Conclusion.title(), &report.conclusion);

    let sources = citations(report.grounding_chunks.as_deref());
    if !sources.is_empty() {
        out.push_str("## 참고 자료\n\n");
        for c in &sources {
            let _ = writeln!(out, "- [{}]({})", c.title, c.uri);
        }
    }

    out.trim_end().to_string() + "\n"
}

fn push_section(out: &mut String, title: &str, body: &str) {
    let _ = writeln!(out, "## {title}\n\n{}\n", body.trim());
}

fn push_table(out: &mut String, title: &str, items: &[StockItem]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "### {title}\n");
    out.push_str("| 종목 | 코드 | 현재가 | 등락 |\n|---|---|---:|---:|\n");
    for item in items {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            item.name, item.ticker, item.price, item.change
        );
    }
    out.push('\n');
}
