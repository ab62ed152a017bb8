use serde::Serialize;

const RISK_OFF_THRESHOLD: f64 = 25.0;
const CAUTION_THRESHOLD: f64 = 17.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    RiskOff,
    Caution,
    RiskOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Defensive,
    Neutral,
    Bullish,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskInsight {
    pub tier: RiskTier,
    pub stance: Stance,
    pub sentiment: &'static str,
    pub description: &'static str,
    pub stance_label: &'static str,
    pub stance_description: &'static str,
}

/// Maps a volatility reading to a market mood and a suggested stance.
///
/// Lower bounds are inclusive: 25 is already risk-off and 17 is already caution. Anything
/// that is not `>= 17` (NaN included) lands in risk-on.
pub fn classify_vix(value: f64) -> RiskInsight {
    if value >= RISK_OFF_THRESHOLD {
        RiskInsight {
            tier: RiskTier::RiskOff,
            stance: Stance::Defensive,
            sentiment: "위험 회피 (Risk Off)",
            description: "글로벌 변동성이 확대되며 외국인 자금 이탈 가능성이 높습니다.",
            stance_label: "보수적 접근 (Defensive)",
            stance_description: "현금 비중을 확대하고 낙폭 과대 우량주를 선별적으로 관찰하세요.",
        }
    } else if value >= CAUTION_THRESHOLD {
        RiskInsight {
            tier: RiskTier::Caution,
            stance: Stance::Neutral,
            sentiment: "관망세 (Caution)",
            description: "대외 불확실성으로 인해 코스피가 박스권 등락을 보일 수 있습니다.",
            stance_label: "중립 (Neutral)",
            stance_description: "수급 주체가 뚜렷한 섹터 위주로 짧은 호흡의 매매가 유리합니다.",
        }
    } else {
        RiskInsight {
            tier: RiskTier::RiskOn,
            stance: Stance::Bullish,
            sentiment: "위험 선호 (Risk On)",
            description: "시장 심리가 안정적이며 외국인/기관의 순매수 유입이 기대됩니다.",
            stance_label: "비중 확대 (Bullish)",
            stance_description: "반도체, 자동차 등 수출 주도주 및 성장주 비중 확대를 고려하세요.",
        }
    }
}
