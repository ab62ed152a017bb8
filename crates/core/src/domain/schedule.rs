use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayToken {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayToken {
    pub const WEEKDAYS: [DayToken; 5] = [
        DayToken::Mon,
        DayToken::Tue,
        DayToken::Wed,
        DayToken::Thu,
        DayToken::Fri,
    ];

    pub fn label_ko(self) -> &'static str {
        match self {
            DayToken::Mon => "월",
            DayToken::Tue => "화",
            DayToken::Wed => "수",
            DayToken::Thu => "목",
            DayToken::Fri => "금",
            DayToken::Sat => "토",
            DayToken::Sun => "일",
        }
    }
}

impl std::str::FromStr for DayToken {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Mon" => Ok(DayToken::Mon),
            "Tue" => Ok(DayToken::Tue),
            "Wed" => Ok(DayToken::Wed),
            "Thu" => Ok(DayToken::Thu),
            "Fri" => Ok(DayToken::Fri),
            "Sat" => Ok(DayToken::Sat),
            "Sun" => Ok(DayToken::Sun),
            other => anyhow::bail!("unknown day token: {other:?} (expected Mon..Sun)"),
        }
    }
}

/// Saved briefing preference. Nothing is delivered from it; it is only stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub is_enabled: bool,
    pub time: String,
    pub days: Vec<DayToken>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            is_enabled: false,
            time: "08:30".to_string(),
            days: DayToken::WEEKDAYS.to_vec(),
        }
    }
}

impl ScheduleConfig {
    /// Saving from the editor always turns the schedule on.
    pub fn enabled(time: &str, days: Vec<DayToken>) -> anyhow::Result<Self> {
        let time = time.trim().to_string();
        validate_time(&time)?;

        // Selection order is kept; repeated toggles must not duplicate a day.
        let mut unique = Vec::with_capacity(days.len());
        for day in days {
            if !unique.contains(&day) {
                unique.push(day);
            }
        }

        Ok(Self {
            is_enabled: true,
            time,
            days: unique,
        })
    }

    /// Turning delivery off keeps the chosen time and days.
    pub fn disabled(&self) -> Self {
        Self {
            is_enabled: false,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_time(&self.time)
    }
}

fn validate_time(time: &str) -> anyhow::Result<()> {
    let (h, m) = time
        .split_once(':')
        .with_context(|| format!("time must be HH:MM (got {time:?})"))?;
    ensure!(
        h.len() == 2 && m.len() == 2,
        "time must be zero-padded HH:MM (got {time:?})"
    );
    let h: u32 = h.parse().with_context(|| format!("invalid hour in {time:?}"))?;
    let m: u32 = m.parse().with_context(|| format!("invalid minute in {time:?}"))?;
    ensure!(h < 24 && m < 60, "time out of range: {time:?}");
    Ok(())
}
