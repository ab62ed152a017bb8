use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Asia::Seoul;

/// Seoul calendar date for `now_utc`.
pub fn seoul_date(now_utc: DateTime<Utc>) -> NaiveDate {
    now_utc.with_timezone(&Seoul).date_naive()
}

/// Korean locale rendering, e.g. `2026. 10. 18. 오후 3:04:05`.
pub fn format_seoul(now_utc: DateTime<Utc>) -> String {
    let t = now_utc.with_timezone(&Seoul);
    let (pm, hour12) = t.hour12();
    let meridiem = if pm { "오후" } else { "오전" };
    format!(
        "{}. {}. {}. {} {}:{:02}:{:02}",
        t.year(),
        t.month(),
        t.day(),
        meridiem,
        hour12,
        t.minute(),
        t.second()
    )
}

/// US locale rendering in New York time, e.g. `10/18/2026, 2:04:05 AM`. DST is applied.
pub fn format_new_york(now_utc: DateTime<Utc>) -> String {
    let t = now_utc.with_timezone(&New_York);
    let (pm, hour12) = t.hour12();
    format!(
        "{}/{}/{}, {}:{:02}:{:02} {}",
        t.month(),
        t.day(),
        t.year(),
        hour12,
        t.minute(),
        t.second(),
        if pm { "PM" } else { "AM" }
    )
}

/// `YYYY년 MM월 DD일` as used in report titles.
pub fn title_date(date: NaiveDate) -> String {
    format!("{}년 {:02}월 {:02}일", date.year(), date.month(), date.day())
}

/// Short axis label, e.g. `10. 18.`.
pub fn short_label(date: NaiveDate) -> String {
    format!("{}. {}.", date.month(), date.day())
}
