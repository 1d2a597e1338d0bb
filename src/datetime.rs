use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// UNIX秒をLocalタイムゾーンの`YYYY-MM-DD HH:MM:SS`に整形する。`0`は`N/A`。
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp == 0 {
        return "N/A".to_string();
    }
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(local) => local.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}

/// 経過秒数を日・時・分・秒に分解して整形する。
///
/// 0でない単位だけを大きい順に並べる。全て0の場合は`0 seconds`。
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let units = [
        (seconds / 86_400, "day"),
        (seconds % 86_400 / 3_600, "hour"),
        (seconds % 3_600 / 60, "minute"),
        (seconds % 60, "second"),
    ];

    let parts: Vec<String> = units
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            if *value == 1 {
                format!("{} {}", value, unit)
            } else {
                format!("{} {}s", value, unit)
            }
        })
        .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}

/// UNIX秒をLocalタイムゾーンの日付に変換する。
pub fn local_date(timestamp: i64) -> Option<NaiveDate> {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|local| local.date_naive())
}
