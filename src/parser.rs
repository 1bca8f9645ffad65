use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::time_entry::TimeEntry;

/// `#1234 作業内容`形式のdescriptionにマッチする。
static WORK_ITEM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9]{4}) (.+)").expect("valid regex"));

/// 1つのタイムエントリーを解釈した結果。
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedEntry {
    pub work_item_id: i64,
    pub label: String,
    pub hours: f64,
    pub stop: DateTime<Utc>,
}

/// タイムエントリーのdescriptionからTargetProcessのwork itemを特定する。
#[derive(Clone, Debug)]
pub struct EntryParser {
    default_work_item: i64,
}

impl EntryParser {
    /// 新しい`EntryParser`を返す。
    ///
    /// # Arguments
    ///
    /// * `default_work_item` - descriptionにwork item IDが含まれない場合に利用するID
    pub fn new(default_work_item: i64) -> Self {
        Self { default_work_item }
    }

    /// タイムエントリーを解釈する。
    ///
    /// descriptionが空の場合や、終了日時が読めない場合はエラーを返す。
    /// 経過時間が0以下のエントリーは呼び出し側で除外しておくこと。
    pub fn parse(&self, entry: &TimeEntry) -> Result<ParsedEntry> {
        let (work_item_id, label) = self.parse_description(entry)?;
        let hours = round_hours(entry.duration.unwrap_or_default() as f64 / 3600.0);
        let stop = entry
            .stop
            .as_deref()
            .with_context(|| format!("Time entry {:?} has no stop time", entry.id))?;
        let stop = DateTime::parse_from_rfc3339(stop)
            .with_context(|| format!("Failed to parse stop time: {}", stop))?
            .to_utc();

        Ok(ParsedEntry {
            work_item_id,
            label,
            hours,
            stop,
        })
    }

    fn parse_description(&self, entry: &TimeEntry) -> Result<(i64, String)> {
        let description = match entry.description.as_deref() {
            Some(description) if !description.is_empty() => description,
            _ => bail!(
                "Description can't be empty! Got {:?} (time entry {:?})",
                entry.description,
                entry.id
            ),
        };

        let parsed = WORK_ITEM_PATTERN.captures(description).and_then(|caps| {
            let id = caps.get(1)?.as_str().parse::<i64>().ok()?;
            let label = caps.get(2)?.as_str().to_string();
            Some((id, label))
        });

        Ok(parsed.unwrap_or_else(|| (self.default_work_item, description.to_string())))
    }
}

/// 時間を小数点以下2桁に丸める。
///
/// `f64`が実際に保持している2進数の値をそのまま10進数にしてから四捨五入する。
/// そのため`0.015`のように2進数で表せない値は`0.01499...`として扱われ、切り下がる。
/// 2進数で表せる中間値(`0.125`など)は切り上げる。
pub fn round_hours(hours: f64) -> f64 {
    Decimal::from_f64_retain(hours)
        .map(|exact| exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_f64())
        .unwrap_or(hours)
}
