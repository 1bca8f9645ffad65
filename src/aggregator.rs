use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;

use crate::parser::{round_hours, EntryParser, ParsedEntry};
use crate::time_entry::TimeEntry;

/// 同じwork item、同じ作業内容のタイムエントリーをまとめたもの。
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedEntry {
    pub work_item_id: i64,
    pub label: String,
    pub hours: f64,
    /// まとめたタイムエントリーの数。
    pub count: u32,
    /// まとめたタイムエントリーのうち、最も遅い終了日時。
    pub latest_date: DateTime<Utc>,
}

impl AggregatedEntry {
    fn new(parsed: ParsedEntry) -> Self {
        Self {
            work_item_id: parsed.work_item_id,
            label: parsed.label,
            hours: parsed.hours,
            count: 1,
            latest_date: parsed.stop,
        }
    }

    /// 時間は加算のたびに小数点以下2桁へ丸め直す。
    fn merge(&mut self, parsed: ParsedEntry) {
        self.hours = round_hours(self.hours + parsed.hours);
        self.count += 1;
        self.latest_date = self.latest_date.max(parsed.stop);
    }
}

/// タイムエントリーを`(work item ID, 作業内容)`ごとに集計する。
///
/// 経過時間が0以下、または未設定のエントリーは集計対象外とする。
/// 結果は各キーが最初に現れた順に並ぶ。
/// 1つでも解釈できないエントリーがあればエラーを返す。
///
/// # Arguments
///
/// * `time_entries` - Toggl APIから取得した順のタイムエントリー
/// * `parser` - descriptionを解釈するパーサー
pub fn aggregate(time_entries: &[TimeEntry], parser: &EntryParser) -> Result<Vec<AggregatedEntry>> {
    let mut aggregated: Vec<AggregatedEntry> = Vec::new();
    let mut index: HashMap<(i64, String), usize> = HashMap::new();

    for entry in time_entries.iter().filter(|entry| entry.is_finished()) {
        let parsed = parser
            .parse(entry)
            .with_context(|| format!("Failed to parse time entry: {:?}", entry))?;
        let key = (parsed.work_item_id, parsed.label.clone());

        match index.get(&key) {
            Some(&position) => aggregated[position].merge(parsed),
            None => {
                index.insert(key, aggregated.len());
                aggregated.push(AggregatedEntry::new(parsed));
            }
        }
    }
    debug!(
        "Aggregated {} time entries into {} entries",
        time_entries.len(),
        aggregated.len()
    );

    Ok(aggregated)
}
