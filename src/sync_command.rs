use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde_json::Value;

use crate::aggregator::aggregate;
use crate::console::{confirm, ConsoleMarkdownList, ConsolePresenter};
use crate::datetime::{self, DayWindow};
use crate::parser::EntryParser;
use crate::target_process::{submit, TargetProcessRepository};
use crate::toggl::TogglRepository;

/// 1回の実行の結果。
#[derive(Debug, PartialEq)]
pub enum SyncOutcome {
    /// 確認で`y`以外が入力され、登録しなかった。
    Declined,
    /// 登録を行った。失敗した登録は`None`になる。
    Submitted(Vec<Option<Value>>),
}

/// Togglの1日分のタイムエントリーをTargetProcessに登録する。
pub struct SyncCommand<'a, T: TogglRepository, P: TargetProcessRepository> {
    toggl_client: &'a T,
    target_process_client: &'a P,
    parser: EntryParser,
}

impl<'a, T: TogglRepository, P: TargetProcessRepository> SyncCommand<'a, T, P> {
    /// 新しい`SyncCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `target_process_client` - TargetProcess APIと通信するためのリポジトリ
    /// * `default_work_item` - descriptionにwork item IDが含まれない場合に利用するID
    pub fn new(toggl_client: &'a T, target_process_client: &'a P, default_work_item: i64) -> Self {
        Self {
            toggl_client,
            target_process_client,
            parser: EntryParser::new(default_work_item),
        }
    }

    /// 取得、集計、確認、登録を順に行う。
    ///
    /// Localタイムゾーンで今日から`offset`日後の1日のタイムエントリーを対象とする。
    /// 集計結果は全てのエントリーを解釈できた場合にのみ表示する。
    ///
    /// # Arguments
    ///
    /// * `offset` - 今日からの日数
    /// * `reader` - 確認の入力
    /// * `writer` - 集計結果、確認、登録結果の出力先
    pub async fn run<R: BufRead, W: Write>(
        &self,
        offset: i64,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<SyncOutcome> {
        let window = DayWindow::for_offset(&datetime::now().with_timezone(&Local), offset)
            .context("Failed to compute the day window")?;
        info!("Start at: {}, End at: {}", window.start_param(), window.end_param());

        let time_entries = self
            .toggl_client
            .read_time_entries(&window.start, &window.end)
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");

        let entries = aggregate(&time_entries, &self.parser)
            .context("Failed to aggregate time entries")?;
        ConsoleMarkdownList::new(writer).show_aggregated_entries(&entries)?;

        if !confirm(reader, writer)? {
            info!("Submission cancelled.");
            return Ok(SyncOutcome::Declined);
        }

        let results = submit(self.target_process_client, &entries).await;
        ConsoleMarkdownList::new(writer).show_submission_results(&results)?;

        Ok(SyncOutcome::Submitted(results))
    }
}

/// 日数の引数を解釈する。
///
/// 先頭の符号と数字のみを読み、数字が無い場合は0とする。
/// 例えば`"-1"`は-1、`"2days"`は2、`"abc"`は0になる。
pub fn parse_day_offset(value: Option<&str>) -> i64 {
    let Some(value) = value.map(str::trim_start) else {
        return 0;
    };
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end]
        .parse::<i64>()
        .map(|days| sign * days)
        .unwrap_or(0)
}
