use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;

use crate::aggregator::AggregatedEntry;

/// Consoleに集計結果と登録結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// 集計したタイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `entries` - 表示する集計結果
    fn show_aggregated_entries(&mut self, entries: &[AggregatedEntry]) -> Result<()>;

    /// TargetProcessへの登録結果を表示する。失敗した登録は`None`になっている。
    fn show_submission_results(&mut self, results: &[Option<Value>]) -> Result<()>;
}

/// 集計結果をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 集計結果は集計した順のまま表示する。
    fn show_aggregated_entries(&mut self, entries: &[AggregatedEntry]) -> Result<()> {
        for entry in entries {
            writeln!(self.writer, "{}", format_entry(entry))
                .with_context(|| format!("Failed to write aggregated entry: {:?}", entry))?;
        }

        Ok(())
    }

    fn show_submission_results(&mut self, results: &[Option<Value>]) -> Result<()> {
        let json = serde_json::to_string_pretty(results)
            .context("Failed to serialize submission results")?;
        writeln!(self.writer, "{}", json).context("Failed to write submission results")?;

        Ok(())
    }
}

/// 1件の集計結果を表示用の文字列にする。
fn format_entry(entry: &AggregatedEntry) -> String {
    format!(
        "- #{} {}: {:.2}h (count: {}, last {})",
        entry.work_item_id,
        entry.label,
        entry.hours,
        entry.count,
        entry
            .latest_date
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M"),
    )
}

/// 登録してよいかを確認する。
///
/// 1行を読み込み、`y`と入力された場合のみ`true`を返す。
/// 空行や入力の終端を含め、それ以外は全て`false`とする。
pub fn confirm<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<bool> {
    write!(writer, "Proceed(y/n)? ").context("Failed to write prompt")?;
    writer.flush().context("Failed to flush prompt")?;

    let mut answer = String::new();
    reader
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    let answer = answer
        .strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .unwrap_or(answer.as_str());

    Ok(answer == "y")
}
