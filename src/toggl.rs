use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;

use crate::datetime::to_toggl_format;
use crate::time_entry::TimeEntry;

/// Toggl APIのレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTimeEntry {
    id: Option<i64>,
    description: Option<String>,
    stop: Option<String>,
    duration: Option<i64>,
}

impl From<TogglTimeEntry> for TimeEntry {
    fn from(entry: TogglTimeEntry) -> Self {
        Self {
            id: entry.id,
            description: entry.description,
            duration: entry.duration,
            stop: entry.stop,
        }
    }
}

/// タイムエントリーを取得するためのリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TogglRepository: Send + Sync {
    /// 指定された期間のタイムエントリーを取得する。
    ///
    /// # Arguments
    ///
    /// * `start_at` - 取得するタイムエントリーの開始日時
    /// * `end_at` - 取得するタイムエントリーの終了日時(この時刻を含む)
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>>;
}

/// Toggl APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TogglClient::new(&config.toggl_api_url, &config.toggl_api_token);
/// let time_entries = client.read_time_entries(&start_at, &end_at).await.unwrap();
/// ```
pub struct TogglClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl TogglClient {
    /// 新しい`TogglClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `api_url` - Toggl APIのベースURL
    /// * `api_token` - Toggl APIのトークン
    pub fn new(api_url: &str, api_token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
            api_token: api_token.to_string(),
        }
    }
}

#[async_trait]
impl TogglRepository for TogglClient {
    // ページングは行わず、1回のリクエストで1日分を取得する。
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>> {
        let toggl_time_entries = self
            .client
            .get(format!("{}/me/time_entries", self.api_url))
            .basic_auth(&self.api_token, Some("api_token"))
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("start_date", to_toggl_format(start_at)),
                ("end_date", to_toggl_format(end_at)),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Toggl API at {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Vec<TogglTimeEntry>>()
            .await
            .context("Failed to deserialize response")?;
        info!("length of time entries: {}", toggl_time_entries.len());

        Ok(toggl_time_entries.into_iter().map(TimeEntry::from).collect())
    }
}
