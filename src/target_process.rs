use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{error, info};
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::aggregator::AggregatedEntry;

/// TargetProcessの`Time`リソースに送るリクエストボディ。
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TimeRecord<'a> {
    spent: f64,
    assignable: Assignable,
    description: &'a str,
    date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Assignable {
    id: i64,
}

impl<'a> From<&'a AggregatedEntry> for TimeRecord<'a> {
    fn from(entry: &'a AggregatedEntry) -> Self {
        Self {
            spent: entry.hours,
            assignable: Assignable {
                id: entry.work_item_id,
            },
            description: &entry.label,
            date: to_target_process_date(&entry.latest_date),
        }
    }
}

/// TargetProcessの日付形式`/Date(<ミリ秒>+0000)/`に変換する。
///
/// タイムゾーンは常に`+0000`とする。
pub fn to_target_process_date(date: &DateTime<Utc>) -> String {
    format!("/Date({}+0000)/", date.timestamp_millis())
}

/// 作業時間を登録するためのリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TargetProcessRepository: Send + Sync {
    /// 集計結果を1件の作業時間として登録し、レスポンスを返す。
    async fn log_time(&self, entry: &AggregatedEntry) -> Result<Value>;
}

/// TargetProcess APIと通信するためのクライアント。
pub struct TargetProcessClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl TargetProcessClient {
    /// 新しい`TargetProcessClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `base_url` - TargetProcessのURL(`/api/v1`より前の部分)
    /// * `access_token` - TargetProcessのアクセストークン
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[async_trait]
impl TargetProcessRepository for TargetProcessClient {
    async fn log_time(&self, entry: &AggregatedEntry) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/api/v1/Time", self.base_url))
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("resultFormat", "json"),
            ])
            .json(&TimeRecord::from(entry))
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to TargetProcess at {}", self.base_url)
            })?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Value>()
            .await
            .context("Failed to deserialize response")?;

        Ok(response)
    }
}

/// 集計結果を全て並行に登録する。
///
/// 1件の失敗は他の登録に影響せず、ログに出力した上で結果を`None`とする。
/// 結果は`entries`と同じ順に並ぶ。
pub async fn submit<T: TargetProcessRepository + ?Sized>(
    repository: &T,
    entries: &[AggregatedEntry],
) -> Vec<Option<Value>> {
    let requests = entries.iter().map(|entry| async move {
        match repository.log_time(entry).await {
            Ok(response) => Some(response),
            Err(err) => {
                error!(
                    "Failed to log time for #{} {}: {:#}",
                    entry.work_item_id, entry.label, err
                );
                None
            }
        }
    });
    let results = join_all(requests).await;
    info!(
        "Logged {} of {} entries",
        results.iter().filter(|result| result.is_some()).count(),
        results.len()
    );

    results
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use serde_json::json;

    use super::{
        submit, to_target_process_date, MockTargetProcessRepository, TargetProcessClient,
        TargetProcessRepository,
    };
    use crate::aggregator::AggregatedEntry;

    fn dummy_entry(work_item_id: i64, label: &str) -> AggregatedEntry {
        AggregatedEntry {
            work_item_id,
            label: label.to_string(),
            hours: 1.5,
            count: 2,
            latest_date: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_to_target_process_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(to_target_process_date(&date), "/Date(1704110400000+0000)/");
    }

    #[tokio::test]
    async fn test_log_time() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/Time")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("access_token".into(), "tp-token".into()),
                Matcher::UrlEncoded("resultFormat".into(), "json".into()),
            ]))
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "Spent": 1.5,
                "Assignable": {"Id": 1001},
                "Description": "Build",
                "Date": "/Date(1704110400000+0000)/",
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Id": 555, "Spent": 1.5}"#)
            .create_async()
            .await;

        let client = TargetProcessClient::new(&server.url(), "tp-token");
        let result = client.log_time(&dummy_entry(1001, "Build")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, json!({"Id": 555, "Spent": 1.5}));
    }

    #[tokio::test]
    async fn test_log_time_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/Time")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"Message": "Assignable not found"}"#)
            .create_async()
            .await;

        let client = TargetProcessClient::new(&server.url(), "tp-token");
        let result = client.log_time(&dummy_entry(1001, "Build")).await;

        assert!(result.is_err());
    }

    /// エラーのレスポンスは結果として扱わず、`None`にする。
    #[tokio::test]
    async fn test_submit_error_status_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/Time")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Message": "Assignable not found"}"#)
            .create_async()
            .await;

        let client = TargetProcessClient::new(&server.url(), "tp-token");
        let results = submit(&client, &[dummy_entry(1001, "Build")]).await;

        assert_eq!(results, vec![None]);
    }

    /// 1件の失敗が他の登録を止めず、順序も保たれることを確認する。
    #[tokio::test]
    async fn test_submit_keeps_going_after_failure() {
        let mut repository = MockTargetProcessRepository::new();
        repository
            .expect_log_time()
            .times(3)
            .returning(|entry| match entry.work_item_id {
                2002 => Err(anyhow!("boom")),
                id => Ok(json!({ "Id": id })),
            });
        let entries = [
            dummy_entry(1001, "A"),
            dummy_entry(2002, "B"),
            dummy_entry(3003, "C"),
        ];

        let results = submit(&repository, &entries).await;

        assert_eq!(
            results,
            vec![Some(json!({"Id": 1001})), None, Some(json!({"Id": 3003}))]
        );
    }

    #[tokio::test]
    async fn test_submit_no_entries() {
        let mut repository = MockTargetProcessRepository::new();
        repository.expect_log_time().times(0);

        let results = submit(&repository, &[]).await;

        assert!(results.is_empty());
    }
}
