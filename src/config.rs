use std::env;

use anyhow::{Context, Result};

/// Toggl APIのデフォルトのURL。
pub const DEFAULT_TOGGL_API_URL: &str = "https://api.track.toggl.com/api/v9";

/// 環境変数から読み込む設定。
///
/// 起動時に一度だけ作成し、各コンポーネントに渡す。
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub toggl_api_token: String,
    pub toggl_api_url: String,
    pub target_process_token: String,
    pub target_process_url: String,
    /// descriptionにwork item IDが含まれない場合に利用するID。
    pub default_work_item: i64,
    /// 予約。リクエストには利用しない。
    pub user_id: Option<i64>,
    /// 予約。リクエストには利用しない。
    pub project_id: Option<i64>,
}

impl Config {
    /// 環境変数から設定を読み込む。
    ///
    /// 次の環境変数が設定されていない場合はエラーを返す。
    ///
    /// - `TOGGL_API_TOKEN`
    /// - `TARGET_PROCESS_API_TOKEN`
    /// - `TARGET_PROCESS_URL`
    /// - `TARGET_PROCESS_DEFAULT_TASK`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の関数から設定を読み込む。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{} must be set", key));
        let parse_id = |key: &str, value: String| {
            value
                .trim()
                .parse::<i64>()
                .with_context(|| format!("{} must be an integer, got {:?}", key, value))
        };

        let toggl_api_token = require("TOGGL_API_TOKEN")?;
        let target_process_token = require("TARGET_PROCESS_API_TOKEN")?;
        let target_process_url = require("TARGET_PROCESS_URL")?
            .trim_end_matches('/')
            .to_string();
        let default_work_item = parse_id(
            "TARGET_PROCESS_DEFAULT_TASK",
            require("TARGET_PROCESS_DEFAULT_TASK")?,
        )?;
        let user_id = get("TARGET_PROCESS_USER_ID")
            .map(|value| parse_id("TARGET_PROCESS_USER_ID", value))
            .transpose()?;
        let project_id = get("TARGET_PROCESS_PROJECT_ID")
            .map(|value| parse_id("TARGET_PROCESS_PROJECT_ID", value))
            .transpose()?;
        let toggl_api_url = get("TOGGL_API_URL")
            .unwrap_or_else(|| DEFAULT_TOGGL_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            toggl_api_token,
            toggl_api_url,
            target_process_token,
            target_process_url,
            default_work_item,
            user_id,
            project_id,
        })
    }
}
