use anyhow::{Context, Result};
use chrono::{DateTime, Days, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// Toggl APIに問い合わせる1日分の期間。
///
/// `end`は翌日の00:00:00の1秒前であり、期間の両端を含む。
#[derive(Clone, Debug, PartialEq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// `now`のタイムゾーンにおける「今日から`offset`日後」の1日を返す。
    ///
    /// # Arguments
    ///
    /// * `now` - 基準となる現在時刻。タイムゾーンの日付境界がそのまま使われる
    /// * `offset` - 今日からの日数。0が今日、負の値が過去
    pub fn for_offset<Tz: TimeZone>(now: &DateTime<Tz>, offset: i64) -> Result<Self> {
        let timezone = now.timezone();
        let today = now.date_naive();
        let days = Days::new(offset.unsigned_abs());
        let day = if offset < 0 {
            today.checked_sub_days(days)
        } else {
            today.checked_add_days(days)
        }
        .with_context(|| format!("Day offset out of range: {}", offset))?;
        let next_day = day
            .succ_opt()
            .with_context(|| format!("Failed to get the day after {}", day))?;

        let start = start_of_day(&timezone, day)?;
        let end = start_of_day(&timezone, next_day)? - Duration::seconds(1);

        Ok(Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }

    /// `start_date`に渡す文字列を返す。
    pub fn start_param(&self) -> String {
        to_toggl_format(&self.start)
    }

    /// `end_date`に渡す文字列を返す。
    pub fn end_param(&self) -> String {
        to_toggl_format(&self.end)
    }
}

/// Toggl APIが受け付ける形式(秒単位、`+00:00`付き)に変換する。
pub fn to_toggl_format(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// 指定したタイムゾーンでの日付の00:00:00を返す。
fn start_of_day<Tz: TimeZone>(timezone: &Tz, day: NaiveDate) -> Result<DateTime<Tz>> {
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .with_context(|| format!("Midnight of {} does not exist in the time zone", day))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};
    use rstest::rstest;

    use super::mock_datetime;
    use super::{to_toggl_format, DayWindow};

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
        mock_datetime::clear_mock_time();
    }

    /// モック時間をリセットした時に、現在時間が取得できることを確認する。
    #[test]
    fn test_now_after_clear_mock_time() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );
        mock_datetime::clear_mock_time();

        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    #[rstest]
    #[case::yesterday(-1, "2024-03-14T00:00:00+00:00", "2024-03-14T23:59:59+00:00")]
    #[case::today(0, "2024-03-15T00:00:00+00:00", "2024-03-15T23:59:59+00:00")]
    #[case::tomorrow(1, "2024-03-16T00:00:00+00:00", "2024-03-16T23:59:59+00:00")]
    #[case::across_month(-15, "2024-02-29T00:00:00+00:00", "2024-02-29T23:59:59+00:00")]
    fn test_window_for_offset(#[case] offset: i64, #[case] start: &str, #[case] end: &str) {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();

        let window = DayWindow::for_offset(&now, offset).unwrap();

        assert_eq!(window.start_param(), start);
        assert_eq!(window.end_param(), end);
    }

    /// 時刻が日の途中でも、日付の境界で区切られることを確認する。
    #[test]
    fn test_window_ignores_time_of_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();

        let window = DayWindow::for_offset(&now, 0).unwrap();

        assert_eq!(window.start_param(), "2024-03-15T00:00:00+00:00");
        assert_eq!(window.end_param(), "2024-03-15T23:59:59+00:00");
    }

    /// UTC以外のタイムゾーンでは、その日付の境界をUTCに変換した期間になる。
    #[test]
    fn test_window_in_other_timezone() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = jst.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();

        let window = DayWindow::for_offset(&now, -1).unwrap();

        assert_eq!(window.start_param(), "2024-03-13T15:00:00+00:00");
        assert_eq!(window.end_param(), "2024-03-14T14:59:59+00:00");
    }

    #[rstest]
    #[case::far_past(-200_000_000_000)]
    #[case::far_future(200_000_000_000)]
    #[case::min(i64::MIN)]
    #[case::max(i64::MAX)]
    fn test_window_out_of_range(#[case] offset: i64) {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();

        let message = DayWindow::for_offset(&now, offset).unwrap_err().to_string();

        assert_eq!(message, format!("Day offset out of range: {}", offset));
    }

    #[test]
    fn test_to_toggl_format_truncates_subseconds() {
        let datetime = DateTime::parse_from_rfc3339("2024-01-01T10:00:00.789Z")
            .unwrap()
            .to_utc();

        assert_eq!(to_toggl_format(&datetime), "2024-01-01T10:00:00+00:00");
    }
}
