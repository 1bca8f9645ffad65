/// Togglから取得した、加工前のタイムエントリー。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeEntry {
    /// Toggl上のID。エラーメッセージにのみ利用する。
    pub id: Option<i64>,
    pub description: Option<String>,
    /// 秒単位の経過時間。計測中のエントリーは負の値になる。
    pub duration: Option<i64>,
    /// ISO-8601形式の終了日時。
    pub stop: Option<String>,
}

impl TimeEntry {
    /// 集計対象となる、終了済みのエントリーかどうかを返す。
    pub fn is_finished(&self) -> bool {
        matches!(self.duration, Some(duration) if duration > 0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::TimeEntry;

    #[rstest]
    #[case::positive(Some(1), true)]
    #[case::zero(Some(0), false)]
    #[case::running(Some(-1_700_000_000), false)]
    #[case::null(None, false)]
    fn test_is_finished(#[case] duration: Option<i64>, #[case] expected: bool) {
        let entry = TimeEntry {
            duration,
            ..Default::default()
        };

        assert_eq!(entry.is_finished(), expected);
    }
}
