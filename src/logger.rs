use std::{
    env,
    fs::{self, File},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::{warn, LevelFilter};

const APP_NAME: &str = "toggl-tp";

/// これを超えたログファイルは起動時に退避する。
const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// ロガーを初期化する。
///
/// ログは標準エラー出力に色付きで出力する。
/// データディレクトリが取得できる場合は、ファイルにも出力する。
/// ファイルが開けない場合は警告を出し、標準エラー出力のみで続行する。
/// ログレベルは環境変数`RUST_LOG`で指定し、未指定の場合は`info`とする。
pub fn init() -> Result<()> {
    let level = level_from(env::var("RUST_LOG").ok().as_deref());
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let stderr = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new().level(level).chain(stderr);
    let file_error = match log_file_path().map(|path| open_log_file(&path)) {
        Some(Ok(file)) => {
            dispatch = dispatch.chain(
                fern::Dispatch::new()
                    .format(|out, message, record| {
                        out.finish(format_args!(
                            "[{} {} {}] {}",
                            Local::now().to_rfc3339(),
                            record.level(),
                            record.target(),
                            message
                        ))
                    })
                    .chain(file),
            );
            None
        }
        Some(Err(err)) => Some(err),
        None => None,
    };

    dispatch.apply().context("Failed to initialize logger")?;
    if let Some(err) = file_error {
        warn!("Logging to stderr only: {:#}", err);
    }

    Ok(())
}

/// ログファイルを開く。
///
/// ファイルが`MAX_LOG_BYTES`を超えている場合は`.1`を付けた名前に退避し、新しいファイルに書き込む。
fn open_log_file(path: &Path) -> Result<File> {
    let parent = path.parent().context("Log file has no parent directory")?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;

    let too_large = fs::metadata(path)
        .map(|metadata| metadata.len() > MAX_LOG_BYTES)
        .unwrap_or(false);
    if too_large {
        let rotated = path.with_extension("log.1");
        fs::rename(path, &rotated)
            .with_context(|| format!("Failed to rotate log file: {}", path.display()))?;
    }

    fern::log_file(path).with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// `RUST_LOG`の値からログレベルを決める。
fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| LevelFilter::from_str(value.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

/// ログファイルのパスを返す。
fn log_file_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_NAME).join(format!("{}.log", APP_NAME)))
}
