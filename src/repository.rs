use std::{
    env,
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::store::TimerStore;

/// データ置き場を上書きする環境変数。
pub const DIR_ENV: &str = "EDAX_DIR";

const APP_DIR: &str = "edax";
const FILE_NAME: &str = "timers.json";

/// タイマーの保存先を抽象化するtrait。
#[cfg_attr(test, mockall::automock)]
pub trait TimerRepository {
    /// 保存されている全タイマーを読み込む。保存されたものがなければ空のストアを返す。
    fn load(&self) -> Result<TimerStore>;

    /// ストア全体を書き込む。
    fn save(&self, store: &TimerStore) -> Result<()>;
}

/// ユーザの設定ディレクトリ配下の`timers.json`にタイマーを保存する。
///
/// # Examples
///
/// ```ignore
/// let repository = JsonFileRepository::from_env();
/// let store = repository.load()?;
/// ```
pub struct JsonFileRepository {
    dir: Option<PathBuf>,
}

impl JsonFileRepository {
    /// 新しい`JsonFileRepository`を返す。
    ///
    /// 環境変数`EDAX_DIR`が設定されていればそのディレクトリを、なければ`<config dir>/edax`を使う。
    pub fn from_env() -> Self {
        match env::var_os(DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::with_dir(dir),
            _ => Self { dir: None },
        }
    }

    /// 指定したディレクトリを使う`JsonFileRepository`を返す。
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    fn dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .context("Failed to determine the user configuration directory"),
        }
    }

    /// `timers.json`のパスを返す。
    pub fn path(&self) -> Result<PathBuf> {
        Ok(self.dir()?.join(FILE_NAME))
    }
}

impl TimerRepository for JsonFileRepository {
    fn load(&self) -> Result<TimerStore> {
        let path = self.path()?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No timers file at {}", path.display());
                return Ok(TimerStore::new());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to open {}", path.display()))
            }
        };

        let store: TimerStore = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded {} timers from {}", store.len(), path.display());

        Ok(store)
    }

    /// 一時ファイルに書き出してから置き換えるため、失敗しても既存のファイルは残る。
    fn save(&self, store: &TimerStore) -> Result<()> {
        let dir = self.dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let path = dir.join(FILE_NAME);
        let tmp_path = dir.join(format!("{}.tmp", FILE_NAME));
        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, store).context("Failed to serialize timers")?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        info!("Saved {} timers to {}", store.len(), path.display());

        Ok(())
    }
}
