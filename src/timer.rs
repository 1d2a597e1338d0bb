use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 名前に埋め込まれたタグ (`#` + 英数字/アンダースコア) にマッチする正規表現。
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").unwrap());

/// タグとその前後の空白。取り除いた跡は空白1つに置き換える。
static TAG_SEAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*#\w+\s*").unwrap());

/// タイマーに付与されたタグ。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// 手動で開始・停止するストップウォッチ1件分の記録。
///
/// `start`と`end`はUNIX秒で、`0`は未設定を表す。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: usize,
    pub name: String,
    pub start: i64,
    pub end: i64,
    pub running: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// タイマーの状態。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Stopped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running => write!(f, "[Running]"),
            Status::Stopped => write!(f, "[Stopped]"),
        }
    }
}

impl Timer {
    /// 生の名前からタグを取り出して、停止状態の新しい`Timer`を返す。
    ///
    /// タグは出現順に保持し、重複も除かない。名前からはタグを取り除き、前後の空白を削る。
    /// タグ以外の部分の空白はそのまま残す。
    ///
    /// # Arguments
    ///
    /// * `id` - 割り当てるid
    /// * `raw_name` - タグを含むかもしれない名前
    pub fn new(id: usize, raw_name: &str) -> Self {
        let tags = TAG_PATTERN
            .find_iter(raw_name)
            .map(|m| Tag {
                name: m.as_str().to_string(),
            })
            .collect();
        let name = TAG_SEAM.replace_all(raw_name, " ").trim().to_string();

        Self {
            id,
            name,
            start: 0,
            end: 0,
            running: false,
            tags,
        }
    }

    pub fn status(&self) -> Status {
        if self.running {
            Status::Running
        } else {
            Status::Stopped
        }
    }

    /// 経過秒数を返す。一度も開始していない場合は`None`。
    ///
    /// 実行中のタイマーは`now`までの経過時間を返す。
    pub fn elapsed(&self, now: i64) -> Option<i64> {
        if self.start == 0 {
            return None;
        }
        let until = if self.running { now } else { self.end };
        Some(until.saturating_sub(self.start).max(0))
    }

    /// 名前またはいずれかのタグ名に`query`が含まれるか (大文字小文字を区別する)。
    pub fn matches(&self, query: &str) -> bool {
        self.name.contains(query) || self.tags.iter().any(|tag| tag.name.contains(query))
    }
}
