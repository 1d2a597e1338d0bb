use serde::{Deserialize, Serialize};

use crate::datetime::local_date;
use crate::lifecycle::TimerError;
use crate::timer::Timer;

/// 1回の起動で扱う全タイマーを保持する。
///
/// idは並び順の位置と常に一致させる。読み込み時と削除時に振り直す。
/// JSONではタイマーの配列としてそのまま表現する。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Timer>", into = "Vec<Timer>")]
pub struct TimerStore {
    timers: Vec<Timer>,
}

impl From<TimerStore> for Vec<Timer> {
    fn from(store: TimerStore) -> Self {
        store.timers
    }
}

impl From<Vec<Timer>> for TimerStore {
    fn from(timers: Vec<Timer>) -> Self {
        let mut store = Self { timers };
        store.renumber();
        store
    }
}

impl TimerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn get(&self, id: usize) -> Result<&Timer, TimerError> {
        self.timers.get(id).ok_or(TimerError::InvalidId(id))
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Result<&mut Timer, TimerError> {
        self.timers.get_mut(id).ok_or(TimerError::InvalidId(id))
    }

    pub(crate) fn timers_mut(&mut self) -> &mut [Timer] {
        &mut self.timers
    }

    /// 次に作成するタイマーのid。
    pub fn next_id(&self) -> usize {
        self.timers.len()
    }

    /// 最後に作成したタイマーのid。
    pub fn last_id(&self) -> Option<usize> {
        self.timers.len().checked_sub(1)
    }

    pub(crate) fn push(&mut self, timer: Timer) -> &Timer {
        self.timers.push(timer);
        &self.timers[self.timers.len() - 1]
    }

    pub(crate) fn remove(&mut self, id: usize) -> Result<Timer, TimerError> {
        if id >= self.timers.len() {
            return Err(TimerError::InvalidId(id));
        }
        let removed = self.timers.remove(id);
        self.renumber();
        Ok(removed)
    }

    fn renumber(&mut self) {
        for (position, timer) in self.timers.iter_mut().enumerate() {
            timer.id = position;
        }
    }

    /// 実行中のタイマーのうち最初の1件。
    pub fn running(&self) -> Option<&Timer> {
        self.timers.iter().find(|timer| timer.running)
    }

    /// 名前またはタグに`query`を含むタイマーを並び順のまま返す。
    pub fn search(&self, query: &str) -> Vec<&Timer> {
        self.timers
            .iter()
            .filter(|timer| timer.matches(query))
            .collect()
    }

    /// `now`と同じLocalの日付に開始したタイマーを返す。
    ///
    /// 年・月・日の全てを比較する。未開始のタイマーは含めない。
    pub fn today(&self, now: i64) -> Vec<&Timer> {
        let Some(today) = local_date(now) else {
            return vec![];
        };
        self.timers
            .iter()
            .filter(|timer| timer.start != 0 && local_date(timer.start) == Some(today))
            .collect()
    }

    /// 状態を表示する対象のタイマーを返す。
    ///
    /// idが指定されればそのタイマー、なければ実行中のタイマー。どちらもなければ`None`。
    pub fn status_target(&self, id: Option<usize>) -> Result<Option<&Timer>, TimerError> {
        match id {
            Some(id) => self.get(id).map(Some),
            None => Ok(self.running()),
        }
    }
}
