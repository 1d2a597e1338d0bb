//! タイマーの作成・開始・停止・リセット・削除。
//!
//! どの操作の後でも、実行中のタイマーは高々1つになる。

use log::{debug, info};
use thiserror::Error;

use crate::store::TimerStore;
use crate::timer::Timer;

/// タイマー操作のエラー。
///
/// どれも変更を行わずに中断したことを表し、ストアはそのまま保存してよい。
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("Invalid timer ID: {0}")]
    InvalidId(usize),
    #[error("No timers have been created yet")]
    NoTimers,
}

/// `start`の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// 開始した。`stopped`は同時に停止した他のタイマーのid。
    Started { resumed: bool, stopped: Vec<usize> },
    /// 既に実行中だったので何もしなかった。
    AlreadyRunning,
}

/// タグを取り出した新しいタイマーを末尾に追加する。
pub fn create<'a>(store: &'a mut TimerStore, raw_name: &str) -> &'a Timer {
    let timer = Timer::new(store.next_id(), raw_name);
    info!("Create timer {}: {:?}", timer.id, timer.name);
    store.push(timer)
}

/// タイマーを開始し、他の実行中のタイマーを全て停止する。
///
/// 前回の計測が完了しているタイマーは、経過時間を引き継ぐように開始時刻を過去にずらして再開する。
///
/// # Arguments
///
/// * `store` - 対象のストア
/// * `id` - 開始するタイマーのid
/// * `now` - 現在時刻 (UNIX秒)
pub fn start(store: &mut TimerStore, id: usize, now: i64) -> Result<StartOutcome, TimerError> {
    let timer = store.get_mut(id)?;
    if timer.running {
        debug!("Timer {} is already running", id);
        return Ok(StartOutcome::AlreadyRunning);
    }

    let resumed = timer.start != 0 && timer.end != 0;
    timer.start = if resumed {
        now.saturating_sub(timer.end.saturating_sub(timer.start))
    } else {
        now
    };
    timer.end = 0;
    timer.running = true;
    info!("Start timer {} (resumed: {})", id, resumed);

    let mut stopped = Vec::new();
    for (position, other) in store.timers_mut().iter_mut().enumerate() {
        if position != id && other.running {
            other.running = false;
            other.end = now;
            stopped.push(position);
        }
    }
    if !stopped.is_empty() {
        info!("Stopped other running timers: {:?}", stopped);
    }

    Ok(StartOutcome::Started { resumed, stopped })
}

/// 実行中のタイマーを停止し、そのidを返す。実行中のものがなければ`None`。
pub fn stop(store: &mut TimerStore, now: i64) -> Option<usize> {
    let timer = store.timers_mut().iter_mut().find(|timer| timer.running)?;
    timer.end = now;
    timer.running = false;
    info!("Stop timer {}", timer.id);
    Some(timer.id)
}

/// 記録した時間を破棄して未開始の状態に戻す。実行中でも停止する。
pub fn reset(store: &mut TimerStore, id: usize) -> Result<&Timer, TimerError> {
    let timer = store.get_mut(id)?;
    timer.start = 0;
    timer.end = 0;
    timer.running = false;
    info!("Reset timer {}", id);
    Ok(&*timer)
}

/// タイマーを取り除き、後ろのタイマーのidを1つずつ詰める。
pub fn delete(store: &mut TimerStore, id: usize) -> Result<Timer, TimerError> {
    let removed = store.remove(id)?;
    info!("Delete timer {}: {:?}", id, removed.name);
    Ok(removed)
}
