use std::io::Write;

use anyhow::{Context, Result};
use colored::{Color, Colorize};

use crate::datetime::{format_duration, format_timestamp};
use crate::timer::{Status, Timer};

const SEPARATOR: &str = "------------------------------------------------------";

/// Consoleにタイマーを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイマーの一覧を表示する。
    ///
    /// # Arguments
    ///
    /// * `title` - 一覧の見出し
    /// * `timers` - 表示するタイマー
    /// * `now` - 実行中のタイマーの経過時間を計算する現在時刻 (UNIX秒)
    fn show_timers(&mut self, title: &str, timers: &[&Timer], now: i64) -> Result<()>;

    /// 1件のタイマーの状態を1行で表示する。
    fn show_status(&mut self, timer: &Timer, now: i64) -> Result<()>;

    /// メッセージを1行表示する。
    fn show_message(&mut self, message: &str) -> Result<()>;
}

/// 経過時間の表示文字列。未開始なら`Not Started`。
pub fn duration_text(timer: &Timer, now: i64) -> String {
    timer
        .elapsed(now)
        .map(format_duration)
        .unwrap_or_else(|| "Not Started".to_string())
}

/// タイマーを区切り線付きのリスト形式で表示する。
pub struct ConsoleTimerList<'a, W: Write> {
    writer: &'a mut W,
    color: bool,
}

impl<'a, W: Write> ConsoleTimerList<'a, W> {
    /// 新しい`ConsoleTimerList`を返す。
    ///
    /// `color`が`false`の場合はエスケープシーケンスを出力しない。
    pub fn new(writer: &'a mut W, color: bool) -> Self {
        Self { writer, color }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn status_text(&self, status: Status) -> String {
        let color = match status {
            Status::Running => Color::BrightGreen,
            Status::Stopped => Color::BrightRed,
        };
        self.paint(&status.to_string(), color)
    }

    fn heading(&self, timer: &Timer) -> String {
        let mut line = format!(
            "[{}] {} {}",
            timer.id,
            self.status_text(timer.status()),
            self.paint(&timer.name, Color::BrightYellow)
        );
        for tag in &timer.tags {
            line.push(' ');
            line.push_str(&self.paint(&tag.name, Color::BrightBlue));
        }
        line
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleTimerList<'a, W> {
    fn show_timers(&mut self, title: &str, timers: &[&Timer], now: i64) -> Result<()> {
        let separator = self.paint(SEPARATOR, Color::White);
        writeln!(self.writer, "{}", self.paint(title, Color::White))
            .context("Failed to write timer list title")?;
        writeln!(self.writer, "{}", separator).context("Failed to write separator")?;

        for timer in timers {
            let details = format!(
                "Start: {:<19} End: {:<19} Duration: {}",
                format_timestamp(timer.start),
                format_timestamp(timer.end),
                duration_text(timer, now)
            );
            writeln!(self.writer, "{}", self.heading(timer))
                .with_context(|| format!("Failed to write timer: {:?}", timer))?;
            writeln!(self.writer, "{}", self.paint(&details, Color::White))
                .with_context(|| format!("Failed to write timer: {:?}", timer))?;
            writeln!(self.writer, "{}", separator).context("Failed to write separator")?;
        }

        Ok(())
    }

    fn show_status(&mut self, timer: &Timer, now: i64) -> Result<()> {
        writeln!(
            self.writer,
            "{} {}",
            self.heading(timer),
            self.paint(&duration_text(timer, now), Color::White)
        )
        .with_context(|| format!("Failed to write timer status: {:?}", timer))
    }

    fn show_message(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "{}", message)
            .with_context(|| format!("Failed to write message: {}", message))
    }
}
