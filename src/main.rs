use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

mod cli;
mod command;
mod console;
mod datetime;
mod lifecycle;
mod repository;
mod store;
mod timer;

use cli::Args;
use command::TimerCommand;
use console::ConsoleTimerList;
use repository::JsonFileRepository;

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose).context("Failed to initialize logger")?;

    let repository = JsonFileRepository::from_env();
    let color = io::stdout().is_terminal();
    let mut stdout = io::stdout().lock();
    let mut presenter = ConsoleTimerList::new(&mut stdout, color);

    TimerCommand::new(&repository).run(args.subcommand, &mut presenter)
}

/// ログの出力先をstderrに設定する。
///
/// stdoutにはコマンドの結果だけを出力する。`verbose`が大きいほど詳細なログを出す。
fn setup_logger(verbose: u8) -> Result<(), fern::InitError> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()?;

    Ok(())
}
