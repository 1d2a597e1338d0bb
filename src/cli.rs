use clap::{Parser, Subcommand};

/// 名前付きのタイマーで作業時間を計測するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- create "Write report #work"
/// $ cargo run -- start
/// $ cargo run -- list
/// ```
#[derive(Debug, Parser)]
#[clap(version, about, arg_required_else_help = true, allow_external_subcommands = true)]
pub struct Args {
    #[clap(
        short,
        long,
        global = true,
        parse(from_occurrences),
        help = "Increase log verbosity (-v: info, -vv: debug)"
    )]
    pub verbose: u8,

    #[clap(subcommand)]
    pub subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommands {
    /// Show version number
    Version,
    /// Create a new timer with a name; #tags in the name are extracted
    Create {
        #[clap(required = true)]
        name: Vec<String>,
    },
    /// Start a timer (the last created one by default), and stop all others
    Start { id: Option<usize> },
    /// Stop the running timer
    Stop,
    /// Reset a timer
    Reset { id: usize },
    /// Delete a timer
    Delete { id: usize },
    /// List all timers
    List,
    /// List all timers started today
    Today,
    /// Search for timers by name or tag
    Search { query: String },
    /// Show the status of a timer (the running one by default)
    Status { id: Option<usize> },
    #[clap(external_subcommand)]
    External(Vec<String>),
}

impl SubCommands {
    /// ストアを変更するサブコマンドか。変更するものだけ実行後に保存する。
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            SubCommands::Create { .. }
                | SubCommands::Start { .. }
                | SubCommands::Stop
                | SubCommands::Reset { .. }
                | SubCommands::Delete { .. }
        )
    }
}
