use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::cli::SubCommands;
use crate::console::ConsolePresenter;
use crate::datetime::{self, format_timestamp};
use crate::lifecycle::{self, StartOutcome, TimerError};
use crate::repository::TimerRepository;
use crate::store::TimerStore;

/// サブコマンド1回分の読み込み・実行・表示・保存を行う。
pub struct TimerCommand<'a, R: TimerRepository> {
    repository: &'a R,
}

impl<'a, R: TimerRepository> TimerCommand<'a, R> {
    /// 新しい`TimerCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイマーを読み書きするリポジトリ
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// サブコマンドを実行する。
    ///
    /// 保存済みのタイマーを読み込み、読み込めなければ空のストアとして扱う。
    /// ストアを変更するサブコマンドの場合のみ、実行後にストア全体を保存する。
    ///
    /// # Arguments
    ///
    /// * `subcommand` - 実行するサブコマンド
    /// * `presenter` - 結果を表示する先
    pub fn run<P: ConsolePresenter>(&self, subcommand: SubCommands, presenter: &mut P) -> Result<()> {
        match &subcommand {
            SubCommands::Version => {
                return presenter.show_message(&format!("Edax v{}", env!("CARGO_PKG_VERSION")));
            }
            SubCommands::External(args) => {
                debug!("Ignore unknown command: {:?}", args);
                return Ok(());
            }
            _ => {}
        }

        let mut store = self.repository.load().unwrap_or_else(|err| {
            warn!("Failed to load timers, starting empty: {:#}", err);
            TimerStore::new()
        });
        let now = datetime::now().timestamp();

        let mutates = subcommand.mutates();
        dispatch(&mut store, subcommand, now, presenter)?;

        if mutates {
            self.repository
                .save(&store)
                .context("Failed to save timers")?;
            info!("Timers saved.");
        }

        Ok(())
    }
}

fn dispatch<P: ConsolePresenter>(
    store: &mut TimerStore,
    subcommand: SubCommands,
    now: i64,
    presenter: &mut P,
) -> Result<()> {
    match subcommand {
        SubCommands::Create { name } => {
            let timer = lifecycle::create(store, &name.join(" "));
            presenter.show_message(&format!("Timer {} created with id {}", timer.name, timer.id))
        }
        SubCommands::Start { id } => {
            let result = id
                .or_else(|| store.last_id())
                .ok_or(TimerError::NoTimers)
                .and_then(|id| lifecycle::start(store, id, now).map(|outcome| (id, outcome)));
            match result {
                Ok((id, StartOutcome::Started { resumed, stopped })) => {
                    for other in stopped {
                        let timer = store.get(other)?;
                        presenter.show_message(&format!(
                            "Timer {} stopped at {}",
                            timer.name,
                            format_timestamp(timer.end)
                        ))?;
                    }
                    let timer = store.get(id)?;
                    let verb = if resumed { "resumed" } else { "started" };
                    presenter.show_message(&format!(
                        "Timer {} {} at {}",
                        timer.name,
                        verb,
                        format_timestamp(now)
                    ))
                }
                Ok((_, StartOutcome::AlreadyRunning)) => {
                    presenter.show_message("Timer is already running")
                }
                Err(err) => presenter.show_message(&err.to_string()),
            }
        }
        SubCommands::Stop => match lifecycle::stop(store, now) {
            Some(id) => {
                let timer = store.get(id)?;
                presenter.show_message(&format!(
                    "Timer {} stopped at {}",
                    timer.name,
                    format_timestamp(timer.end)
                ))
            }
            None => presenter.show_message("No running timer"),
        },
        SubCommands::Reset { id } => match lifecycle::reset(store, id) {
            Ok(timer) => presenter.show_message(&format!("Timer {} reset", timer.name)),
            Err(err) => presenter.show_message(&err.to_string()),
        },
        SubCommands::Delete { id } => match lifecycle::delete(store, id) {
            Ok(timer) => presenter.show_message(&format!("Timer {} deleted", timer.name)),
            Err(err) => presenter.show_message(&err.to_string()),
        },
        SubCommands::List => {
            if store.is_empty() {
                return presenter.show_message("No timers created yet");
            }
            let timers: Vec<_> = store.timers().iter().collect();
            presenter.show_timers("Timers List:", &timers, now)
        }
        SubCommands::Today => {
            let timers = store.today(now);
            if timers.is_empty() {
                return presenter.show_message("No timers today");
            }
            presenter.show_timers("Today's Timers:", &timers, now)
        }
        SubCommands::Search { query } => {
            let timers = store.search(&query);
            if timers.is_empty() {
                return presenter.show_message(&format!("No results found for '{}'", query));
            }
            presenter.show_timers(&format!("Search results for '{}':", query), &timers, now)
        }
        SubCommands::Status { id } => match store.status_target(id) {
            Ok(Some(timer)) => presenter.show_status(timer, now),
            Ok(None) => presenter.show_message("No running timer"),
            Err(err) => presenter.show_message(&err.to_string()),
        },
        SubCommands::Version | SubCommands::External(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{Local, TimeZone, Utc};
    use rstest::rstest;

    use super::TimerCommand;
    use crate::cli::SubCommands;
    use crate::console::ConsoleTimerList;
    use crate::datetime::{format_timestamp, mock_datetime};
    use crate::lifecycle::{create, start, stop};
    use crate::repository::MockTimerRepository;
    use crate::store::TimerStore;

    const NOW: i64 = 1_700_000_000;

    fn sample_store() -> TimerStore {
        let mut store = TimerStore::new();
        create(&mut store, "Design #design");
        create(&mut store, "Code #dev");
        store
    }

    /// 読み込み結果を固定し、保存は`expect_saves`回だけ許すモックを作成する。
    fn repository(store: TimerStore, expect_saves: usize) -> MockTimerRepository {
        let mut repository = MockTimerRepository::new();
        repository
            .expect_load()
            .returning(move || Ok(store.clone()));
        repository
            .expect_save()
            .times(expect_saves)
            .returning(|_| Ok(()));
        repository
    }

    /// サブコマンドを実行し、表示された文字列を返す。
    fn run(repository: &MockTimerRepository, subcommand: SubCommands) -> String {
        mock_datetime::set_mock_time(Utc.timestamp_opt(NOW, 0).unwrap());
        let mut writer = Vec::new();
        let mut presenter = ConsoleTimerList::new(&mut writer, false);
        TimerCommand::new(repository)
            .run(subcommand, &mut presenter)
            .unwrap();
        String::from_utf8(writer).unwrap()
    }

    #[test]
    fn test_create_saves_new_timer() {
        let mut repository = MockTimerRepository::new();
        repository.expect_load().returning(|| Ok(TimerStore::new()));
        repository
            .expect_save()
            .withf(|store| {
                let timer = store.get(0).unwrap();
                store.len() == 1
                    && timer.name == "Write report"
                    && timer.tags.iter().map(|t| t.name.as_str()).eq(["#work", "#urgent"])
            })
            .times(1)
            .returning(|_| Ok(()));

        let output = run(
            &repository,
            SubCommands::Create {
                name: vec!["Write report #work #urgent".to_string()],
            },
        );

        assert_eq!(output, "Timer Write report created with id 0\n");
    }

    #[test]
    fn test_start_defaults_to_last_created() {
        let mut repository = MockTimerRepository::new();
        repository.expect_load().returning(|| Ok(sample_store()));
        repository
            .expect_save()
            .withf(|store| {
                !store.get(0).unwrap().running && store.get(1).unwrap().start == NOW
            })
            .times(1)
            .returning(|_| Ok(()));

        let output = run(&repository, SubCommands::Start { id: None });

        assert_eq!(
            output,
            format!("Timer Code started at {}\n", format_timestamp(NOW))
        );
    }

    #[test]
    fn test_start_reports_stopped_timers() {
        let mut store = sample_store();
        start(&mut store, 0, NOW - 60).unwrap();
        let mut repository = MockTimerRepository::new();
        repository.expect_load().returning(move || Ok(store.clone()));
        repository
            .expect_save()
            .withf(|store| {
                let design = store.get(0).unwrap();
                let code = store.get(1).unwrap();
                !design.running && design.end == NOW && code.running
            })
            .times(1)
            .returning(|_| Ok(()));

        let output = run(&repository, SubCommands::Start { id: Some(1) });

        assert_eq!(
            output,
            format!(
                "Timer Design stopped at {0}\nTimer Code started at {0}\n",
                format_timestamp(NOW)
            )
        );
    }

    #[test]
    fn test_start_resumed_timer() {
        let mut store = sample_store();
        start(&mut store, 0, NOW - 500).unwrap();
        stop(&mut store, NOW - 400);

        let output = run(&repository(store, 1), SubCommands::Start { id: Some(0) });

        assert_eq!(
            output,
            format!("Timer Design resumed at {}\n", format_timestamp(NOW))
        );
    }

    #[rstest]
    #[case::invalid_id(sample_store(), SubCommands::Start { id: Some(5) }, "Invalid timer ID: 5\n")]
    #[case::no_timers(TimerStore::new(), SubCommands::Start { id: None }, "No timers have been created yet\n")]
    #[case::stop_nothing(sample_store(), SubCommands::Stop, "No running timer\n")]
    #[case::reset(sample_store(), SubCommands::Reset { id: 1 }, "Timer Code reset\n")]
    #[case::reset_invalid(sample_store(), SubCommands::Reset { id: 2 }, "Invalid timer ID: 2\n")]
    #[case::delete(sample_store(), SubCommands::Delete { id: 0 }, "Timer Design deleted\n")]
    #[case::delete_invalid(sample_store(), SubCommands::Delete { id: 9 }, "Invalid timer ID: 9\n")]
    fn test_mutating_commands_always_save(
        #[case] store: TimerStore,
        #[case] subcommand: SubCommands,
        #[case] expected: &str,
    ) {
        assert_eq!(run(&repository(store, 1), subcommand), expected);
    }

    #[test]
    fn test_start_already_running() {
        let mut store = sample_store();
        start(&mut store, 1, NOW - 10).unwrap();

        let output = run(&repository(store, 1), SubCommands::Start { id: Some(1) });

        assert_eq!(output, "Timer is already running\n");
    }

    #[test]
    fn test_stop_running_timer() {
        let mut store = sample_store();
        start(&mut store, 0, NOW - 90).unwrap();

        let output = run(&repository(store, 1), SubCommands::Stop);

        assert_eq!(
            output,
            format!("Timer Design stopped at {}\n", format_timestamp(NOW))
        );
    }

    #[rstest]
    #[case::status_none(SubCommands::Status { id: None }, "No running timer\n")]
    #[case::status_id(SubCommands::Status { id: Some(0) }, "[0] [Stopped] Design #design Not Started\n")]
    #[case::status_invalid(SubCommands::Status { id: Some(3) }, "Invalid timer ID: 3\n")]
    #[case::search_miss(SubCommands::Search { query: "Design2".into() }, "No results found for 'Design2'\n")]
    #[case::today_none(SubCommands::Today, "No timers today\n")]
    fn test_read_only_commands_do_not_save(#[case] subcommand: SubCommands, #[case] expected: &str) {
        assert_eq!(run(&repository(sample_store(), 0), subcommand), expected);
    }

    #[test]
    fn test_status_reports_running_timer() {
        let mut store = sample_store();
        start(&mut store, 0, NOW - 10).unwrap();
        start(&mut store, 1, NOW - 5).unwrap();

        let output = run(&repository(store, 0), SubCommands::Status { id: None });

        assert_eq!(output, "[1] [Running] Code #dev 5 seconds\n");
    }

    #[test]
    fn test_search_lists_matches() {
        let output = run(
            &repository(sample_store(), 0),
            SubCommands::Search {
                query: "dev".into(),
            },
        );

        assert!(output.starts_with("Search results for 'dev':\n"));
        assert!(output.contains("[1] [Stopped] Code #dev\n"));
        assert!(!output.contains("Design"));
    }

    #[test]
    fn test_today_lists_timers_started_today() {
        let mut store = sample_store();
        let noon = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap().timestamp();
        start(&mut store, 0, noon).unwrap();
        let mut repository = MockTimerRepository::new();
        repository.expect_load().returning(move || Ok(store.clone()));
        repository.expect_save().never();
        mock_datetime::set_mock_time(Utc.timestamp_opt(noon + 60, 0).unwrap());
        let mut writer = Vec::new();
        let mut presenter = ConsoleTimerList::new(&mut writer, false);

        TimerCommand::new(&repository)
            .run(SubCommands::Today, &mut presenter)
            .unwrap();

        let output = String::from_utf8(writer).unwrap();
        assert!(output.starts_with("Today's Timers:\n"));
        assert!(output.contains("[0] [Running] Design #design\n"));
        assert!(output.contains("Duration: 1 minute\n"));
        assert!(!output.contains("Code"));
    }

    #[test]
    fn test_list_empty_store() {
        let output = run(&repository(TimerStore::new(), 0), SubCommands::List);

        assert_eq!(output, "No timers created yet\n");
    }

    #[test]
    fn test_list_shows_all_timers() {
        let output = run(&repository(sample_store(), 0), SubCommands::List);

        assert!(output.starts_with("Timers List:\n"));
        assert!(output.contains("[0] [Stopped] Design #design\n"));
        assert!(output.contains("[1] [Stopped] Code #dev\n"));
    }

    #[test]
    fn test_load_failure_degrades_to_empty_store() {
        let mut repository = MockTimerRepository::new();
        repository
            .expect_load()
            .returning(|| Err(anyhow!("broken json")));
        repository
            .expect_save()
            .withf(|store| store.len() == 1)
            .times(1)
            .returning(|_| Ok(()));

        let output = run(
            &repository,
            SubCommands::Create {
                name: vec!["Fresh".into()],
            },
        );

        assert_eq!(output, "Timer Fresh created with id 0\n");
    }

    #[test]
    fn test_save_failure_is_error() {
        let mut repository = MockTimerRepository::new();
        repository.expect_load().returning(|| Ok(sample_store()));
        repository
            .expect_save()
            .times(1)
            .returning(|_| Err(anyhow!("disk full")));
        let mut writer = Vec::new();
        let mut presenter = ConsoleTimerList::new(&mut writer, false);

        let result = TimerCommand::new(&repository).run(SubCommands::Stop, &mut presenter);

        assert!(result.is_err());
    }

    #[rstest]
    #[case::version(SubCommands::Version, format!("Edax v{}\n", env!("CARGO_PKG_VERSION")))]
    #[case::unknown(SubCommands::External(vec!["frobnicate".into()]), String::new())]
    fn test_commands_without_store(#[case] subcommand: SubCommands, #[case] expected: String) {
        let mut repository = MockTimerRepository::new();
        repository.expect_load().never();
        repository.expect_save().never();

        assert_eq!(run(&repository, subcommand), expected);
    }
}
