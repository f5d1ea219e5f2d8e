use chrono::{Local, NaiveDate};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::KeyEvent,
    execute, queue,
    style::{Print, PrintStyledContent, Stylize},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
};
use typealpha::{
    app_dirs::AppDirs,
    clock::Clock,
    config::{Config, ConfigStore, FileConfigStore},
    create_generator, date_to_seed,
    history::{
        best_record, weak_keys, GameRecord, HistoryRepository, HistorySummary, RecordFilter,
        SqliteHistory,
    },
    logging,
    rank::{calculate_rank, RankThresholds},
    runtime::{
        apply_event, map_key, CrosstermEventSource, EventSource, FixedTicker, GameEvent, Runner,
        SessionCommand, Ticker,
    },
    session::{EndReason, GameMode, GameResult, Lifecycle, Session},
    share, today_seed, Seed,
};
use webbrowser::Browser;

/// characters of already-typed text shown left of the cursor
const TRACK_BEFORE: usize = 20;
/// characters of upcoming text shown right of the cursor
const TRACK_AFTER: usize = 40;

/// sixty seconds of focus: seeded practice text, scored keystrokes
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing exercise. Every player gets the same daily text; practice runs draw a fresh seed. Text is weighted by letter frequency and avoids same-finger repeats."
)]
pub struct Cli {
    /// path to a config.json (defaults to the platform config directory)
    #[clap(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// write debug-level logs
    #[clap(short = 'v', long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// play a timed run (today's daily challenge unless --practice)
    Play {
        /// use a random seed instead of today's date
        #[clap(long)]
        practice: bool,

        /// replay a specific seed
        #[clap(long)]
        seed: Option<Seed>,
    },
    /// print the practice text for a seed or date
    Text {
        /// seed to generate from
        #[clap(long, conflicts_with = "date")]
        seed: Option<Seed>,

        /// calendar date (YYYY-MM-DD) whose daily text to print
        #[clap(long)]
        date: Option<NaiveDate>,

        /// number of characters
        #[clap(short = 'n', long, default_value_t = 200)]
        length: usize,

        /// single letters only, no n-gram patterns
        #[clap(long)]
        letters_only: bool,
    },
    /// show past results and weakest keys
    History {
        /// number of recent runs to list
        #[clap(long, default_value_t = 10)]
        recent: usize,

        /// number of weak keys to list
        #[clap(long, default_value_t = 5)]
        weak: usize,
    },
    /// print the rank tier for a WPM value
    Rank {
        #[clap(allow_negative_numbers = true)]
        wpm: f64,
    },
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ExitType {
    Retry,
    Quit,
}

/// Keys understood on the results screen
#[derive(Debug, Clone, Copy, PartialEq)]
enum ResultsAction {
    Retry,
    Share,
    Quit,
}

/// Esc and Ctrl+C quit here just as they cancel a run
fn results_action(key: &KeyEvent) -> Option<ResultsAction> {
    match map_key(key) {
        SessionCommand::Cancel | SessionCommand::Type('q') => Some(ResultsAction::Quit),
        SessionCommand::Type('r') => Some(ResultsAction::Retry),
        SessionCommand::Type('s') => Some(ResultsAction::Share),
        _ => None,
    }
}

/// Everything a run needs besides the terminal
pub struct App {
    config: Config,
    thresholds: RankThresholds,
    history: Option<SqliteHistory>,
}

impl App {
    pub fn new(config: Config, history: Option<SqliteHistory>) -> Result<Self, Box<dyn Error>> {
        config.validate()?;
        let thresholds = RankThresholds::try_from(&config.ranking)?;
        Ok(Self {
            config,
            thresholds,
            history,
        })
    }

    /// Persist a finished run. Cancelled runs are not kept.
    fn record(&mut self, result: &GameResult) {
        if result.end_reason == EndReason::Cancelled {
            return;
        }
        if let Some(history) = self.history.as_mut() {
            let record = GameRecord::from_result(result, Local::now());
            if let Err(e) = history.append(&record) {
                tracing::error!(error = %e, "failed to save result");
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let _log_guard = AppDirs::log_dir().and_then(|dir| logging::init(&dir, cli.verbose).ok());

    let config = cli.config_store().load();
    config.validate()?;

    match cli.command.clone().unwrap_or(Command::Play {
        practice: false,
        seed: None,
    }) {
        Command::Text {
            seed,
            date,
            length,
            letters_only,
        } => {
            let seed = seed
                .or_else(|| date.map(date_to_seed))
                .unwrap_or_else(today_seed);
            println!("{}", practice_text(&config, seed, length, letters_only)?);
        }
        Command::Rank { wpm } => {
            let thresholds = RankThresholds::try_from(&config.ranking)?;
            println!("{}", calculate_rank(wpm, &thresholds));
        }
        Command::History { recent, weak } => {
            let history = SqliteHistory::open_default()?;
            print_history(&history, recent, weak)?;
        }
        Command::Play { practice, seed } => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            let history = SqliteHistory::open_default()
                .map_err(|e| tracing::warn!(error = %e, "history unavailable"))
                .ok();
            let mut app = App::new(config, history)?;
            let mode = if practice {
                GameMode::Practice
            } else {
                GameMode::Daily
            };

            enable_raw_mode()?;
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen, Hide)?;

            let outcome = play(&mut stdout, &mut app, mode, seed);

            execute!(stdout, Show, LeaveAlternateScreen)?;
            disable_raw_mode()?;
            if let Some(result) = outcome? {
                println!("{}", share::summary_text(&result));
            }
        }
    }

    Ok(())
}

fn practice_text(
    config: &Config,
    seed: Seed,
    length: usize,
    letters_only: bool,
) -> Result<String, Box<dyn Error>> {
    let mut generator = create_generator(seed, config)?;
    Ok(if letters_only {
        generator.stream().take(length).collect()
    } else {
        generator.generate(length)
    })
}

/// Play until the player quits. Returns the last completed result, if any.
fn play<W: Write>(
    out: &mut W,
    app: &mut App,
    mode: GameMode,
    seed: Option<Seed>,
) -> Result<Option<GameResult>, Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::seconds());

    loop {
        let seed = seed.unwrap_or_else(|| mode.fresh_seed());
        let mut session = Session::with_system_clock(&app.config)?;
        session.start(mode, seed);
        runner.reset_ticks();

        draw_session(out, &session)?;
        while session.lifecycle() != Lifecycle::Ended {
            let event = runner.step();
            apply_event(&mut session, &event);
            draw_session(out, &session)?;
        }

        let Some(result) = session.result().cloned() else {
            return Ok(None);
        };
        if result.end_reason == EndReason::Cancelled {
            return Ok(None);
        }
        app.record(&result);

        match results_screen(out, app, &result, &mut runner)? {
            ExitType::Retry => continue,
            ExitType::Quit => return Ok(Some(result)),
        }
    }
}

fn draw_session<W: Write, C: Clock>(out: &mut W, session: &Session<C>) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    let label = session.mode().map(|m| m.label()).unwrap_or_default();

    match session.lifecycle() {
        Lifecycle::Countdown => {
            queue!(
                out,
                Print(format!(
                    "{label} - starting in {}",
                    session.countdown_remaining()
                ))
            )?;
        }
        Lifecycle::Running => {
            let live = session.live();
            let time = format!("TIME {:>3}", session.time_remaining());
            let time = if session.time_remaining() <= 10 {
                time.red().bold()
            } else {
                time.bold()
            };
            queue!(
                out,
                PrintStyledContent(time),
                Print(format!(
                    "   WPM {:>3}   ACC {:>3.0}%",
                    live.wpm.round(),
                    live.accuracy
                )),
                MoveTo(0, 2)
            )?;
            draw_track(out, session)?;
        }
        Lifecycle::Idle | Lifecycle::Ended => {}
    }

    queue!(out, MoveTo(0, 4), PrintStyledContent("Esc to quit".dim()))?;
    out.flush()
}

fn draw_track<W: Write, C: Clock>(out: &mut W, session: &Session<C>) -> io::Result<()> {
    let cursor = session.cursor();
    let start = cursor.saturating_sub(TRACK_BEFORE);

    // every accepted keystroke advances the cursor, so stroke i sits at text[i]
    for stroke in &session.strokes()[start..cursor] {
        let styled = if stroke.correct {
            stroke.expected.green()
        } else {
            stroke.expected.red().underlined()
        };
        queue!(out, PrintStyledContent(styled))?;
    }

    let text = session.text();
    if let Some(&current) = text.get(cursor) {
        queue!(out, PrintStyledContent(current.bold().reverse()))?;
    }
    let upcoming: String = text
        .iter()
        .skip(cursor + 1)
        .take(TRACK_AFTER)
        .collect();
    queue!(out, PrintStyledContent(upcoming.dim()))?;
    Ok(())
}

fn results_screen<W: Write, E, T>(
    out: &mut W,
    app: &App,
    result: &GameResult,
    runner: &mut Runner<E, T>,
) -> Result<ExitType, Box<dyn Error>>
where
    E: EventSource,
    T: Ticker,
{
    let rank = result.rank(&app.thresholds);
    let weakest = result
        .weakest_keys(3)
        .iter()
        .map(|(key, accuracy, misses)| {
            format!("{key} {:.0}% ({misses} missed)", accuracy * 100.0)
        })
        .collect::<Vec<_>>()
        .join(", ");

    queue!(
        out,
        Clear(ClearType::All),
        MoveTo(0, 0),
        Print(format!("{} (seed {})", result.mode.label(), result.seed)),
        MoveTo(0, 2),
        PrintStyledContent(format!("RANK {rank}").bold()),
        MoveTo(0, 3),
        Print(format!(
            "WPM {}   ACC {:.1}%   {} correct / {} missed",
            result.wpm.round(),
            result.accuracy,
            result.correct_count,
            result.miss_count
        )),
        MoveTo(0, 4),
        Print(format!(
            "weak keys: {}",
            if weakest.is_empty() { "none" } else { &weakest }
        )),
        MoveTo(0, 6),
        PrintStyledContent("(r)etry  (s)hare  (q)uit".dim()),
    )?;
    out.flush()?;

    loop {
        let GameEvent::Key(key) = runner.step() else {
            continue;
        };
        match results_action(&key) {
            Some(ResultsAction::Retry) => return Ok(ExitType::Retry),
            Some(ResultsAction::Quit) => return Ok(ExitType::Quit),
            Some(ResultsAction::Share) => {
                if Browser::is_available() {
                    webbrowser::open(&share::tweet_url(result)).unwrap_or_default();
                }
            }
            None => {}
        }
    }
}

fn print_history(
    history: &SqliteHistory,
    recent: usize,
    weak: usize,
) -> Result<(), Box<dyn Error>> {
    let records = history.query(&RecordFilter::all())?;
    let summary = HistorySummary::from_records(&records);

    println!(
        "{} runs ({} daily, {} practice)  avg {:.0} WPM  avg {:.1}% ACC  sd {:.1}",
        summary.total,
        summary.daily,
        summary.practice,
        summary.avg_wpm,
        summary.avg_accuracy,
        summary.wpm_std_dev
    );

    let best = |mode: GameMode| {
        let of_mode: Vec<GameRecord> = records.iter().filter(|r| r.mode == mode).cloned().collect();
        best_record(&of_mode)
            .map(|r| format!("{:.0}", r.wpm))
            .unwrap_or_else(|| "---".to_string())
    };
    println!(
        "best: daily {}  practice {}",
        best(GameMode::Daily),
        best(GameMode::Practice)
    );

    let today = history.query(
        &RecordFilter::all()
            .mode(GameMode::Daily)
            .on_date(Local::now().date_naive()),
    )?;
    if let Some(r) = best_record(&today) {
        println!("today: {:.0} WPM", r.wpm);
    }

    let recent_records = history.query(&RecordFilter::all().last(recent))?;
    if !recent_records.is_empty() {
        println!();
        for r in recent_records.iter().rev() {
            println!(
                "{}  {:<8}  {:>4.0} WPM  {:>5.1}%",
                r.date.format("%Y-%m-%d %H:%M"),
                r.mode.to_string(),
                r.wpm,
                r.accuracy
            );
        }
    }

    let weak_list = weak_keys(&records, weak);
    if !weak_list.is_empty() {
        println!();
        for k in weak_list {
            println!("{}  {:>5.1}%  ({} attempts)", k.key, k.accuracy * 100.0, k.count);
        }
    }

    Ok(())
}
