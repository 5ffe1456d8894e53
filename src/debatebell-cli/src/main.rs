//! debatebell CLI - Debate Timer
//!
//! A command-line timer that keeps time for each speech of a debate and
//! rings bells at the right moments.

use clap::Parser;
use colored::Colorize;
use debatebell_core::display::{
    UserCountDirection, display_seconds, elapsed_from_display, secs_to_text,
};
use debatebell_core::{
    AlertEvent, Config, DebateFormat, DebateSequencer, OvertimeBells, StateBundle, TimerState,
    default_debate_format, parse_time,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

/// Key prefix for the debate inside the state file.
const STATE_KEY: &str = "debate";

#[derive(Parser)]
#[command(
    name = "debatebell",
    version,
    about = "Debate timer - keeps time and rings bells for each speech",
    long_about = "A command-line debate timer. Type commands (start, stop, next, prev, reset, reset-debate, set m:ss, status, quit) while it runs. Ctrl-C saves and exits like quit."
)]
struct Cli {
    /// Debate format file (TOML); the built-in format is used if omitted
    #[arg(short, long, value_name = "FILE")]
    format: Option<PathBuf>,

    /// Configuration file (TOML); defaults to $DEBATEBELL_CONFIG
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// State file to resume from and save to on quit; defaults to $DEBATEBELL_STATE
    #[arg(short, long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Seconds after the end of a speech for the first overtime bell
    #[arg(long, value_name = "SECONDS")]
    first_overtime_bell: Option<u64>,

    /// Seconds between later overtime bells
    #[arg(long, value_name = "SECONDS")]
    overtime_bell_period: Option<u64>,

    /// Turn overtime bells off
    #[arg(long)]
    no_overtime_bells: bool,
}

/// A command typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Reset,
    ResetDebate,
    Next,
    Previous,
    Set(u64),
    Status,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };

        let command = match word.to_lowercase().as_str() {
            "start" | "s" => Command::Start,
            "stop" | "x" => Command::Stop,
            "reset" | "r" => Command::Reset,
            "reset-debate" => Command::ResetDebate,
            "next" | "n" => Command::Next,
            "prev" | "previous" | "p" => Command::Previous,
            "status" => Command::Status,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            "set" | "t" => {
                let value = words
                    .next()
                    .ok_or_else(|| "Usage: set <m:ss>".to_string())?;
                Command::Set(parse_time(value).map_err(|e| e.to_string())?)
            }
            other => return Err(format!("Unknown command '{}'. Type 'help'.", other)),
        };

        Ok(Some(command))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| env::var_os("DEBATEBELL_CONFIG").map(PathBuf::from));
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let format = match cli.format {
        Some(ref path) => DebateFormat::load(path)?,
        None => default_debate_format(),
    };

    let overtime = overtime_rule(&cli, &config);
    let count_direction = config.display.count_direction;
    let state_path = cli
        .state
        .clone()
        .or_else(|| env::var_os("DEBATEBELL_STATE").map(PathBuf::from));

    let (alert_tx, alert_rx) = mpsc::unbounded_channel();
    let mut debate = DebateSequencer::new(format, Arc::new(alert_tx))?;
    debate.set_overtime_bells(overtime.first_bell, overtime.period);

    if let Some(ref path) = state_path {
        resume(&mut debate, path)?;
    }

    print_header(&debate, overtime);
    let alerts = tokio::spawn(print_alerts(alert_rx));
    print_status(&debate, count_direction);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupted => {
                println!();
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => Command::Status,
            Err(message) => {
                eprintln!("{} {}", "Error:".red().bold(), message);
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Err(e) = apply(&mut debate, command, count_direction) {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        if command != Command::Help {
            print_status(&debate, count_direction);
        }
    }

    if let Some(ref path) = state_path {
        save_session(&debate, path)?;
        info!(path = %path.display(), "saved debate state");
    }

    // Dropping the sequencer closes the alert channel.
    debate.release();
    alerts.await.ok();

    println!();
    println!("{}", "  Timer closed.".bright_green().bold());
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,debatebell_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Overtime bells from the config file, overridden by command-line flags.
fn overtime_rule(cli: &Cli, config: &Config) -> OvertimeBells {
    if cli.no_overtime_bells {
        return OvertimeBells::DISABLED;
    }
    let mut rule = config.overtime_bells.rule();
    if let Some(first) = cli.first_overtime_bell {
        rule.first_bell = first;
    }
    if let Some(period) = cli.overtime_bell_period {
        rule.period = period;
    }
    rule
}

/// Restore a previous session if the state file exists.
fn resume(debate: &mut DebateSequencer, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(());
    }
    match StateBundle::load(path) {
        Ok(bundle) => {
            debate.restore_state(STATE_KEY, &bundle)?;
            info!(path = %path.display(), speech = debate.current_index(), "resumed debate");
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read state file, starting fresh");
        }
    }
    Ok(())
}

/// Stop the clock and write the debate to the state file.
fn save_session(debate: &DebateSequencer, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if debate.is_running() {
        debate.stop_timer();
    }
    let mut bundle = StateBundle::new();
    debate.save_state(STATE_KEY, &mut bundle);
    bundle.save(path)?;
    Ok(())
}

fn apply(
    debate: &mut DebateSequencer,
    command: Command,
    preference: UserCountDirection,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Start => debate.start_timer()?,
        Command::Stop => debate.stop_timer(),
        Command::Reset => debate.reset_current_speaker(),
        Command::ResetDebate => {
            debate.reset_debate()?;
            println!("{}", "Debate reset to the first speech.".yellow());
        }
        Command::Next => debate.go_to_next()?,
        Command::Previous => debate.go_to_previous()?,
        Command::Set(entered) => {
            // entered as shown, which is time remaining when counting down
            let seconds = match debate.current_speech_format() {
                Some(format) => elapsed_from_display(
                    entered,
                    format.length(),
                    preference.resolve(format.count_direction()),
                ),
                None => entered,
            };
            debate.set_current_speech_time(seconds);
        }
        Command::Help => print_help(),
        Command::Status | Command::Quit => {}
    }
    Ok(())
}

fn print_header(debate: &DebateSequencer, overtime: OvertimeBells) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - {}", "debatebell".bold(), debate.debate_format_name())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{}", "Speeches:".bold());
    let speeches = debate.speech_names().zip(debate.speech_times());
    for (i, (name, time)) in speeches.enumerate() {
        let marker = if i == debate.current_index() { "▶" } else { " " };
        if *time > 0 {
            println!(
                "  {} {}. {} {}",
                marker.bright_cyan(),
                i + 1,
                name,
                secs_to_text(*time as i64).dimmed()
            );
        } else {
            println!("  {} {}. {}", marker.bright_cyan(), i + 1, name);
        }
    }
    if overtime.is_enabled() {
        println!(
            "{} first after {}s, then every {}s",
            "Overtime bells:".bold(),
            overtime.first_bell,
            overtime.period
        );
    } else {
        println!("{} off", "Overtime bells:".bold());
    }
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

fn print_help() {
    println!("  start (s)        start the timer");
    println!("  stop (x)         stop the timer");
    println!("  reset (r)        reset the current speech");
    println!("  reset-debate     clear every speech and go back to the first");
    println!("  next (n)         go to the next speech");
    println!("  prev (p)         go to the previous speech");
    println!("  set <m:ss> (t)   set the current speech time, as displayed");
    println!("  status           show where the debate is up to");
    println!("  quit (q)         save and exit (Ctrl-C does the same)");
}

fn print_status(debate: &DebateSequencer, preference: UserCountDirection) {
    let Some(format) = debate.current_speech_format() else {
        return;
    };
    let direction = preference.resolve(format.count_direction());
    let period = debate.current_period_info();

    let time = secs_to_text(display_seconds(
        debate.current_speech_time(),
        format.length(),
        direction,
    ));
    let time = if debate.is_overtime() {
        time.red().bold()
    } else {
        time.bright_white().bold()
    };

    let next_bell = match debate.next_bell_time() {
        Some(bell) => {
            let text = secs_to_text(display_seconds(bell, format.length(), direction));
            if debate.is_next_bell_pause() {
                format!("next bell {} (pause)", text)
            } else {
                format!("next bell {}", text)
            }
        }
        None => "no more bells".to_string(),
    };

    let state = match debate.status() {
        TimerState::NotStarted => "not started".dimmed(),
        TimerState::Running => "running".green(),
        TimerState::StoppedByUser => "stopped".yellow(),
        TimerState::StoppedByBell => "paused by bell".magenta(),
    };

    println!(
        "{} {} {}",
        format!("[{}/{}]", debate.current_index() + 1, debate.speech_count()).dimmed(),
        debate.current_speech_name().bright_cyan().bold(),
        format!("({})", period.description.as_deref().unwrap_or("")).yellow()
    );
    println!(
        "  {}  {}  {}  {}",
        time,
        next_bell.dimmed(),
        format!("length {}", secs_to_text(format.length() as i64)).dimmed(),
        state
    );
}

/// Print alerts as they arrive from the timer.
async fn print_alerts(mut alerts: UnboundedReceiver<AlertEvent>) {
    while let Some(event) = alerts.recv().await {
        match event {
            AlertEvent::Bell {
                time,
                pause_on_bell,
                period,
            } => {
                let description = period.description.unwrap_or_default();
                println!(
                    "{} {} {}",
                    "🔔 BELL".bright_magenta().bold(),
                    secs_to_text(time as i64).bold(),
                    description.yellow()
                );
                if pause_on_bell {
                    println!("   {}", "Timer paused. Type 'start' to resume.".dimmed());
                }
            }
            AlertEvent::OvertimeBell { time } => {
                println!(
                    "{} {}",
                    "🔔 OVERTIME".red().bold(),
                    secs_to_text(time as i64).bold()
                );
            }
            AlertEvent::WakeForPause => print!("\x07"),
            AlertEvent::Active { .. } | AlertEvent::Inactive => {}
        }
    }
}
