mod app;
mod calendar;
mod clock;
mod crossover;
mod holidays;
mod power;
mod theme;
use crate::app::{App, UiEvent};
use crate::clock::{ClockSource, SystemClock};
use crate::crossover::{CrossoverScheduler, UiGone};
use crate::holidays::{HolidayStyler, Holidays};
use crate::power::{ClockJumpSource, SleepRecoveryMonitor};
use anyhow::Context;
use lexopt::{Arg, Parser};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run { holidays: PathBuf, verbosity: u8 },
    Help,
    Version,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut holidays = PathBuf::from("holidays.conf");
        let mut verbosity = 0u8;
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Long("holidays") => holidays = parser.value()?.into(),
                Arg::Short('v') | Arg::Long("verbose") => {
                    verbosity = verbosity.saturating_add(1);
                }
                _ => return Err(arg.unexpected()),
            }
        }
        Ok(Command::Run {
            holidays,
            verbosity,
        })
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run {
                holidays,
                verbosity,
            } => {
                init_logging(verbosity);
                let today = SystemClock
                    .now()
                    .context("failed to determine local date")?
                    .date();
                let styler = HolidayStyler::new(Holidays::load(&holidays));
                let (ui_tx, ui_rx) = mpsc::channel();
                let post = {
                    let ui_tx = ui_tx.clone();
                    move |date| ui_tx.send(UiEvent::DateChanged(date)).map_err(|_| UiGone)
                };
                let mut scheduler = CrossoverScheduler::start(SystemClock, today, post)
                    .context("failed to start the crossover timer")?;
                let mut monitor =
                    SleepRecoveryMonitor::start(ClockJumpSource::new(), scheduler.handle())
                        .context("failed to start the sleep monitor")?;
                app::spawn_input_thread(ui_tx).context("failed to start the input thread")?;
                let r = with_terminal(|mut terminal| {
                    terminal.hide_cursor().context("failed to hide cursor")?;
                    App::new(today, styler, ui_rx).run(terminal)?;
                    Ok(())
                });
                monitor.shutdown();
                scheduler.shutdown();
                r
            }
            Command::Help => {
                println!("Usage: daywatch [--holidays <FILE>] [-v]");
                println!();
                println!("Terminal month calendar that keeps itself on today");
                println!();
                println!("Options:");
                println!("      --holidays <FILE>  Mark the dates listed in FILE [default: holidays.conf]");
                println!("  -v, --verbose          Log more detail; may be given multiple times");
                println!("  -h, --help             Display this help message and exit");
                println!("  -V, --version          Show the program version and exit");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}
