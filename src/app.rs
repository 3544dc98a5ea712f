use crate::calendar::{MonthCalendar, MonthGrid};
use crate::holidays::HolidayStyler;
use crate::theme::BASE_STYLE;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::Rect,
    widgets::{StatefulWidget, Widget},
    Terminal,
};
use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use time::Date;
use tracing::warn;

/// Everything the UI thread reacts to, multiplexed over one channel:
/// terminal input forwarded by the input thread, and date crossovers posted
/// by the scheduler's timer thread.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum UiEvent {
    Input(Event),
    DateChanged(Date),
}

/// The UI-owning execution context.  All grid rebuilds happen here, exactly
/// one per received `DateChanged`.
#[derive(Debug)]
pub(crate) struct App {
    grid: MonthGrid,
    styler: HolidayStyler,
    events: Receiver<UiEvent>,
    quitting: bool,
}

impl App {
    pub(crate) fn new(today: Date, styler: HolidayStyler, events: Receiver<UiEvent>) -> App {
        App {
            grid: MonthGrid::new(today, &styler),
            styler,
            events,
            quitting: false,
        }
    }

    pub(crate) fn run<B: Backend>(mut self, mut terminal: Terminal<B>) -> io::Result<()> {
        while !self.quitting {
            self.draw(&mut terminal)?;
            match self.events.recv() {
                Ok(event) => self.handle_event(event),
                // every sender hung up; nothing further can happen
                Err(_) => break,
            }
        }
        Ok(())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        terminal.draw(|frame| frame.render_widget(self, frame.area()))?;
        Ok(())
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Input(input) => self.handle_input(&input),
            UiEvent::DateChanged(date) => self.rebuild(date),
        }
    }

    fn handle_input(&mut self, event: &Event) {
        if let Some(key) = event.as_key_press_event() {
            let ctrl_c = key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c');
            if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                self.quitting = true;
            }
        }
        // anything else (a resize, say) just falls through to a redraw
    }

    /// Replaces the displayed grid with one anchored at `date`.
    fn rebuild(&mut self, date: Date) {
        self.grid = MonthGrid::new(date, &self.styler);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        MonthCalendar.render(area, buf, &mut self.grid);
    }
}

/// Forwards terminal events into the UI channel from a dedicated thread.
/// The thread ends once the UI side hangs up or the terminal goes away.
pub(crate) fn spawn_input_thread(events: Sender<UiEvent>) -> io::Result<()> {
    thread::Builder::new().name("input".into()).spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if events.send(UiEvent::Input(ev)).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("terminal input unavailable: {e}");
                break;
            }
        }
    })?;
    Ok(())
}
