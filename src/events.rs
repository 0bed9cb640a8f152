use std::{io, sync::mpsc, thread, time::Duration};
use termion::{
    event::{Event as TermEvent, Key},
    input::TermRead,
};

pub(crate) enum Event<I> {
    Input(I),
    Tick,
}

/// A small event handler that wraps termion input and tick events. Each event
/// type is handled in its own thread and returned to a common `Receiver`.
///
/// Input covers both keys and mouse presses; ticks drive the stopwatch display.
pub(crate) struct Events {
    rx: mpsc::Receiver<Event<TermEvent>>,
    _input_handle: thread::JoinHandle<()>,
    _tick_handle: thread::JoinHandle<()>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    pub(crate) exit_key: Key,
    pub(crate) tick_rate: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            exit_key: Key::Char('q'),
            tick_rate: Duration::from_millis(50),
        }
    }
}

impl Events {
    pub(crate) fn with_config(config: Config) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            _input_handle: {
                let tx = tx.clone();
                thread::spawn(move || {
                    let stdin = io::stdin();
                    for event in stdin.events().flatten() {
                        let exit = event == TermEvent::Key(config.exit_key);
                        if tx.send(Event::Input(event)).is_err() || exit {
                            return;
                        }
                    }
                })
            },
            _tick_handle: {
                thread::spawn(move || loop {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    thread::sleep(config.tick_rate);
                })
            },
        }
    }

    pub(crate) fn next(&self) -> Result<Event<TermEvent>, mpsc::RecvError> {
        self.rx.recv()
    }
}
