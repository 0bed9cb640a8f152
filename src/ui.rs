use crate::{
    difficulty::DIFFICULTIES,
    error::Error,
    events::{self, Event, Events},
    session::{Session, Status, Transition},
    store::Store,
    sweep::{self, Coordinate},
};
use num_traits::ToPrimitive;
use ratatui::{
    backend::TermionBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Clear, Gauge, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::{
    fmt, io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use termion::{
    event::{Event as TermEvent, Key, MouseButton, MouseEvent},
    input::MouseTerminal,
    raw::IntoRawMode,
    screen::IntoAlternateScreen,
};
use tracing::{error, info};

const BOMB: &str = "💣";
const FLAG: &str = "⛳";
const LEADERBOARD_SIZE: usize = 10;

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let Rect {
        width: grid_width,
        height: grid_height,
        ..
    } = r;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((grid_height / 2).saturating_sub(height / 2)),
                Constraint::Length(height),
                Constraint::Length((grid_height / 2).saturating_sub(height / 2)),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((grid_width / 2).saturating_sub(width / 2)),
                Constraint::Length(width),
                Constraint::Length((grid_width / 2).saturating_sub(width / 2)),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn align_strings_to_char(strings: &[&str], c: char) -> Vec<String> {
    let (firsts, rests): (Vec<_>, Vec<_>) = strings
        .iter()
        .map(|&s| s.split_at(s.find(c).unwrap_or(s.len())))
        .unzip();
    let max_firsts = firsts.iter().map(|&f| f.len()).max().unwrap_or(0);
    let max_rests = rests.iter().map(|&r| r.len()).max().unwrap_or(0);
    firsts
        .into_iter()
        .zip(rests)
        .map(|(first, rest)| format!("{first:>max_firsts$}{rest:<max_rests$}"))
        .collect()
}

#[derive(typed_builder::TypedBuilder)]
pub(crate) struct Ui {
    session: Session,
    store: Store,
    cell_width: usize,
    cell_height: usize,
    #[builder(default)]
    events: events::Config,
}

struct App {
    session: Session,
    store: Store,
    active_x: usize,
    active_y: usize,
    show_scores: bool,
    // screen area of every cell as of the last draw
    cell_rects: Vec<(Rect, Coordinate)>,
}

struct Cell<'app> {
    cell: &'app sweep::Cell,
    active: bool,
    status: Status,
}

impl Cell<'_> {
    fn correctly_flagged(&self) -> bool {
        self.status.is_finished() && self.cell.is_flagged && self.cell.is_bomb
    }

    fn block(&self) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .style(
                Style::default()
                    .bg(Color::Black)
                    .fg(if self.active {
                        Color::Cyan
                    } else if self.correctly_flagged() {
                        Color::LightGreen
                    } else if self.status == Status::Lost && self.cell.is_bomb {
                        Color::LightRed
                    } else {
                        Color::White
                    })
                    .add_modifier(if self.active {
                        Modifier::BOLD
                    } else {
                        Modifier::empty()
                    }),
            )
            .border_type(BorderType::Rounded)
    }

    fn text_style(&self) -> Style {
        let exposed = self.cell.is_revealed;
        Style::default()
            .fg(if exposed && self.cell.is_bomb {
                Color::LightYellow
            } else if exposed {
                Color::White
            } else {
                Color::Black
            })
            .bg(if exposed {
                Color::Black
            } else if self.active {
                Color::Cyan
            } else {
                Color::White
            })
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.cell;
        if cell.is_flagged {
            write!(f, "{FLAG}")
        } else if cell.is_revealed && cell.is_bomb {
            write!(f, "{BOMB}")
        } else if cell.is_revealed && cell.adjacent_bombs > 0 {
            write!(f, "{}", cell.adjacent_bombs)
        } else {
            write!(f, " ")
        }
    }
}

impl App {
    fn new(session: Session, store: Store) -> Self {
        Self {
            session,
            store,
            active_x: 0,
            active_y: 0,
            show_scores: false,
            cell_rects: Vec::new(),
        }
    }

    fn up(&mut self) {
        if let Some(active_y) = self.active_y.checked_sub(1) {
            self.active_y = active_y;
        }
    }

    fn down(&mut self) {
        let (_, height) = self.session.dimensions();
        self.active_y += usize::from(self.active_y + 1 < height);
    }

    fn left(&mut self) {
        if let Some(active_x) = self.active_x.checked_sub(1) {
            self.active_x = active_x;
        }
    }

    fn right(&mut self) {
        let (width, _) = self.session.dimensions();
        self.active_x += usize::from(self.active_x + 1 < width);
    }

    fn active(&self) -> Coordinate {
        (self.active_x, self.active_y)
    }

    fn reveal(&mut self, (x, y): Coordinate) -> Result<(), Error> {
        let transition = self.session.left_click(x, y)?;
        self.record(transition);
        Ok(())
    }

    fn flag(&mut self, (x, y): Coordinate) -> Result<(), Error> {
        let transition = self.session.right_click(x, y)?;
        self.record(transition);
        Ok(())
    }

    fn record(&mut self, transition: Transition) {
        if let Transition::Won(entry) = transition {
            // a failed save must not end the game
            if let Err(err) = self.store.add_score(entry) {
                error!(error = %err, path = %self.store.path().display(), "failed to save score");
            }
        }
    }

    fn restart(&mut self) -> Result<(), Error> {
        self.session.restart()?;
        self.active_x = 0;
        self.active_y = 0;
        Ok(())
    }

    fn select_difficulty(&mut self, name: &str) -> Result<(), Error> {
        self.session.select_difficulty(name)?;
        self.active_x = 0;
        self.active_y = 0;
        Ok(())
    }

    /// Map a 1-based terminal position reported by termion to a board coordinate.
    fn cell_at_screen(&self, column: u16, row: u16) -> Option<Coordinate> {
        let x = column.checked_sub(1)?;
        let y = row.checked_sub(1)?;
        self.cell_rects
            .iter()
            .find(|(rect, _)| {
                x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
            })
            .map(|&(_, coordinate)| coordinate)
    }
}

/// Sizes derived from the current difficulty.
struct Geometry {
    cell_width: usize,
    cell_height: usize,
    grid_width: u16,
    grid_height: u16,
    row_constraints: Vec<Constraint>,
    col_constraints: Vec<Constraint>,
}

impl Geometry {
    fn new(
        cell_width: usize,
        cell_height: usize,
        columns: usize,
        rows: usize,
    ) -> Result<Self, Error> {
        let padding = 1;

        let grid_width =
            u16::try_from(cell_width * columns + 2 * padding).map_err(Error::ConvertUsizeToU16)?;
        let grid_height =
            u16::try_from(cell_height * rows + 2 * padding).map_err(Error::ConvertUsizeToU16)?;

        let row_constraints = std::iter::repeat(Constraint::Length(
            u16::try_from(cell_height).map_err(Error::ConvertUsizeToU16)?,
        ))
        .take(rows)
        .collect::<Vec<_>>();

        let col_constraints = std::iter::repeat(Constraint::Length(
            u16::try_from(cell_width).map_err(Error::ConvertUsizeToU16)?,
        ))
        .take(columns)
        .collect::<Vec<_>>();

        Ok(Self {
            cell_width,
            cell_height,
            grid_width,
            grid_height,
            row_constraints,
            col_constraints,
        })
    }
}

fn info_block(title: &'static str, color: Color) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(Span::styled(
        title,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn draw(frame: &mut Frame, app: &mut App, geometry: &Geometry) {
    let terminal_rect = frame.size();
    let Geometry {
        cell_width,
        cell_height,
        grid_width,
        grid_height,
        ..
    } = *geometry;

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!("Minesweeper: {}", app.session.player()),
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        ))
        .border_type(BorderType::Rounded);
    frame.render_widget(outer_block, terminal_rect);

    let outer_rects = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(1)
        .horizontal_margin(1)
        .constraints(vec![Constraint::Min(grid_height)])
        .split(terminal_rect);

    let mines_rect = outer_rects[0];

    let horizontal_pad_block_width = terminal_rect
        .width
        .checked_sub(grid_width)
        .unwrap_or(terminal_rect.width)
        / 2;
    let mines_rects = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Min(horizontal_pad_block_width),
            Constraint::Length(grid_width),
            // the layout leaves the right side a little short
            Constraint::Min(horizontal_pad_block_width.saturating_sub(1)),
        ])
        .split(mines_rect);

    let vertical_pad_block_height = mines_rect
        .height
        .checked_sub(grid_height)
        .unwrap_or(mines_rect.height)
        / 2;
    let middle_mines_rects = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Min(vertical_pad_block_height),
            Constraint::Length(grid_height),
            Constraint::Min(vertical_pad_block_height),
        ])
        .split(mines_rects[1]);

    let help_text_block = List::new(
        align_strings_to_char(
            &[
                "movement: hjkl / ← ↓ ↑ →",
                "expose tile: spacebar / left click",
                "flag tile: f / right click",
                "new game: n",
                "difficulty: 1 2 3 4",
                "scores: s",
                "quit: q",
            ],
            ':',
        )
        .into_iter()
        .map(|line| format!("{:^width$}", line, width = usize::from(grid_width)))
        .map(ListItem::new)
        .collect::<Vec<_>>(),
    )
    .block(Block::default().borders(Borders::NONE));
    frame.render_widget(help_text_block, middle_mines_rects[2]);

    let info_text_split_rects = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Min(vertical_pad_block_height.saturating_sub(3)),
            Constraint::Length(3),
        ])
        .split(middle_mines_rects[0]);

    let info_rects = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(25); 4])
        .split(info_text_split_rects[1]);

    let difficulty = app.session.difficulty();
    let difficulty_text = Paragraph::new(difficulty.name)
        .block(info_block("level", Color::LightBlue))
        .alignment(Alignment::Center);
    frame.render_widget(difficulty_text, info_rects[0]);

    let bombs = app.session.bombs();
    let flags_left = app.session.flags_left();
    let ratio = flags_left.max(0).to_f64().unwrap_or(0.0) / bombs.max(1).to_f64().unwrap_or(1.0);
    let flags_gauge = Gauge::default()
        .block(info_block(FLAG, Color::LightMagenta))
        .gauge_style(
            Style::default()
                .fg(Color::White)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .label(flags_left.to_string())
        .ratio(ratio.clamp(0.0, 1.0));
    frame.render_widget(flags_gauge, info_rects[1]);

    let mines_text = Paragraph::new(bombs.to_string())
        .block(info_block(BOMB, Color::LightYellow))
        .alignment(Alignment::Center);
    frame.render_widget(mines_text, info_rects[2]);

    let timer_text = Paragraph::new(app.session.elapsed().to_string())
        .block(info_block(
            "time",
            if app.session.clock_running() {
                Color::LightCyan
            } else {
                Color::DarkGray
            },
        ))
        .alignment(Alignment::Center);
    frame.render_widget(timer_text, info_rects[3]);

    let mines_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let final_mines_rect = middle_mines_rects[1];
    frame.render_widget(mines_block, final_mines_rect);

    let row_rects = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(1)
        .horizontal_margin(0)
        .constraints(geometry.row_constraints.clone())
        .split(final_mines_rect);

    let status = app.session.status();
    let active = app.active();
    app.cell_rects.clear();

    if let Some(board) = app.session.board() {
        for (y, row_rect) in row_rects.iter().enumerate() {
            let col_rects = Layout::default()
                .direction(Direction::Horizontal)
                .vertical_margin(0)
                .horizontal_margin(1)
                .constraints(geometry.col_constraints.clone())
                .split(*row_rect);

            for (x, cell_rect) in col_rects.iter().enumerate() {
                let Ok(cell) = board.cell(x, y) else {
                    continue;
                };
                let cell = Cell {
                    cell,
                    active: active == (x, y),
                    status,
                };
                let single_row_text = format!(
                    "{:^length$}",
                    cell.to_string(),
                    length = cell_width.saturating_sub(2)
                );
                let pad_line = " ".repeat(cell_width);

                // the text line plus the top and bottom borders are not eligible for padding
                let num_pad_lines = cell_height.saturating_sub(3);

                let text = std::iter::repeat(pad_line.clone())
                    .take(num_pad_lines / 2)
                    .chain(std::iter::once(single_row_text))
                    .chain(std::iter::repeat(pad_line).take(num_pad_lines / 2))
                    .collect::<Vec<_>>()
                    .join("\n");

                let cell_text = Paragraph::new(text)
                    .block(cell.block())
                    .style(cell.text_style());
                frame.render_widget(cell_text, *cell_rect);
                app.cell_rects.push((*cell_rect, (x, y)));
            }
        }
    }

    if status.is_finished() {
        let lost = status == Status::Lost;
        let area = centered_rect(20, 3, final_mines_rect);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(format!("You {}!", if lost { "lose" } else { "won" }))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Thick)
                        .border_style(
                            Style::default()
                                .fg(if lost {
                                    Color::Magenta
                                } else {
                                    Color::LightGreen
                                })
                                .add_modifier(Modifier::BOLD),
                        )
                        .style(Style::default().add_modifier(Modifier::BOLD)),
                )
                .alignment(Alignment::Center)
                .style(Style::default()),
            area,
        );
    }

    if app.show_scores {
        let scores = app.store.leaderboard(difficulty.name);
        let lines = if scores.is_empty() {
            vec![ListItem::new("no scores yet")]
        } else {
            scores
                .into_iter()
                .take(LEADERBOARD_SIZE)
                .enumerate()
                .map(|(rank, entry)| {
                    let day = entry.date.get(..10).unwrap_or(&entry.date);
                    ListItem::new(format!(
                        "{:>2}. {:<16} {} {}",
                        rank + 1,
                        entry.name,
                        entry.timestamp,
                        day
                    ))
                })
                .collect::<Vec<_>>()
        };
        let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
        let area = centered_rect(48, height, terminal_rect);
        frame.render_widget(Clear, area);
        frame.render_widget(
            List::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .title(Span::styled(
                        format!("best times: {}", difficulty.name),
                        Style::default()
                            .fg(Color::LightYellow)
                            .add_modifier(Modifier::BOLD),
                    )),
            ),
            area,
        );
    }
}

impl Ui {
    pub(crate) fn run(self) -> Result<(), Error> {
        let Self {
            session,
            store,
            cell_width,
            cell_height,
            events: config,
        } = self;
        let events = Events::with_config(config);

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        ctrlc::set_handler(move || {
            running_clone.store(false, Ordering::SeqCst);
        })
        .map_err(Error::SetHandler)?;

        let mut app = App::new(session, store);
        if app.session.board().is_none() {
            app.restart()?;
        }

        let stdout = io::stdout()
            .into_raw_mode()
            .map_err(Error::GetStdoutInRawMode)?
            .into_alternate_screen()
            .map_err(Error::GetAlternateScreenForMouseTerminal)?;
        let mouse_terminal = MouseTerminal::from(stdout);
        let backend = TermionBackend::new(mouse_terminal);
        let mut terminal = Terminal::new(backend).map_err(Error::CreateTerminal)?;

        while running.load(Ordering::SeqCst) {
            let (columns, rows) = app.session.dimensions();
            let geometry = Geometry::new(cell_width, cell_height, columns, rows)?;

            terminal
                .draw(|frame| draw(frame, &mut app, &geometry))
                .map_err(Error::DrawToTerminal)?;

            match events.next().map_err(Error::GetEvent)? {
                Event::Tick => {}
                Event::Input(TermEvent::Key(key)) => match key {
                    // movement using arrow keys or vim movement keys
                    Key::Up | Key::Char('k') => app.up(),
                    Key::Down | Key::Char('j') => app.down(),
                    Key::Left | Key::Char('h') => app.left(),
                    Key::Right | Key::Char('l') => app.right(),
                    Key::Char('f') => app.flag(app.active())?,
                    Key::Char(' ') => app.reveal(app.active())?,
                    Key::Char('n') => app.restart()?,
                    Key::Char('s') => app.show_scores = !app.show_scores,
                    Key::Char(c @ '1'..='9') => {
                        let index = c as usize - '1' as usize;
                        if let Some(difficulty) = DIFFICULTIES.get(index) {
                            app.select_difficulty(difficulty.name)?;
                        }
                    }
                    Key::Ctrl('c') => break,
                    key if key == config.exit_key => break,
                    _ => {}
                },
                Event::Input(TermEvent::Mouse(MouseEvent::Press(button, column, row))) => {
                    if let Some((x, y)) = app.cell_at_screen(column, row) {
                        app.active_x = x;
                        app.active_y = y;
                        match button {
                            MouseButton::Left => app.reveal((x, y))?,
                            MouseButton::Right => app.flag((x, y))?,
                            _ => {}
                        }
                    }
                }
                Event::Input(_) => {}
            }
        }

        info!(
            difficulty = %app.session.difficulty(),
            status = ?app.session.status(),
            "quitting"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{difficulty::EASY, sweep::Board};
    use rand::{rngs::StdRng, SeedableRng};

    fn app() -> App {
        let mut session = Session::builder()
            .rng(StdRng::seed_from_u64(3))
            .build();
        session.new_game(EASY).unwrap();
        let store = Store::load(std::env::temp_dir().join("minesweep-ui-unused.json"));
        App::new(session, store)
    }

    #[test]
    fn only_won_games_are_saved() {
        let dir = std::env::temp_dir().join(format!("minesweep-ui-{}-record", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let session = Session::builder()
            .rng(StdRng::seed_from_u64(3))
            .player("Ada")
            .build();
        let mut app = App::new(session, Store::load(dir.join("store.json")));

        app.session
            .start_with_board(EASY, Board::with_bombs(10, 10, &[(0, 0)]).unwrap());
        app.reveal((9, 9)).unwrap();
        assert_eq!(app.store.scores().len(), 1);
        assert_eq!(app.store.scores()[0].name, "Ada");
        assert_eq!(Store::load(dir.join("store.json")).scores().len(), 1);

        app.session
            .start_with_board(EASY, Board::with_bombs(10, 10, &[(0, 0)]).unwrap());
        app.reveal((0, 0)).unwrap();
        assert_eq!(app.store.scores().len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn help_lines_align_on_separator() {
        let lines = align_strings_to_char(&["quit: q", "flag tile: f"], ':');
        assert_eq!(lines, vec!["     quit: q", "flag tile: f"]);

        let unaligned = align_strings_to_char(&["no separator"], ':');
        assert_eq!(unaligned, vec!["no separator"]);
    }

    #[test]
    fn centered_rect_sits_in_the_middle() {
        let area = centered_rect(20, 3, Rect::new(0, 0, 60, 21));
        assert_eq!((area.width, area.height), (20, 3));
        assert_eq!((area.x, area.y), (20, 9));
    }

    #[test]
    fn cell_text_follows_state() {
        let board = Board::with_bombs(3, 1, &[(0, 0)]).unwrap();
        let mut opened = board.reveal((1, 0)).unwrap().board;
        opened.toggle_flag(2, 0).unwrap();

        let text = |x: usize, board: &Board| {
            Cell {
                cell: board.cell(x, 0).unwrap(),
                active: false,
                status: Status::InProgress,
            }
            .to_string()
        };

        assert_eq!(text(0, &opened), " ");
        assert_eq!(text(1, &opened), "1");
        assert_eq!(text(2, &opened), FLAG);

        let exposed = board.reveal((0, 0)).unwrap().board;
        assert_eq!(text(0, &exposed), BOMB);
    }

    #[test]
    fn cursor_stays_on_the_board() {
        let mut app = app();
        app.up();
        app.left();
        assert_eq!(app.active(), (0, 0));

        for _ in 0..20 {
            app.down();
            app.right();
        }
        assert_eq!(app.active(), (9, 9));
    }

    #[test]
    fn mouse_positions_map_to_cells() {
        let mut app = app();
        app.cell_rects = vec![
            (Rect::new(10, 5, 5, 3), (0, 0)),
            (Rect::new(15, 5, 5, 3), (1, 0)),
        ];

        // termion positions are 1-based
        assert_eq!(app.cell_at_screen(11, 6), Some((0, 0)));
        assert_eq!(app.cell_at_screen(20, 8), Some((1, 0)));
        assert_eq!(app.cell_at_screen(21, 6), None);
        assert_eq!(app.cell_at_screen(0, 0), None);
    }

    #[test]
    fn geometry_fits_the_board() {
        let geometry = Geometry::new(5, 3, 22, 22).unwrap();
        assert_eq!(geometry.grid_width, 5 * 22 + 2);
        assert_eq!(geometry.grid_height, 3 * 22 + 2);
        assert_eq!(geometry.row_constraints.len(), 22);
        assert_eq!(geometry.col_constraints.len(), 22);
    }
}
