use crate::{
    clock::{Stopwatch, Timestamp},
    difficulty::{BombRule, Difficulty},
    error::Error,
    store::{ScoreEntry, DEFAULT_NAME},
    sweep::{Board, Reveal},
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    #[default]
    Idle,
    InProgress,
    Won,
    Lost,
}

impl Status {
    pub(crate) fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// What a click did to the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    /// The game is not in progress, nothing happened.
    Ignored,
    /// The game goes on.
    Playing,
    /// The last safe cell was revealed. The entry is ready for the leaderboard.
    Won(ScoreEntry),
    /// A bomb went off.
    Lost,
}

/// One player's game: the board, its difficulty, status and clock.
#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Session {
    #[builder(default)]
    difficulty: Difficulty,
    #[builder(default)]
    rule: BombRule,
    #[builder(default = StdRng::from_entropy())]
    rng: StdRng,
    #[builder(default = DEFAULT_NAME.to_owned(), setter(into))]
    player: String,
    #[builder(default, setter(skip))]
    board: Option<Board>,
    #[builder(default, setter(skip))]
    status: Status,
    #[builder(default, setter(skip))]
    stopwatch: Stopwatch,
}

impl Session {
    pub(crate) fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub(crate) fn rule(&self) -> BombRule {
        self.rule
    }

    pub(crate) fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub(crate) fn player(&self) -> &str {
        &self.player
    }

    pub(crate) fn bombs(&self) -> usize {
        self.board
            .as_ref()
            .map_or_else(|| self.difficulty.bombs(self.rule), Board::bombs)
    }

    /// Bombs minus flags placed; negative when the player over-flags.
    pub(crate) fn flags_left(&self) -> isize {
        let flagged = self.board.as_ref().map_or(0, Board::flagged);
        self.bombs() as isize - flagged as isize
    }

    pub(crate) fn elapsed(&self) -> Timestamp {
        self.stopwatch.snapshot()
    }

    pub(crate) fn clock_running(&self) -> bool {
        self.stopwatch.is_running()
    }

    /// Board size as `(width, height)`.
    pub(crate) fn dimensions(&self) -> (usize, usize) {
        self.board.as_ref().map_or(
            (self.difficulty.width, self.difficulty.height),
            |board| (board.width(), board.height()),
        )
    }

    /// Throw away the current board and deal a fresh one for `difficulty`.
    pub(crate) fn new_game(&mut self, difficulty: Difficulty) -> Result<(), Error> {
        let bombs = difficulty.bombs(self.rule);
        let board = Board::generate(difficulty.width, difficulty.height, bombs, &mut self.rng)?;

        info!(
            difficulty = %difficulty,
            width = difficulty.width,
            height = difficulty.height,
            bombs,
            rule = %self.rule,
            "new game"
        );

        self.start(difficulty, board);
        Ok(())
    }

    pub(crate) fn restart(&mut self) -> Result<(), Error> {
        self.new_game(self.difficulty)
    }

    /// Start a new game on the difficulty called `name`.
    pub(crate) fn select_difficulty(&mut self, name: &str) -> Result<(), Error> {
        let difficulty = name.parse::<Difficulty>()?;
        self.new_game(difficulty)
    }

    fn start(&mut self, difficulty: Difficulty, board: Board) {
        self.difficulty = difficulty;
        self.board = Some(board);
        self.stopwatch.reset();
        self.status = Status::InProgress;
    }

    /// Reveal the cell at `(x, y)`.
    pub(crate) fn left_click(&mut self, x: usize, y: usize) -> Result<Transition, Error> {
        let board = match (&self.board, self.status) {
            (Some(board), Status::InProgress) => board,
            _ => return Ok(Transition::Ignored),
        };

        let Reveal {
            board: revealed,
            hit_bomb,
        } = board.reveal((x, y))?;
        let changed = revealed != *board;
        self.board = Some(revealed);

        if hit_bomb {
            self.stopwatch.pause();
            self.status = Status::Lost;
            info!(x, y, elapsed = %self.stopwatch.snapshot(), "bomb hit, game lost");
            return Ok(Transition::Lost);
        }

        // flagged and already revealed cells leave the clock alone
        if changed {
            self.stopwatch.start();
            debug!(x, y, "revealed");
        }
        Ok(self.evaluate())
    }

    /// Toggle the flag on the cell at `(x, y)`.
    pub(crate) fn right_click(&mut self, x: usize, y: usize) -> Result<Transition, Error> {
        let board = match (&mut self.board, self.status) {
            (Some(board), Status::InProgress) => board,
            _ => return Ok(Transition::Ignored),
        };

        if board.toggle_flag(x, y)? {
            let flagged = board.cell(x, y)?.is_flagged;
            debug!(x, y, flagged, "flag toggled");
        }
        Ok(self.evaluate())
    }

    fn evaluate(&mut self) -> Transition {
        let board = match self.board.as_mut() {
            Some(board) if board.check_win() => board,
            _ => return Transition::Playing,
        };

        self.stopwatch.pause();
        board.reveal_all();
        self.status = Status::Won;

        let entry = ScoreEntry {
            name: self.player.clone(),
            difficulty: self.difficulty.name.to_owned(),
            timestamp: self.stopwatch.snapshot().to_string(),
            date: chrono::Utc::now().to_rfc3339(),
        };
        info!(
            difficulty = %self.difficulty,
            elapsed = %entry.timestamp,
            "game won"
        );
        Transition::Won(entry)
    }

    #[cfg(test)]
    pub(crate) fn start_with_board(&mut self, difficulty: Difficulty, board: Board) {
        self.start(difficulty, board);
    }
}
