use crate::error::Error;
use bit_set::BitSet;
use rand::Rng;
use std::collections::VecDeque;

/// A position on the board as `(x, y)`, that is `(column, row)`.
pub(crate) type Coordinate = (usize, usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) is_bomb: bool,
    pub(crate) is_revealed: bool,
    pub(crate) is_flagged: bool,
    pub(crate) adjacent_bombs: u8,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Increment {
    One,
    NegOne,
    Zero,
}

impl Increment {
    fn offset(&self, value: usize) -> Option<usize> {
        match *self {
            Self::One => value.checked_add(1),
            Self::NegOne => value.checked_sub(1),
            Self::Zero => Some(value),
        }
    }
}

/// Indices of the in-bounds Moore neighbours of `(x, y)`.
fn adjacent((x, y): Coordinate, width: usize, height: usize) -> impl Iterator<Item = usize> {
    const INCREMENTS: [Increment; 3] = [Increment::One, Increment::NegOne, Increment::Zero];

    INCREMENTS
        .iter()
        .copied()
        .flat_map(|y_incr| std::iter::repeat(y_incr).zip(INCREMENTS))
        .filter_map(move |(y_incr, x_incr)| match (y_incr, x_incr) {
            (Increment::Zero, Increment::Zero) => None,
            _ => {
                let ny = y_incr.offset(y).filter(|&ny| ny < height)?;
                let nx = x_incr.offset(x).filter(|&nx| nx < width)?;
                Some(index_from_coord((nx, ny), width))
            }
        })
}

fn index_from_coord((x, y): Coordinate, width: usize) -> usize {
    y * width + x
}

fn coord_from_index(index: usize, width: usize) -> Coordinate {
    (index % width, index / width)
}

/// The result of revealing a cell: the new board and whether a bomb went off.
#[derive(Debug)]
pub(crate) struct Reveal {
    pub(crate) board: Board,
    pub(crate) hit_bomb: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Board {
    // row-major, `height` rows of `width` cells
    cells: Vec<Cell>,
    width: usize,
    height: usize,
    bombs: usize,
}

impl Board {
    /// Lay out `bombs` bombs uniformly at random on a `width` x `height` board.
    ///
    /// Bombs are placed by rejection sampling: a random coordinate is drawn
    /// and kept only if it does not already hold a bomb.
    pub(crate) fn generate<R>(
        width: usize,
        height: usize,
        bombs: usize,
        rng: &mut R,
    ) -> Result<Self, Error>
    where
        R: Rng,
    {
        if width == 0 || height == 0 {
            return Err(Error::EmptyBoard { width, height });
        }

        let area = width * height;
        if bombs == 0 || bombs >= area {
            return Err(Error::InvalidBombCount {
                bombs,
                max: area - 1,
                area,
            });
        }

        let mut placed = BitSet::with_capacity(area);
        while placed.len() < bombs {
            let x = rng.gen_range(0..width);
            let y = rng.gen_range(0..height);
            placed.insert(index_from_coord((x, y), width));
        }

        Ok(Self::from_bomb_set(width, height, &placed))
    }

    /// Build a board with bombs at exactly the given coordinates.
    #[cfg(test)]
    pub(crate) fn with_bombs(
        width: usize,
        height: usize,
        bombs: &[Coordinate],
    ) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyBoard { width, height });
        }

        let placed = bombs
            .iter()
            .map(|&(x, y)| {
                if x < width && y < height {
                    Ok(index_from_coord((x, y), width))
                } else {
                    Err(Error::OutOfBounds((x, y)))
                }
            })
            .collect::<Result<BitSet, _>>()?;

        Ok(Self::from_bomb_set(width, height, &placed))
    }

    fn from_bomb_set(width: usize, height: usize, placed: &BitSet) -> Self {
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .enumerate()
            .map(|(i, (x, y))| {
                let is_bomb = placed.contains(i);

                // bombs carry no count
                let adjacent_bombs = if is_bomb {
                    0
                } else {
                    adjacent((x, y), width, height)
                        .fold(0, |total, index| total + u8::from(placed.contains(index)))
                };
                assert!(adjacent_bombs <= 8);

                Cell {
                    x,
                    y,
                    is_bomb,
                    is_revealed: false,
                    is_flagged: false,
                    adjacent_bombs,
                }
            })
            .collect::<Vec<_>>();

        Self {
            cells,
            width,
            height,
            bombs: placed.len(),
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn bombs(&self) -> usize {
        self.bombs
    }

    pub(crate) fn flagged(&self) -> usize {
        self.cells().filter(|cell| cell.is_flagged).count()
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    fn index(&self, (x, y): Coordinate) -> Result<usize, Error> {
        if x < self.width && y < self.height {
            Ok(index_from_coord((x, y), self.width))
        } else {
            Err(Error::OutOfBounds((x, y)))
        }
    }

    pub(crate) fn cell(&self, x: usize, y: usize) -> Result<&Cell, Error> {
        let index = self.index((x, y))?;
        self.cells.get(index).ok_or(Error::OutOfBounds((x, y)))
    }

    fn cell_mut(&mut self, x: usize, y: usize) -> Result<&mut Cell, Error> {
        let index = self.index((x, y))?;
        self.cells.get_mut(index).ok_or(Error::OutOfBounds((x, y)))
    }

    /// Reveal the cell at `(x, y)` and return the resulting board.
    ///
    /// Revealed and flagged cells are left alone. Hitting a bomb exposes the
    /// whole board. A cell without adjacent bombs opens its neighbourhood,
    /// spreading through further empty cells and stopping at numbered ones.
    pub(crate) fn reveal(&self, (x, y): Coordinate) -> Result<Reveal, Error> {
        let target = self.cell(x, y)?;

        if target.is_revealed || target.is_flagged {
            return Ok(Reveal {
                board: self.clone(),
                hit_bomb: false,
            });
        }

        let mut board = self.clone();

        if target.is_bomb {
            board.reveal_all();
            return Ok(Reveal {
                board,
                hit_bomb: true,
            });
        }

        let width = board.width;
        let height = board.height;
        let mut coordinates = [self.index((x, y))?]
            .iter()
            .copied()
            .collect::<VecDeque<_>>();

        while let Some(index) = coordinates.pop_front() {
            let cell = &mut board.cells[index];
            if cell.is_revealed || cell.is_flagged {
                continue;
            }

            cell.is_revealed = true;

            if cell.adjacent_bombs == 0 {
                let point = coord_from_index(index, width);
                let cells = &board.cells;
                coordinates.extend(
                    adjacent(point, width, height).filter(|&neighbour| {
                        !(cells[neighbour].is_revealed || cells[neighbour].is_bomb)
                    }),
                );
            }
        }

        Ok(Reveal {
            board,
            hit_bomb: false,
        })
    }

    /// Expose every cell, used for the end-of-game display.
    pub(crate) fn reveal_all(&mut self) {
        self.cells
            .iter_mut()
            .for_each(|cell| cell.is_revealed = true);
    }

    /// Toggle the flag on an unrevealed cell, returning whether anything changed.
    pub(crate) fn toggle_flag(&mut self, x: usize, y: usize) -> Result<bool, Error> {
        let cell = self.cell_mut(x, y)?;
        if cell.is_revealed {
            return Ok(false);
        }
        cell.is_flagged = !cell.is_flagged;
        Ok(true)
    }

    /// Every bomb is still hidden and every safe cell is revealed. Flags play no part.
    pub(crate) fn check_win(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_bomb != cell.is_revealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn revealed(board: &Board) -> Vec<Coordinate> {
        board
            .cells()
            .filter(|cell| cell.is_revealed)
            .map(|cell| (cell.x, cell.y))
            .collect()
    }

    fn brute_force_count(board: &Board, x: usize, y: usize) -> u8 {
        let mut count = 0;
        for ny in y.saturating_sub(1)..=(y + 1).min(board.height() - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(board.width() - 1) {
                if (nx, ny) != (x, y) && board.cell(nx, ny).unwrap().is_bomb {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn adjacent_is_clipped_at_edges() {
        let mut corner = adjacent((0, 0), 3, 3).collect::<Vec<_>>();
        corner.sort_unstable();
        assert_eq!(corner, vec![1, 3, 4]);

        let mut edge = adjacent((1, 0), 3, 3).collect::<Vec<_>>();
        edge.sort_unstable();
        assert_eq!(edge, vec![0, 2, 3, 4, 5]);

        assert_eq!(adjacent((1, 1), 3, 3).count(), 8);
        assert_eq!(adjacent((0, 0), 1, 1).count(), 0);
    }

    #[test]
    fn generate_places_exact_bomb_count_with_correct_counts() {
        let mut rng = StdRng::seed_from_u64(7);
        for &(width, height, bombs) in &[(10, 10, 15), (14, 14, 29), (22, 22, 72), (3, 1, 2)] {
            let board = Board::generate(width, height, bombs, &mut rng).unwrap();

            assert_eq!(board.bombs(), bombs);
            assert_eq!(board.cells().filter(|cell| cell.is_bomb).count(), bombs);

            for cell in board.cells() {
                assert!(!cell.is_revealed);
                assert!(!cell.is_flagged);
                if !cell.is_bomb {
                    assert_eq!(cell.adjacent_bombs, brute_force_count(&board, cell.x, cell.y));
                }
            }
        }
    }

    #[test]
    fn cells_know_their_position() {
        let board = Board::generate(7, 4, 5, &mut StdRng::seed_from_u64(1)).unwrap();
        for y in 0..4 {
            for x in 0..7 {
                let cell = board.cell(x, y).unwrap();
                assert_eq!((cell.x, cell.y), (x, y));
            }
        }
    }

    #[test]
    fn generate_rejects_bad_arguments() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Board::generate(3, 3, 0, &mut rng),
            Err(Error::InvalidBombCount { .. })
        ));
        assert!(matches!(
            Board::generate(3, 3, 9, &mut rng),
            Err(Error::InvalidBombCount { bombs: 9, max: 8, area: 9 })
        ));
        assert!(matches!(
            Board::generate(0, 3, 1, &mut rng),
            Err(Error::EmptyBoard { .. })
        ));
        assert!(Board::generate(3, 3, 8, &mut rng).is_ok());
    }

    #[test]
    fn with_bombs_rejects_out_of_range_bombs() {
        assert!(matches!(
            Board::with_bombs(3, 3, &[(3, 0)]),
            Err(Error::OutOfBounds((3, 0)))
        ));
    }

    #[test]
    fn reveal_of_flagged_or_revealed_cell_is_noop() {
        let mut board = Board::with_bombs(3, 3, &[(0, 0)]).unwrap();
        board.toggle_flag(2, 0).unwrap();

        let flagged = board.reveal((2, 0)).unwrap();
        assert!(!flagged.hit_bomb);
        assert_eq!(flagged.board, board);

        let opened = board.reveal((1, 1)).unwrap().board;
        let again = opened.reveal((1, 1)).unwrap();
        assert!(!again.hit_bomb);
        assert_eq!(again.board, opened);
    }

    #[test]
    fn reveal_of_bomb_exposes_everything() {
        let board = Board::with_bombs(4, 4, &[(1, 2), (3, 3)]).unwrap();
        let Reveal { board: after, hit_bomb } = board.reveal((1, 2)).unwrap();

        assert!(hit_bomb);
        assert!(after.cells().all(|cell| cell.is_revealed));
        assert!(!after.check_win());
    }

    #[test]
    fn reveal_does_not_touch_input_board() {
        let board = Board::with_bombs(5, 5, &[(4, 4)]).unwrap();
        let before = board.clone();
        let after = board.reveal((0, 0)).unwrap().board;

        assert_eq!(board, before);
        assert_ne!(after, before);
    }

    #[test]
    fn reveal_numbered_cell_does_not_spread() {
        let board = Board::with_bombs(3, 3, &[(0, 0)]).unwrap();
        let after = board.reveal((1, 1)).unwrap().board;
        assert_eq!(revealed(&after), vec![(1, 1)]);
    }

    #[test]
    fn flood_fill_stops_at_numbered_border() {
        // a wall of bombs down the middle column
        let bombs = (0..5).map(|y| (2, y)).collect::<Vec<_>>();
        let board = Board::with_bombs(5, 5, &bombs).unwrap();

        let Reveal { board: after, hit_bomb } = board.reveal((0, 0)).unwrap();

        assert!(!hit_bomb);
        for cell in after.cells() {
            assert_eq!(cell.is_revealed, cell.x < 2, "cell {:?}", (cell.x, cell.y));
        }
        assert!(after.cells().filter(|cell| cell.is_bomb).all(|cell| !cell.is_revealed));
    }

    #[test]
    fn flood_fill_skips_flagged_cells() {
        let mut board = Board::with_bombs(4, 4, &[(3, 3)]).unwrap();
        board.toggle_flag(0, 3).unwrap();

        let after = board.reveal((0, 0)).unwrap().board;
        let flagged = after.cell(0, 3).unwrap();

        assert!(flagged.is_flagged);
        assert!(!flagged.is_revealed);
        assert!(!after.cell(3, 3).unwrap().is_revealed);
        assert_eq!(revealed(&after).len(), 14);
    }

    #[test]
    fn reveal_out_of_bounds_is_an_error() {
        let board = Board::with_bombs(3, 3, &[(0, 0)]).unwrap();
        assert!(matches!(board.reveal((3, 1)), Err(Error::OutOfBounds((3, 1)))));
        assert!(matches!(board.reveal((0, 9)), Err(Error::OutOfBounds((0, 9)))));
    }

    #[test]
    fn single_bomb_cascade_leaves_only_the_bomb() {
        let board = Board::with_bombs(10, 10, &[(0, 0)]).unwrap();
        assert_eq!(board.cell(9, 9).unwrap().adjacent_bombs, 0);
        assert!(!board.check_win());

        let Reveal { board: after, hit_bomb } = board.reveal((9, 9)).unwrap();

        assert!(!hit_bomb);
        for cell in after.cells() {
            assert_eq!(cell.is_revealed, (cell.x, cell.y) != (0, 0));
        }
        for &(x, y) in &[(1, 0), (0, 1), (1, 1)] {
            assert_eq!(after.cell(x, y).unwrap().adjacent_bombs, 1);
        }
        assert!(after.check_win());
    }

    #[test]
    fn check_win_ignores_flags_and_is_idempotent() {
        let mut board = Board::with_bombs(2, 1, &[(0, 0)]).unwrap();
        assert!(!board.check_win());

        board.toggle_flag(0, 0).unwrap();
        assert!(!board.check_win());

        let mut won = board.reveal((1, 0)).unwrap().board;
        assert!(won.check_win());
        assert!(won.check_win());

        won.toggle_flag(0, 0).unwrap();
        assert!(won.check_win());
    }

    #[test]
    fn check_win_fails_when_bomb_revealed() {
        let mut board = Board::with_bombs(2, 1, &[(0, 0)]).unwrap();
        board.reveal_all();
        assert!(!board.check_win());
    }

    #[test]
    fn toggle_flag_only_on_unrevealed_cells() {
        let board = Board::with_bombs(3, 3, &[(0, 0)]).unwrap();
        let mut after = board.reveal((2, 2)).unwrap().board;

        assert!(!after.toggle_flag(2, 2).unwrap());
        assert!(!after.cell(2, 2).unwrap().is_flagged);

        assert!(after.toggle_flag(0, 0).unwrap());
        assert_eq!(after.flagged(), 1);
        assert!(after.toggle_flag(0, 0).unwrap());
        assert_eq!(after.flagged(), 0);
    }
}
