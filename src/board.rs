use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use wasm_bindgen::prelude::*;

use crate::cascade::CascadeReport;
use crate::error::GameError;

pub const BOARD_SIZE: usize = 5;
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;
pub const STATE_SIZE: usize = CELL_COUNT; // one signed count per cell
/// Largest count a cell holds once a move has fully resolved.
pub const MAX_COUNT: u8 = 3;
/// Count at which a cell explodes. Never stored on the board.
pub const CRITICAL_COUNT: u8 = 4;

/// Legal moves of one player, at most one per cell.
pub type MoveList = SmallVec<[Move; CELL_COUNT]>;

#[inline]
pub(crate) const fn idx(row: usize, col: usize) -> usize {
    row * BOARD_SIZE + col
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    A,
    B,
}

impl Player {
    pub const fn other(self) -> Self {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    /// 0 for A, 1 for B (the index the wasm API uses).
    pub const fn index(self) -> u8 {
        match self {
            Player::A => 0,
            Player::B => 1,
        }
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Player::A),
            1 => Some(Player::B),
            _ => None,
        }
    }

    const fn sign(self) -> i8 {
        match self {
            Player::A => 1,
            Player::B => -1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::A => f.write_str("player A"),
            Player::B => f.write_str("player B"),
        }
    }
}

/// One grid square. `owner.is_none()` exactly when `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub owner: Option<Player>,
    pub count: u8,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        owner: None,
        count: 0,
    };

    pub const fn owned(player: Player, count: u8) -> Self {
        Cell {
            owner: Some(player),
            count,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, player: Player) -> bool {
        self.owner == Some(player)
    }

    fn is_consistent(&self) -> bool {
        match self.owner {
            None => self.count == 0,
            Some(_) => (1..=MAX_COUNT).contains(&self.count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Result<Self, GameError> {
        check_bounds(row, col)?;
        Ok(Self { row, col })
    }

    /// Flat row-major action index in `0..25`.
    pub const fn index(&self) -> usize {
        idx(self.row, self.col)
    }

    pub fn from_index(index: usize) -> Result<Self, GameError> {
        Self::new(index / BOARD_SIZE, index % BOARD_SIZE)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

fn check_bounds(row: usize, col: usize) -> Result<(), GameError> {
    if row < BOARD_SIZE && col < BOARD_SIZE {
        Ok(())
    } else {
        Err(GameError::OutOfBounds { row, col })
    }
}

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Player),
    /// Both players were wiped out by the same move.
    Draw,
}

impl Outcome {
    /// `0` for a game in progress, `1`/`2` for an A/B win, `3` for a draw.
    pub fn code(outcome: Option<Outcome>) -> u8 {
        match outcome {
            None => 0,
            Some(Outcome::Winner(Player::A)) => 1,
            Some(Outcome::Winner(Player::B)) => 2,
            Some(Outcome::Draw) => 3,
        }
    }
}

/// The 5×5 grid. A plain `Copy` value so search branches each get their own board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    pub(crate) cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Opening position: A holds (1, 1) and B holds (3, 3), both with count 3.
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.cells[idx(1, 1)] = Cell::owned(Player::A, MAX_COUNT);
        board.cells[idx(3, 3)] = Cell::owned(Player::B, MAX_COUNT);
        board
    }

    pub const fn empty() -> Self {
        Self {
            cells: [Cell::EMPTY; CELL_COUNT],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Cell, GameError> {
        check_bounds(row, col)?;
        Ok(self.cells[idx(row, col)])
    }

    /// Overwrite one cell. Rejects cells that break the owner/count invariant.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), GameError> {
        check_bounds(row, col)?;
        if !cell.is_consistent() {
            return Err(GameError::InvalidState(format!(
                "cell ({row}, {col}) has owner {:?} with count {}",
                cell.owner, cell.count
            )));
        }
        self.cells[idx(row, col)] = cell;
        Ok(())
    }

    /// Read-only view of all cells in row-major order.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(BOARD_SIZE)
    }

    /// First-move placement of the interactive variant: a count-3 piece on an empty cell.
    pub fn place_opening(&mut self, player: Player, row: usize, col: usize) -> Result<(), GameError> {
        let cell = self.get(row, col)?;
        if !cell.is_empty() {
            return Err(GameError::Occupied { row, col });
        }
        self.cells[idx(row, col)] = Cell::owned(player, MAX_COUNT);
        Ok(())
    }

    /// Every cell owned by `player`, scanned row-major. The order drives search tie-breaks.
    pub fn legal_moves(&self, player: Player) -> MoveList {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_owned_by(player))
            .map(|(index, _)| Move {
                row: index / BOARD_SIZE,
                col: index % BOARD_SIZE,
            })
            .collect()
    }

    pub fn has_pieces(&self, player: Player) -> bool {
        self.cells.iter().any(|cell| cell.is_owned_by(player))
    }

    /// Sum of counts over the cells `player` owns.
    pub fn material(&self, player: Player) -> i32 {
        self.cells
            .iter()
            .filter(|cell| cell.is_owned_by(player))
            .map(|cell| i32::from(cell.count))
            .sum()
    }

    /// `Some` once a player has been wiped out. Only meaningful after the opening placements.
    pub fn outcome(&self) -> Option<Outcome> {
        match (self.has_pieces(Player::A), self.has_pieces(Player::B)) {
            (true, true) => None,
            (true, false) => Some(Outcome::Winner(Player::A)),
            (false, true) => Some(Outcome::Winner(Player::B)),
            (false, false) => Some(Outcome::Draw),
        }
    }

    /// Signed counts, row-major: `+n` for A, `-n` for B, `0` empty.
    pub fn as_bytes(&self) -> [i8; STATE_SIZE] {
        let mut flat = [0; STATE_SIZE];
        for (slot, cell) in flat.iter_mut().zip(self.cells.iter()) {
            *slot = match cell.owner {
                Some(player) => player.sign() * cell.count as i8,
                None => 0,
            };
        }
        flat
    }

    pub fn to_vec(&self) -> Vec<i8> {
        self.as_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[i8]) -> Result<Self, GameError> {
        if bytes.len() != STATE_SIZE {
            return Err(GameError::InvalidState(format!(
                "expected {STATE_SIZE} entries, got {}",
                bytes.len()
            )));
        }
        let mut board = Self::empty();
        for (index, &value) in bytes.iter().enumerate() {
            let count = value.unsigned_abs();
            if count > MAX_COUNT {
                return Err(GameError::InvalidState(format!(
                    "entry {index} holds count {count}, counts stop at {MAX_COUNT}"
                )));
            }
            board.cells[index] = match value.signum() {
                1 => Cell::owned(Player::A, count),
                -1 => Cell::owned(Player::B, count),
                _ => Cell::EMPTY,
            };
        }
        Ok(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for cell in row {
                match cell.owner {
                    Some(Player::A) => write!(f, " A{}", cell.count)?,
                    Some(Player::B) => write!(f, " B{}", cell.count)?,
                    None => f.write_str(" ..")?,
                }
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// Controller-facing handle: the authoritative board plus whose turn it is.
#[wasm_bindgen]
pub struct ChainReactionBoard {
    board: Board,
    to_move: Player,
    outcome: Option<Outcome>,
}

#[wasm_bindgen]
impl ChainReactionBoard {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ChainReactionBoard {
        Self::from_board(Board::new(), Player::A)
    }

    /// Serialize the board to a 25-entry `Int8Array` of signed counts.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Vec<i8> {
        self.board.to_vec()
    }

    /// Replace the board and the player to move.
    #[wasm_bindgen(js_name = setState)]
    pub fn set_state(&mut self, data: Vec<i8>, to_move: u8) -> Result<(), JsValue> {
        let player = player_from_index(to_move)?;
        *self = Self::from_board(Board::from_bytes(&data)?, player);
        Ok(())
    }

    /// Back to the seeded opening position with A to move.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[wasm_bindgen(js_name = currentPlayer)]
    pub fn current_player(&self) -> u8 {
        self.to_move.index()
    }

    /// Apply the current player's move and return the outcome code (see [`Outcome::code`]).
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, row: u8, col: u8) -> Result<u8, JsValue> {
        self.play(row as usize, col as usize)?;
        Ok(Outcome::code(self.outcome))
    }

    /// Minimax move for the current player as a flat action index.
    #[wasm_bindgen(js_name = bestMove)]
    pub fn best_move(&self, depth: u32) -> Result<Option<u8>, JsValue> {
        let chosen = crate::search::select_move(&self.board, self.to_move, depth)?;
        Ok(chosen.map(|mv| mv.index() as u8))
    }

    /// One-ply greedy suggestion for the current player.
    #[wasm_bindgen(js_name = hintMove)]
    pub fn hint_move(&self) -> Result<u8, JsValue> {
        let hint = crate::eval::greedy_move(&self.board, self.to_move)?;
        Ok(hint.index() as u8)
    }

    #[wasm_bindgen(js_name = hasPieces)]
    pub fn has_pieces(&self, player: u8) -> Result<bool, JsValue> {
        Ok(self.board.has_pieces(player_from_index(player)?))
    }

    /// Outcome code: `0` in progress, `1` A won, `2` B won, `3` draw.
    pub fn outcome(&self) -> u8 {
        Outcome::code(self.outcome)
    }

    /// Cells as `{ owner, count }` objects for rendering.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.board.cells()).map_err(JsValue::from)
    }
}

impl ChainReactionBoard {
    /// Wrap a position. A position where a player is already wiped out starts out finished.
    pub fn from_board(board: Board, to_move: Player) -> Self {
        Self {
            board,
            to_move,
            outcome: board.outcome(),
        }
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn current_outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Resolve a move for the player on turn, record a finished game, and pass the turn.
    pub fn play(&mut self, row: usize, col: usize) -> Result<CascadeReport, GameError> {
        if self.outcome.is_some() {
            return Err(GameError::GameOver);
        }
        let mover = self.to_move;
        let report = self.board.apply_move(mover, row, col)?;
        self.outcome = self.board.outcome();
        if let Some(outcome) = self.outcome {
            log::debug!("{mover} played ({row}, {col}), game over: {outcome:?}");
        }
        self.to_move = mover.other();
        Ok(report)
    }
}

impl Default for ChainReactionBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn player_from_index(index: u8) -> Result<Player, GameError> {
    Player::from_index(index)
        .ok_or_else(|| GameError::InvalidState(format!("unknown player index {index}")))
}
