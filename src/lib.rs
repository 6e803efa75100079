#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! WebAssembly bindings for a 5×5 chain-reaction territory game and its minimax opponent.
//!
//! Players own cells holding 1 to 3 pieces. A move adds a piece to one of the mover's cells; a
//! cell reaching four pieces explodes, emptying itself and pushing one piece into each
//! orthogonal neighbour, capturing opponent cells on the way, which can set off further
//! explosions. A player wins once the opponent owns no cells.
//!
//! The crate exposes:
//!
//! * [`Board`] – a `Copy` 25-cell grid with the cascade resolver ([`Board::apply_move`]), move
//!   enumeration and terminal detection, plus the [`ChainReactionBoard`] handle a JavaScript
//!   controller drives turn by turn.
//! * [`search`] – exhaustive minimax with deterministic tie-breaks, an opt-in alpha-beta path
//!   and node/time budgets, wrapped for JavaScript by [`ChainReactionSearch`].
//! * [`evaluate`] and [`greedy_move`] – the static evaluator and the one-ply hint.

mod board;
mod cascade;
mod error;
mod eval;
mod logging;
mod random;
mod search;

pub use board::{
    Board, Cell, ChainReactionBoard, Move, MoveList, Outcome, Player, BOARD_SIZE, CELL_COUNT, CRITICAL_COUNT,
    MAX_COUNT, STATE_SIZE,
};
pub use cascade::{CascadeReport, DEFAULT_EXPLOSION_LIMIT};
pub use error::GameError;
pub use eval::{evaluate, greedy_move, move_scores, OPPONENT_WEIGHT};
pub use random::{playout, random_move, Playout};
pub use search::{
    minimax, search, select_move, ChainReactionSearch, SearchConfig, SearchResult, SearchStats,
};

use wasm_bindgen::prelude::*;

/// Install a panic hook sending Rust panics to the browser console. The hook is only compiled in
/// when the `console_error_panic_hook` feature is enabled (default).
#[wasm_bindgen(js_name = initPanicHook)]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Route `log` records at or above `level` (`"error"` … `"trace"`, `"off"`) to the console.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    logging::init(logging::parse_level(level));
}

/// Side length of the square board (5).
#[wasm_bindgen(js_name = boardSize)]
pub fn board_size() -> usize {
    BOARD_SIZE
}

/// Flattened board state length (25 signed counts).
#[wasm_bindgen(js_name = stateSize)]
pub fn state_size() -> usize {
    STATE_SIZE
}
