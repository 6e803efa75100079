use crate::board::Player;

/// Errors surfaced to the game controller. None of them leave a board half-updated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("cell ({row}, {col}) is outside the 5x5 board")]
    OutOfBounds { row: usize, col: usize },

    #[error("{player} does not own cell ({row}, {col})")]
    InvalidMove { player: Player, row: usize, col: usize },

    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("the game is already over")]
    GameOver,

    #[error("{0} owns no cells and has no legal move")]
    EmptyMoveSet(Player),

    #[error("cascade exceeded {limit} explosions")]
    CascadeOverflow { limit: usize },

    #[error("invalid board state: {0}")]
    InvalidState(String),

    #[error("invalid search config: {0}")]
    Config(String),
}

impl From<GameError> for wasm_bindgen::JsValue {
    fn from(err: GameError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
