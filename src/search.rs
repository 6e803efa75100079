//! Depth-limited minimax over the cascade rules.
//!
//! Both layers score leaves with [`evaluate`] from the searching player's point of view: the
//! maximizing layer expands the searching player's moves, the minimizing layer the opponent's.
//! Moves are tried in [`Board::legal_moves`] order and a layer only replaces its current best on
//! a strictly better value, so equal scores keep the earliest row-major move.
//!
//! Plain minimax is exhaustive. Alpha-beta is available through [`SearchConfig::alpha_beta`] and
//! picks the same move with the same root score; it is never switched on implicitly.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::board::{Board, Move, Player};
use crate::cascade::DEFAULT_EXPLOSION_LIMIT;
use crate::error::GameError;
use crate::eval::evaluate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Plies to search. Must be at least 1.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Prune with alpha-beta. Same chosen move as the exhaustive search when no budget is set.
    #[serde(default, alias = "alphaBeta")]
    pub alpha_beta: bool,
    /// Stop expanding after this many nodes; remaining nodes are scored statically.
    #[serde(default, alias = "maxNodes")]
    pub max_nodes: Option<u64>,
    /// Wall-clock budget in milliseconds, same truncation rule as `max_nodes`.
    #[serde(default, alias = "timeBudgetMs")]
    pub time_budget_ms: Option<f64>,
    /// Explosion ceiling handed to the cascade resolver for every simulated move.
    #[serde(default = "default_explosion_limit", alias = "explosionLimit")]
    pub explosion_limit: usize,
}

fn default_depth() -> u32 {
    3
}
fn default_explosion_limit() -> usize {
    DEFAULT_EXPLOSION_LIMIT
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            alpha_beta: false,
            max_nodes: None,
            time_budget_ms: None,
            explosion_limit: default_explosion_limit(),
        }
    }
}

impl SearchConfig {
    pub fn with_depth(depth: u32) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.depth == 0 {
            return Err(GameError::Config("depth must be at least 1".into()));
        }
        if self.max_nodes == Some(0) {
            return Err(GameError::Config("max_nodes must be > 0".into()));
        }
        if let Some(budget) = self.time_budget_ms {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(GameError::Config("time_budget_ms must be a positive number".into()));
            }
        }
        if self.explosion_limit == 0 {
            return Err(GameError::Config("explosion_limit must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    /// Nodes visited, root included.
    pub nodes: u64,
    /// Nodes scored statically.
    pub leaves: u64,
    /// A node or time budget cut the search short.
    pub budget_exhausted: bool,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// `None` only when the root itself is a cutoff (the opponent is already wiped out).
    pub best_move: Option<Move>,
    /// Minimax value of the root from the searching player's point of view.
    pub score: i32,
    pub depth: u32,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Maximizing,
    Minimizing,
}

impl Layer {
    fn flip(self) -> Self {
        match self {
            Layer::Maximizing => Layer::Minimizing,
            Layer::Minimizing => Layer::Maximizing,
        }
    }

    /// `true` when `value` should replace `best` on this layer.
    fn improves(self, value: i32, best: Option<(i32, Move)>) -> bool {
        match (self, best) {
            (_, None) => true,
            (Layer::Maximizing, Some((current, _))) => value > current,
            (Layer::Minimizing, Some((current, _))) => value < current,
        }
    }
}

/// Raw minimax value and move of `board` for `player`, exhaustive, `depth` plies deep.
///
/// At a cutoff (`depth == 0` or either player has no cells) the move is `None`.
pub fn minimax(board: &Board, player: Player, depth: u32) -> Result<(i32, Option<Move>), GameError> {
    let config = SearchConfig {
        depth,
        ..SearchConfig::default()
    };
    let mut searcher = Searcher::new(player, &config);
    searcher.minimax(board, depth, Layer::Maximizing, true)
}

/// Move `player` should make, found by exhaustive minimax `depth` plies deep.
///
/// Returns `Ok(None)` when there is nothing to search: `depth == 0` or the opponent already has
/// no cells. A player without cells has no move at all and gets [`GameError::EmptyMoveSet`].
pub fn select_move(board: &Board, player: Player, depth: u32) -> Result<Option<Move>, GameError> {
    if !board.has_pieces(player) {
        return Err(GameError::EmptyMoveSet(player));
    }
    let (_, best) = minimax(board, player, depth)?;
    Ok(best)
}

/// Configurable search: optional alpha-beta, node and time budgets, statistics.
pub fn search(board: &Board, player: Player, config: &SearchConfig) -> Result<SearchResult, GameError> {
    config.validate()?;
    if !board.has_pieces(player) {
        return Err(GameError::EmptyMoveSet(player));
    }

    let mut searcher = Searcher::new(player, config);
    let (score, best_move) = if config.alpha_beta {
        searcher.alpha_beta(board, config.depth, Layer::Maximizing, i32::MIN, i32::MAX, true)?
    } else {
        searcher.minimax(board, config.depth, Layer::Maximizing, true)?
    };
    let stats = SearchStats {
        nodes: searcher.nodes,
        leaves: searcher.leaves,
        budget_exhausted: searcher.exhausted,
        elapsed_ms: searcher.clock.elapsed_ms(),
    };

    if stats.budget_exhausted {
        log::warn!(
            "search budget spent after {} nodes ({:.1} ms), result is truncated",
            stats.nodes,
            stats.elapsed_ms
        );
    }
    match best_move {
        Some(mv) => log::debug!(
            "{player} depth {}: {mv} scores {score} ({} nodes, {:.1} ms)",
            config.depth,
            stats.nodes,
            stats.elapsed_ms
        ),
        None => log::debug!("{player} depth {}: root is terminal, score {score}", config.depth),
    }

    Ok(SearchResult {
        best_move,
        score,
        depth: config.depth,
        stats,
    })
}

struct Searcher<'a> {
    player: Player,
    config: &'a SearchConfig,
    clock: Clock,
    nodes: u64,
    leaves: u64,
    exhausted: bool,
}

impl<'a> Searcher<'a> {
    fn new(player: Player, config: &'a SearchConfig) -> Self {
        Self {
            player,
            config,
            clock: Clock::start(),
            nodes: 0,
            leaves: 0,
            exhausted: false,
        }
    }

    fn minimax(&mut self, board: &Board, depth: u32, layer: Layer, root: bool) -> Result<(i32, Option<Move>), GameError> {
        self.nodes += 1;
        if self.is_cutoff(board, depth, root) {
            return Ok(self.leaf(board));
        }

        let side = self.side_to_move(layer);
        let mut best: Option<(i32, Move)> = None;
        for mv in board.legal_moves(side) {
            let child = self.play(board, side, mv)?;
            let (value, _) = self.minimax(&child, depth - 1, layer.flip(), false)?;
            if layer.improves(value, best) {
                best = Some((value, mv));
            }
        }
        Ok(self.finish(board, best))
    }

    fn alpha_beta(
        &mut self,
        board: &Board,
        depth: u32,
        layer: Layer,
        mut alpha: i32,
        mut beta: i32,
        root: bool,
    ) -> Result<(i32, Option<Move>), GameError> {
        self.nodes += 1;
        if self.is_cutoff(board, depth, root) {
            return Ok(self.leaf(board));
        }

        let side = self.side_to_move(layer);
        let mut best: Option<(i32, Move)> = None;
        for mv in board.legal_moves(side) {
            let child = self.play(board, side, mv)?;
            let (value, _) = self.alpha_beta(&child, depth - 1, layer.flip(), alpha, beta, false)?;
            if layer.improves(value, best) {
                best = Some((value, mv));
            }
            match layer {
                Layer::Maximizing => alpha = alpha.max(value),
                Layer::Minimizing => beta = beta.min(value),
            }
            if alpha >= beta {
                break;
            }
        }
        Ok(self.finish(board, best))
    }

    fn side_to_move(&self, layer: Layer) -> Player {
        match layer {
            Layer::Maximizing => self.player,
            Layer::Minimizing => self.player.other(),
        }
    }

    /// Each branch gets its own copy of the board.
    fn play(&self, board: &Board, side: Player, mv: Move) -> Result<Board, GameError> {
        let mut child = *board;
        child.apply_move_with_limit(side, mv.row, mv.col, self.config.explosion_limit)?;
        Ok(child)
    }

    fn is_cutoff(&mut self, board: &Board, depth: u32, root: bool) -> bool {
        if depth == 0 || !board.has_pieces(Player::A) || !board.has_pieces(Player::B) {
            return true;
        }
        // The root is always expanded so a budgeted search still returns a move.
        !root && self.budget_spent()
    }

    fn budget_spent(&mut self) -> bool {
        if self.exhausted {
            return true;
        }
        let over_nodes = self.config.max_nodes.is_some_and(|limit| self.nodes > limit);
        let over_time = self
            .config
            .time_budget_ms
            .is_some_and(|limit| self.clock.elapsed_ms() >= limit);
        self.exhausted = over_nodes || over_time;
        self.exhausted
    }

    fn leaf(&mut self, board: &Board) -> (i32, Option<Move>) {
        self.leaves += 1;
        (evaluate(board, self.player), None)
    }

    fn finish(&mut self, board: &Board, best: Option<(i32, Move)>) -> (i32, Option<Move>) {
        match best {
            Some((value, mv)) => (value, Some(mv)),
            None => self.leaf(board),
        }
    }
}

/// Milliseconds since the search started. `Instant` is unavailable on `wasm32-unknown-unknown`.
struct Clock {
    #[cfg(target_arch = "wasm32")]
    start_ms: f64,
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            #[cfg(target_arch = "wasm32")]
            start_ms: js_sys::Date::now(),
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> f64 {
        #[cfg(target_arch = "wasm32")]
        {
            js_sys::Date::now() - self.start_ms
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_secs_f64() * 1000.0
        }
    }
}

/// Automated player for the JavaScript side.
#[wasm_bindgen]
pub struct ChainReactionSearch {
    config: SearchConfig,
    rng: SmallRng,
}

#[wasm_bindgen]
impl ChainReactionSearch {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ChainReactionSearch, JsValue> {
        let cfg: SearchConfig = if config.is_undefined() || config.is_null() {
            SearchConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Self::with_config(cfg).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = defaultConfig)]
    pub fn default_config() -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&SearchConfig::default()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = setSeed)]
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Search a 25-entry signed board for `player` (0 = A, 1 = B) and return the
    /// `{ best_move, score, depth, stats }` result object.
    pub fn search(&self, board_state: Vec<i8>, player: u8) -> Result<JsValue, JsValue> {
        let (board, player) = decode(&board_state, player)?;
        let result = search(&board, player, &self.config)?;
        serde_wasm_bindgen::to_value(&result).map_err(JsValue::from)
    }

    /// Uniformly random legal move as a flat action index.
    #[wasm_bindgen(js_name = randomMove)]
    pub fn random_move(&mut self, board_state: Vec<i8>, player: u8) -> Result<u8, JsValue> {
        let (board, player) = decode(&board_state, player)?;
        let mv = crate::random::random_move(&board, player, &mut self.rng)?;
        Ok(mv.index() as u8)
    }
}

impl ChainReactionSearch {
    pub fn with_config(config: SearchConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: SmallRng::from_entropy(),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

fn decode(board_state: &[i8], player: u8) -> Result<(Board, Player), GameError> {
    let board = Board::from_bytes(board_state)?;
    let player = Player::from_index(player)
        .ok_or_else(|| GameError::InvalidState(format!("unknown player index {player}")))?;
    Ok((board, player))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::random::playout;

    fn board_with(cells: &[(usize, usize, Player, u8)]) -> Board {
        let mut board = Board::empty();
        for &(row, col, player, count) in cells {
            board.set(row, col, Cell::owned(player, count)).unwrap();
        }
        board
    }

    fn mv(row: usize, col: usize) -> Move {
        Move::new(row, col).unwrap()
    }

    #[test]
    fn depth_one_takes_the_capture() {
        // Exploding (2, 2) captures B's only cell; growing (0, 0) does not.
        let board = board_with(&[(0, 0, Player::A, 1), (2, 2, Player::A, 3), (2, 3, Player::B, 2)]);
        let (score, best) = minimax(&board, Player::A, 1).unwrap();
        assert_eq!(best, Some(mv(2, 2)));
        assert_eq!(score, 1 + 1 + 1 + 3 + 1);
    }

    #[test]
    fn equal_scores_keep_the_earliest_move() {
        // Mirror-image cells: every move scores the same.
        let board = board_with(&[(0, 0, Player::A, 1), (4, 4, Player::A, 1), (2, 2, Player::B, 1)]);
        assert_eq!(select_move(&board, Player::A, 1).unwrap(), Some(mv(0, 0)));
        assert_eq!(select_move(&board, Player::A, 2).unwrap(), Some(mv(0, 0)));
    }

    #[test]
    fn minimizing_layer_uses_the_searching_players_score() {
        // Depth 2: after any A move, B answers with its most damaging reply.
        let board = board_with(&[(1, 1, Player::A, 1), (3, 3, Player::A, 2), (3, 4, Player::B, 3)]);
        let (score, best) = minimax(&board, Player::A, 2).unwrap();

        let mut expected: Option<(i32, Move)> = None;
        for a in board.legal_moves(Player::A) {
            let mut after_a = board;
            after_a.apply_move(Player::A, a.row, a.col).unwrap();
            let worst = after_a
                .legal_moves(Player::B)
                .iter()
                .map(|b| {
                    let mut after_b = after_a;
                    after_b.apply_move(Player::B, b.row, b.col).unwrap();
                    evaluate(&after_b, Player::A)
                })
                .min()
                .unwrap();
            if expected.map_or(true, |(v, _)| worst > v) {
                expected = Some((worst, a));
            }
        }
        assert_eq!(Some((score, best.unwrap())), expected);
    }

    #[test]
    fn selection_is_repeatable() {
        let board = board_with(&[
            (0, 1, Player::A, 2),
            (1, 1, Player::A, 3),
            (2, 3, Player::A, 1),
            (4, 0, Player::A, 3),
            (2, 2, Player::B, 3),
            (3, 3, Player::B, 2),
            (4, 4, Player::B, 1),
        ]);
        assert_eq!(board.legal_moves(Player::A).len(), 4);
        assert_eq!(board.legal_moves(Player::B).len(), 3);

        for player in [Player::A, Player::B] {
            let first = select_move(&board, player, 3).unwrap();
            let second = select_move(&board, player, 3).unwrap();
            assert_eq!(first, second);
            let chosen = first.unwrap();
            assert!(board.get(chosen.row, chosen.col).unwrap().is_owned_by(player));
            assert_eq!(minimax(&board, player, 3).unwrap(), minimax(&board, player, 3).unwrap());
        }
    }

    #[test]
    fn depth_zero_yields_no_move() {
        let board = Board::new();
        let (score, best) = minimax(&board, Player::A, 0).unwrap();
        assert_eq!(best, None);
        assert_eq!(score, evaluate(&board, Player::A));
        assert_eq!(select_move(&board, Player::A, 0).unwrap(), None);
    }

    #[test]
    fn finished_game_is_a_cutoff() {
        let board = board_with(&[(2, 2, Player::A, 2)]);
        assert_eq!(select_move(&board, Player::A, 3).unwrap(), None);
        assert_eq!(
            select_move(&board, Player::B, 3),
            Err(GameError::EmptyMoveSet(Player::B))
        );
    }

    #[test]
    fn search_leaves_the_input_board_alone() {
        let board = Board::new();
        let copy = board;
        search(&board, Player::A, &SearchConfig::with_depth(3)).unwrap();
        assert_eq!(board, copy);
    }

    #[test]
    fn config_validation() {
        assert!(SearchConfig::default().validate().is_ok());
        assert!(SearchConfig::with_depth(0).validate().is_err());
        let config = SearchConfig {
            time_budget_ms: Some(f64::NAN),
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());
        let config = SearchConfig {
            max_nodes: Some(0),
            ..SearchConfig::default()
        };
        assert!(matches!(search(&Board::new(), Player::A, &config), Err(GameError::Config(_))));
    }

    #[test]
    fn alpha_beta_matches_exhaustive_search() {
        let mut rng = SmallRng::seed_from_u64(2024);
        let mut checked = 0;
        for plies in [4, 8, 12, 16, 20, 24, 30, 36] {
            let game = playout(&Board::new(), Player::A, plies, &mut rng).unwrap();
            if game.outcome.is_some() {
                continue;
            }
            for player in [Player::A, Player::B] {
                for depth in 1..=4 {
                    let plain = search(&game.board, player, &SearchConfig::with_depth(depth)).unwrap();
                    let pruned = search(
                        &game.board,
                        player,
                        &SearchConfig {
                            alpha_beta: true,
                            ..SearchConfig::with_depth(depth)
                        },
                    )
                    .unwrap();
                    assert_eq!(plain.best_move, pruned.best_move, "{:?}", game.board);
                    assert_eq!(plain.score, pruned.score);
                    assert!(pruned.stats.nodes <= plain.stats.nodes);
                    checked += 1;
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn node_budget_truncates_but_still_moves() {
        let board = board_with(&[
            (0, 0, Player::A, 2),
            (1, 1, Player::A, 3),
            (2, 2, Player::A, 1),
            (3, 3, Player::B, 3),
            (4, 4, Player::B, 2),
        ]);
        let config = SearchConfig {
            max_nodes: Some(5),
            ..SearchConfig::with_depth(4)
        };
        let result = search(&board, Player::A, &config).unwrap();
        assert!(result.stats.budget_exhausted);
        let chosen = result.best_move.unwrap();
        assert!(board.get(chosen.row, chosen.col).unwrap().is_owned_by(Player::A));

        let full = search(&board, Player::A, &SearchConfig::with_depth(4)).unwrap();
        assert!(!full.stats.budget_exhausted);
        assert!(full.stats.nodes > result.stats.nodes);
    }
}
