use smallvec::SmallVec;

use crate::board::{Board, Move, Player, CELL_COUNT};
use crate::error::GameError;

/// Opponent material counts this many times against the evaluated player.
pub const OPPONENT_WEIGHT: i32 = 3;

/// Static score of `board` for `player`: own material minus three times the opponent's.
pub fn evaluate(board: &Board, player: Player) -> i32 {
    board.material(player) - OPPONENT_WEIGHT * board.material(player.other())
}

/// Own material after each legal move of `player`, in enumeration order.
pub fn move_scores(board: &Board, player: Player) -> Result<SmallVec<[(Move, i32); CELL_COUNT]>, GameError> {
    board
        .legal_moves(player)
        .into_iter()
        .map(|mv| {
            let mut next = *board;
            next.apply_move(player, mv.row, mv.col)?;
            Ok((mv, next.material(player)))
        })
        .collect()
}

/// One-ply greedy suggestion: the first move whose resulting own material beats every earlier
/// one. Falls back to the first legal move when nothing scores above zero.
pub fn greedy_move(board: &Board, player: Player) -> Result<Move, GameError> {
    let scores = move_scores(board, player)?;
    let Some(&(first, _)) = scores.first() else {
        return Err(GameError::EmptyMoveSet(player));
    };
    let mut best = first;
    let mut best_score = 0;
    for &(mv, score) in &scores {
        if score > best_score {
            best = mv;
            best_score = score;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;

    #[test]
    fn opponent_material_weighs_triple() {
        let board = Board::new();
        assert_eq!(evaluate(&board, Player::A), 3 - 9);
        assert_eq!(evaluate(&board, Player::B), 3 - 9);

        let mut board = Board::empty();
        board.set(0, 0, Cell::owned(Player::A, 2)).unwrap();
        board.set(4, 4, Cell::owned(Player::A, 3)).unwrap();
        board.set(2, 2, Cell::owned(Player::B, 1)).unwrap();
        assert_eq!(evaluate(&board, Player::A), 5 - 3);
        assert_eq!(evaluate(&board, Player::B), 1 - 15);
    }

    #[test]
    fn empty_board_scores_zero() {
        assert_eq!(evaluate(&Board::empty(), Player::A), 0);
    }

    #[test]
    fn greedy_prefers_the_move_that_grows_material() {
        let mut board = Board::empty();
        // Exploding in the corner loses two pieces; growing (2, 2) gains one.
        board.set(0, 0, Cell::owned(Player::A, 3)).unwrap();
        board.set(2, 2, Cell::owned(Player::A, 1)).unwrap();

        let scores = move_scores(&board, Player::A).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].1, 3);
        assert_eq!(scores[1].1, 5);
        assert_eq!(greedy_move(&board, Player::A), Ok(Move::new(2, 2).unwrap()));
    }

    #[test]
    fn greedy_keeps_the_earliest_of_equal_scores() {
        let mut board = Board::empty();
        board.set(1, 1, Cell::owned(Player::B, 1)).unwrap();
        board.set(3, 3, Cell::owned(Player::B, 1)).unwrap();
        assert_eq!(greedy_move(&board, Player::B), Ok(Move::new(1, 1).unwrap()));
    }

    #[test]
    fn greedy_needs_a_legal_move() {
        let board = Board::new();
        let mut wiped = board;
        wiped.set(3, 3, Cell::EMPTY).unwrap();
        assert_eq!(greedy_move(&wiped, Player::B), Err(GameError::EmptyMoveSet(Player::B)));
    }
}
