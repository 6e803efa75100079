use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::{Board, Move, Outcome, Player};
use crate::error::GameError;

/// Uniformly random legal move for `player`.
pub fn random_move<R: Rng + ?Sized>(board: &Board, player: Player, rng: &mut R) -> Result<Move, GameError> {
    board
        .legal_moves(player)
        .choose(rng)
        .copied()
        .ok_or(GameError::EmptyMoveSet(player))
}

/// Final position of a random self-play game.
#[derive(Debug, Clone, Copy)]
pub struct Playout {
    pub board: Board,
    pub outcome: Option<Outcome>,
    pub plies: usize,
}

/// Play random moves from `board`, `first` to move, until someone is wiped out or `max_plies`
/// moves have been made.
pub fn playout<R: Rng + ?Sized>(
    board: &Board,
    first: Player,
    max_plies: usize,
    rng: &mut R,
) -> Result<Playout, GameError> {
    let mut board = *board;
    let mut player = first;
    let mut outcome = None;
    let mut plies = 0;
    while plies < max_plies {
        let mv = random_move(&board, player, rng)?;
        board.apply_move(player, mv.row, mv.col)?;
        plies += 1;
        outcome = board.outcome();
        if outcome.is_some() {
            break;
        }
        player = player.other();
    }
    Ok(Playout {
        board,
        outcome,
        plies,
    })
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::board::Cell;

    #[test]
    fn random_move_is_owned_by_the_mover() {
        let mut rng = SmallRng::seed_from_u64(3);
        let board = Board::new();
        for _ in 0..20 {
            let mv = random_move(&board, Player::B, &mut rng).unwrap();
            assert_eq!((mv.row, mv.col), (3, 3));
        }
    }

    #[test]
    fn random_move_without_pieces_fails() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut board = Board::new();
        board.set(1, 1, Cell::EMPTY).unwrap();
        assert_eq!(
            random_move(&board, Player::A, &mut rng),
            Err(GameError::EmptyMoveSet(Player::A))
        );
    }

    #[test]
    fn seeded_playouts_repeat() {
        let first = playout(&Board::new(), Player::A, 300, &mut SmallRng::seed_from_u64(11)).unwrap();
        let second = playout(&Board::new(), Player::A, 300, &mut SmallRng::seed_from_u64(11)).unwrap();
        assert_eq!(first.board, second.board);
        assert_eq!(first.plies, second.plies);
        assert_eq!(first.outcome, second.outcome);
        if let Some(Outcome::Winner(winner)) = first.outcome {
            assert!(!first.board.has_pieces(winner.other()));
        }
    }
}
