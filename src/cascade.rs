//! Cascade resolution: one move grows a cell, a cell reaching [`CRITICAL_COUNT`] explodes into its
//! orthogonal neighbours, and any neighbour pushed to critical mass explodes in turn.
//!
//! Explosions are resolved depth-first in the neighbour order up, down, left, right, using an
//! explicit stack instead of call recursion. The number of explosions per move is capped; the
//! worst legal cascade on a 5×5 grid is far below [`DEFAULT_EXPLOSION_LIMIT`].

use serde::Serialize;
use smallvec::SmallVec;

use crate::board::{Board, Cell, Player, BOARD_SIZE, CELL_COUNT, CRITICAL_COUNT};
use crate::error::GameError;

/// Hard ceiling on explosions resolved for a single move.
pub const DEFAULT_EXPLOSION_LIMIT: usize = 4 * CELL_COUNT;

const NEIGHBOURS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// What a resolved move did to the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub explosions: usize,
    /// Opponent cells flipped to the mover, counted each time a flip happens.
    pub captures: usize,
}

/// A cell mid-explosion and the next neighbour direction it still has to feed.
#[derive(Clone, Copy)]
struct Frame {
    index: usize,
    next: usize,
}

impl Board {
    /// Play `player` at `(row, col)` and resolve every explosion it triggers.
    ///
    /// The cell must be owned by `player`. On error the board is left untouched.
    pub fn apply_move(&mut self, player: Player, row: usize, col: usize) -> Result<CascadeReport, GameError> {
        self.apply_move_with_limit(player, row, col, DEFAULT_EXPLOSION_LIMIT)
    }

    pub fn apply_move_with_limit(
        &mut self,
        player: Player,
        row: usize,
        col: usize,
        limit: usize,
    ) -> Result<CascadeReport, GameError> {
        let target = self.get(row, col)?;
        if !target.is_owned_by(player) {
            return Err(GameError::InvalidMove { player, row, col });
        }

        let mut next = *self;
        let report = next.resolve(player, row * BOARD_SIZE + col, limit)?;
        *self = next;
        log::trace!(
            "{player} at ({row}, {col}): {} explosions, {} captures",
            report.explosions,
            report.captures
        );
        Ok(report)
    }

    fn resolve(&mut self, player: Player, origin: usize, limit: usize) -> Result<CascadeReport, GameError> {
        let mut report = CascadeReport::default();
        if !self.add_piece(origin, player, &mut report) {
            return Ok(report);
        }

        let mut stack: SmallVec<[Frame; 16]> = SmallVec::new();
        record_explosion(&mut report, limit)?;
        stack.push(Frame {
            index: origin,
            next: 0,
        });

        while let Some(frame) = stack.last_mut() {
            if frame.next == NEIGHBOURS.len() {
                stack.pop();
                continue;
            }
            let direction = frame.next;
            frame.next += 1;
            let Some(target) = neighbour(frame.index, direction) else {
                continue;
            };
            if self.add_piece(target, player, &mut report) {
                record_explosion(&mut report, limit)?;
                stack.push(Frame {
                    index: target,
                    next: 0,
                });
            }
        }
        Ok(report)
    }

    /// Add one of `player`'s pieces to a cell, capturing it if the opponent holds it.
    /// Returns `true` when the cell hit critical mass; it is then already cleared.
    fn add_piece(&mut self, index: usize, player: Player, report: &mut CascadeReport) -> bool {
        let cell = &mut self.cells[index];
        let count = match cell.owner {
            None => 1,
            Some(owner) if owner == player => cell.count + 1,
            Some(_) => {
                report.captures += 1;
                cell.count + 1
            }
        };
        if count >= CRITICAL_COUNT {
            *cell = Cell::EMPTY;
            true
        } else {
            *cell = Cell::owned(player, count);
            false
        }
    }
}

fn record_explosion(report: &mut CascadeReport, limit: usize) -> Result<(), GameError> {
    report.explosions += 1;
    if report.explosions > limit {
        log::warn!("cascade aborted after {limit} explosions");
        return Err(GameError::CascadeOverflow { limit });
    }
    Ok(())
}

fn neighbour(index: usize, direction: usize) -> Option<usize> {
    let (dr, dc) = NEIGHBOURS[direction];
    let row = (index / BOARD_SIZE).checked_add_signed(dr)?;
    let col = (index % BOARD_SIZE).checked_add_signed(dc)?;
    (row < BOARD_SIZE && col < BOARD_SIZE).then_some(row * BOARD_SIZE + col)
}
