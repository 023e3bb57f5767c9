/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use chessie::Move;

use crate::{tune, MAX_PLY};

/// Number of [killer moves](https://www.chessprogramming.org/Killer_Move)
/// remembered per ply.
const KILLERS_PER_PLY: usize = tune::max_killers_per_ply!();

/// Per-ply memory of quiet moves that recently caused a beta cutoff.
///
/// Killers are ordering hints only; they must be validated against the legal
/// move list before being searched.
#[derive(Debug)]
pub struct Killers {
    moves: [[Option<Move>; KILLERS_PER_PLY]; MAX_PLY],
}

impl Killers {
    /// Record `mv` as a killer at `ply`.
    ///
    /// The newest killer sits at index 0; re-adding a killer that is already
    /// present promotes it back to the front rather than duplicating it.
    pub fn insert(&mut self, ply: i32, mv: Move) {
        let slots = &mut self.moves[ply_index(ply)];

        // Shift everything down to where `mv` already was (or the end),
        // then place `mv` at the front.
        let end = slots
            .iter()
            .position(|k| *k == Some(mv))
            .unwrap_or(KILLERS_PER_PLY - 1);

        slots.copy_within(0..end, 1);
        slots[0] = Some(mv);
    }

    /// All killers recorded at `ply`, most recent first.
    #[inline(always)]
    pub fn at(&self, ply: i32) -> impl Iterator<Item = Move> + '_ {
        self.moves[ply_index(ply)].iter().flatten().copied()
    }

    /// The most recent killer at `ply`, if any.
    #[inline(always)]
    pub fn first(&self, ply: i32) -> Option<Move> {
        self.moves[ply_index(ply)][0]
    }
}

impl Default for Killers {
    fn default() -> Self {
        Self {
            moves: [[None; KILLERS_PER_PLY]; MAX_PLY],
        }
    }
}

/// One move per ply: the best move found at that ply anywhere in the current
/// search tree, persisting across sibling subtrees.
#[derive(Debug)]
pub struct DeepKillers {
    moves: [Option<Move>; MAX_PLY],
}

impl DeepKillers {
    /// Remember `mv` as the best move seen at `ply` so far.
    #[inline(always)]
    pub fn insert(&mut self, ply: i32, mv: Move) {
        self.moves[ply_index(ply)] = Some(mv);
    }

    /// The remembered move for `ply`, if any.
    #[inline(always)]
    pub fn at(&self, ply: i32) -> Option<Move> {
        self.moves[ply_index(ply)]
    }
}

impl Default for DeepKillers {
    fn default() -> Self {
        Self {
            moves: [None; MAX_PLY],
        }
    }
}

/// Clamp a ply to a valid table index.
#[inline(always)]
fn ply_index(ply: i32) -> usize {
    (ply.max(0) as usize).min(MAX_PLY - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessie::{MoveKind, Square};

    fn mv(from: Square, to: Square) -> Move {
        Move::new(from, to, MoveKind::Quiet)
    }

    #[test]
    fn test_most_recent_first() {
        let mut killers = Killers::default();
        let a = mv(Square::E2, Square::E4);
        let b = mv(Square::D2, Square::D4);

        killers.insert(3, a);
        killers.insert(3, b);

        let at_ply: Vec<_> = killers.at(3).collect();
        assert_eq!(at_ply, vec![b, a]);

        // Other plies are unaffected
        assert_eq!(killers.at(4).count(), 0);
    }

    #[test]
    fn test_reinsert_promotes() {
        let mut killers = Killers::default();
        let a = mv(Square::E2, Square::E4);
        let b = mv(Square::D2, Square::D4);
        let c = mv(Square::G1, Square::F3);

        killers.insert(0, a);
        killers.insert(0, b);
        killers.insert(0, c);
        killers.insert(0, a);

        let at_ply: Vec<_> = killers.at(0).collect();
        assert_eq!(at_ply, vec![a, c, b]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut killers = Killers::default();
        let moves = [
            mv(Square::A2, Square::A3),
            mv(Square::B2, Square::B3),
            mv(Square::C2, Square::C3),
            mv(Square::D2, Square::D3),
            mv(Square::E2, Square::E3),
        ];

        for m in moves {
            killers.insert(1, m);
        }

        let at_ply: Vec<_> = killers.at(1).collect();
        assert_eq!(at_ply.len(), KILLERS_PER_PLY);
        assert_eq!(at_ply[0], moves[4]);
        // The very first killer has been pushed out
        assert!(!at_ply.contains(&moves[0]));
    }
}
