/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Tunable parameters for search and evaluation.
//!
//! Everything here is a hand-tuned constant, not a law of nature.
//! Keeping them as macros makes them usable in `const` contexts and
//! easy to wire up to an SPSA tuner later.

/// Divisor applied to our remaining clock time when computing a per-move budget.
macro_rules! time_divisor {
    () => {
        16
    };
}
pub(crate) use time_divisor;

/// Percentage of the time budget after which a new iterative-deepening
/// iteration will not be started.
macro_rules! search_cutoff_percent {
    () => {
        30
    };
}
pub(crate) use search_cutoff_percent;

/// Minimum depth-to-go at which null move pruning can be applied.
macro_rules! min_nmp_depth {
    () => {
        4
    };
}
pub(crate) use min_nmp_depth;

/// Value to subtract from `depth` when applying null move pruning.
macro_rules! nmp_reduction {
    () => {
        3
    };
}
pub(crate) use nmp_reduction;

/// Minimum number of non-pawn, non-king pieces the side to move must have
/// before a null move is tried, to stay clear of zugzwang.
macro_rules! nmp_min_pieces {
    () => {
        4
    };
}
pub(crate) use nmp_min_pieces;

/// Minimum depth-to-go at which internal iterative deepening kicks in
/// when no hash move is available.
macro_rules! min_iid_depth {
    () => {
        2
    };
}
pub(crate) use min_iid_depth;

/// Number of killer moves remembered per ply.
macro_rules! max_killers_per_ply {
    () => {
        4
    };
}
pub(crate) use max_killers_per_ply;

/// Maximum depth of the quiescence search, in plies past the horizon.
macro_rules! max_qsearch_depth {
    () => {
        8
    };
}
pub(crate) use max_qsearch_depth;

/// Quiescence ply from which queen-rampage pruning is applied.
macro_rules! qsearch_rampage_depth {
    () => {
        4
    };
}
pub(crate) use qsearch_rampage_depth;

/// Bulls-eye zone factors for the square-control term, innermost first.
///
/// The board is split into concentric regions of 4, 16, 36 and 64 squares;
/// owning a central square is worth more than owning a rim square.
macro_rules! zone_factors {
    () => {
        [7, 5, 3, 1]
    };
}
pub(crate) use zone_factors;

/// Weight (in tenths of a centipawn) of one attacked square, per region.
macro_rules! influence_weights {
    () => {
        [8, 5, 3, 2]
    };
}
pub(crate) use influence_weights;

/// Divisor applied to influence credited through a friendly queen.
macro_rules! behind_queen_divisor {
    () => {
        2
    };
}
pub(crate) use behind_queen_divisor;

/// Centipawn bonus for owning a square, before the zone factor is applied.
macro_rules! square_control_bonus {
    () => {
        2
    };
}
pub(crate) use square_control_bonus;

/// Penalty for a piece that has no safe square to move to.
macro_rules! stuck_piece_penalty {
    () => {
        12
    };
}
pub(crate) use stuck_piece_penalty;

/// Penalty for a piece attacked by a strictly cheaper enemy piece.
macro_rules! lost_piece_penalty {
    () => {
        28
    };
}
pub(crate) use lost_piece_penalty;

/// Per-piece-type bonus for attacks into the ring adjacent to the enemy king.
macro_rules! king_ring1_weights {
    () => {
        // P, N, B, R, Q, K
        [4, 5, 5, 7, 10, 0]
    };
}
pub(crate) use king_ring1_weights;

/// Per-piece-type bonus for attacks into the second ring around the enemy king.
macro_rules! king_ring2_weights {
    () => {
        [1, 2, 2, 3, 5, 0]
    };
}
pub(crate) use king_ring2_weights;

/// Bonus for a pawn standing on a given rank, from its own side's perspective.
macro_rules! pawn_rank_bonus {
    () => {
        [0, 0, 1, 3, 6, 12, 25, 0]
    };
}
pub(crate) use pawn_rank_bonus;

/// Bonus for a passed pawn on a given rank, from its own side's perspective.
macro_rules! passed_pawn_bonus {
    () => {
        [0, 10, 15, 25, 40, 60, 90, 0]
    };
}
pub(crate) use passed_pawn_bonus;

/// Per-rank multiplier for a passed pawn supported by a neighboring pawn.
macro_rules! connected_passer_factor {
    () => {
        7
    };
}
pub(crate) use connected_passer_factor;

/// Penalty per doubled pawn.
macro_rules! doubled_pawn_penalty {
    () => {
        10
    };
}
pub(crate) use doubled_pawn_penalty;

/// Penalty per pawn island beyond the first.
macro_rules! pawn_island_penalty {
    () => {
        7
    };
}
pub(crate) use pawn_island_penalty;

/// Penalty per isolated pawn.
macro_rules! isolated_pawn_penalty {
    () => {
        9
    };
}
pub(crate) use isolated_pawn_penalty;

/// Bonus per connected pawn (diagonal or adjacent support).
macro_rules! connected_pawn_bonus {
    () => {
        3
    };
}
pub(crate) use connected_pawn_bonus;

/// Additional bonus for pawns standing side by side on the same rank.
macro_rules! phalanx_pawn_bonus {
    () => {
        2
    };
}
pub(crate) use phalanx_pawn_bonus;
