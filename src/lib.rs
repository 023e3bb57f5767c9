/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Bitboard primitives for pawn-structure analysis.
mod bits;

/// Engine commands parseable from the command line.
mod cli;

/// Code related to the engine's functionality, such as user input handling.
mod engine;

/// Evaluation of chess positions.
mod eval;

/// 0x88 direction/distance tables and slider path masks.
mod geometry;

/// Killer-move and deep-killer tables.
mod killers;

/// Position-history table for repetition detection.
mod repetition;

/// Centipawn score type and mate encoding.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Transposition tables for the main and quiescence searches.
mod ttable;

/// Tunable search and evaluation parameters.
mod tune;

/// Misc utility functions, constants, and types.
mod utils;

pub use bits::*;
pub use cli::*;
pub use engine::*;
pub use eval::*;
pub use geometry::*;
pub use killers::*;
pub use repetition::*;
pub use score::*;
pub use search::*;
pub use ttable::*;
pub use utils::*;

/// Maximum number of plies that can ever separate a node from the root.
pub const MAX_PLY: usize = 255;
