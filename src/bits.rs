/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Raw `u64` square-set algebra used by the evaluator's pawn-structure terms.
//!
//! Squares are indexed 0..64 with bit 0 = A1 and bit 63 = H8, so north is a
//! left shift by 8 and south a right shift by 8. See
//! <https://www.chessprogramming.org/General_Setwise_Operations> for the
//! fill/shift identities used here.

use chessie::Color;

/// Mask of the A file.
pub const FILE_A: u64 = 0x0101_0101_0101_0101;

/// Mask of the H file.
pub const FILE_H: u64 = 0x8080_8080_8080_8080;

/// Shift every square one rank toward rank 8.
#[inline(always)]
pub const fn north(bb: u64) -> u64 {
    bb << 8
}

/// Shift every square one rank toward rank 1.
#[inline(always)]
pub const fn south(bb: u64) -> u64 {
    bb >> 8
}

/// Shift every square one file toward the H file.
#[inline(always)]
pub const fn east(bb: u64) -> u64 {
    (bb & !FILE_H) << 1
}

/// Shift every square one file toward the A file.
#[inline(always)]
pub const fn west(bb: u64) -> u64 {
    (bb & !FILE_A) >> 1
}

/// All squares at or north of any square in `bb`, computed by OR-shift doubling.
#[inline(always)]
pub const fn fill_north(mut bb: u64) -> u64 {
    bb |= bb << 8;
    bb |= bb << 16;
    bb |= bb << 32;
    bb
}

/// All squares at or south of any square in `bb`.
#[inline(always)]
pub const fn fill_south(mut bb: u64) -> u64 {
    bb |= bb >> 8;
    bb |= bb >> 16;
    bb |= bb >> 32;
    bb
}

/// Shift one rank forward from `color`'s perspective.
#[inline(always)]
pub fn forward(bb: u64, color: Color) -> u64 {
    if color.is_white() {
        north(bb)
    } else {
        south(bb)
    }
}

/// Fill forward from `color`'s perspective.
#[inline(always)]
pub fn fill_forward(bb: u64, color: Color) -> u64 {
    if color.is_white() {
        fill_north(bb)
    } else {
        fill_south(bb)
    }
}

/// The "scope" of `color`'s pawns: every square one of those pawns could
/// eventually push to or attack, ignoring all other pieces.
///
/// Computed as the forward fill of the single pushes and their diagonals.
#[inline(always)]
pub fn pawn_scope(pawns: u64, color: Color) -> u64 {
    let pushes = forward(pawns, color);
    fill_forward(pushes | east(pushes) | west(pushes), color)
}

/// Pawns of `color` with no enemy pawn able to stop or trade them: those
/// outside the scope of `enemy_pawns`.
#[inline(always)]
pub fn passed_pawns(pawns: u64, enemy_pawns: u64, color: Color) -> u64 {
    pawns & !pawn_scope(enemy_pawns, color.opponent())
}

/// Pawns of `color` with a friendly pawn directly ahead of them on the same file.
#[inline(always)]
pub fn doubled_pawns(pawns: u64, color: Color) -> u64 {
    // A pawn is doubled if it sits in the rear-fill of another pawn.
    if color.is_white() {
        pawns & fill_south(south(pawns))
    } else {
        pawns & fill_north(north(pawns))
    }
}

/// Pawns with a friendly pawn on an adjacent file in the rank ahead, the same
/// rank, or the rank behind.
#[inline(always)]
pub const fn connected_pawns(pawns: u64) -> u64 {
    let neighbors = east(pawns) | west(pawns);
    pawns & (neighbors | north(neighbors) | south(neighbors))
}

/// Pawns standing side by side with a friendly pawn on the same rank.
#[inline(always)]
pub const fn phalanx_pawns(pawns: u64) -> u64 {
    pawns & (east(pawns) | west(pawns))
}

/// All squares adjacent (including diagonally) to any square in `bb`.
#[inline(always)]
pub const fn adjacent(bb: u64) -> u64 {
    let horizontal = bb | east(bb) | west(bb);
    (horizontal | north(horizontal) | south(horizontal)) & !bb
}

/// Project a pawn set onto an 8-bit word with bit `f` set iff file `f` holds a pawn.
#[inline(always)]
pub const fn file_occupancy(pawns: u64) -> u8 {
    let mut bb = pawns;
    bb |= bb >> 32;
    bb |= bb >> 16;
    bb |= bb >> 8;
    (bb & 0xFF) as u8
}

/// Number of pawn islands: maximal runs of set bits in a file-occupancy word.
#[inline(always)]
pub const fn island_count(files: u8) -> u32 {
    // Each island contributes exactly one "run start": a set bit whose
    // lower-file neighbor is clear.
    (files & !(files << 1)).count_ones()
}

/// Files whose pawns have no friendly pawn on either adjacent file.
#[inline(always)]
pub const fn isolated_files(files: u8) -> u8 {
    files & !((files << 1) | (files >> 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessie::Square;

    fn bb(squares: &[Square]) -> u64 {
        squares.iter().fold(0, |acc, sq| acc | sq.bitboard().inner())
    }

    #[test]
    fn test_fills() {
        let e4 = Square::E4.bitboard().inner();
        let north_fill = fill_north(e4);
        assert_eq!(north_fill.count_ones(), 5); // e4..e8
        assert_ne!(north_fill & Square::E8.bitboard().inner(), 0);
        assert_eq!(north_fill & Square::E3.bitboard().inner(), 0);

        let south_fill = fill_south(e4);
        assert_eq!(south_fill.count_ones(), 4); // e4..e1
    }

    #[test]
    fn test_passed_pawns() {
        // White pawn on a5 is stopped by the black b-pawn; the e-pawn is free.
        let white = bb(&[Square::A5, Square::E5]);
        let black = bb(&[Square::B7]);

        let passed = passed_pawns(white, black, Color::White);
        assert_eq!(passed, bb(&[Square::E5]));

        // From Black's point of view, the b7 pawn is stopped by the white a-pawn.
        assert_eq!(passed_pawns(black, white, Color::Black), 0);
    }

    #[test]
    fn test_doubled_pawns() {
        let white = bb(&[Square::C2, Square::C4, Square::D2]);
        // Only c2 has a friendly pawn ahead of it.
        assert_eq!(doubled_pawns(white, Color::White), bb(&[Square::C2]));

        let black = bb(&[Square::C7, Square::C5]);
        assert_eq!(doubled_pawns(black, Color::Black), bb(&[Square::C7]));
    }

    #[test]
    fn test_islands_and_isolated() {
        // Pawns on a, b, d, and g files: three islands, of which d and g are isolated.
        let pawns = bb(&[Square::A2, Square::B3, Square::D4, Square::G2]);
        let files = file_occupancy(pawns);

        assert_eq!(files, 0b0100_1011);
        assert_eq!(island_count(files), 3);
        assert_eq!(isolated_files(files), 0b0100_1000);

        assert_eq!(island_count(0), 0);
        assert_eq!(island_count(0b1111_1111), 1);
    }

    #[test]
    fn test_connected_pawns() {
        let pawns = bb(&[Square::D4, Square::E5, Square::H2]);
        // d4 and e5 defend each other diagonally; h2 has no neighbor.
        assert_eq!(connected_pawns(pawns), bb(&[Square::D4, Square::E5]));
        assert_eq!(phalanx_pawns(pawns), 0);

        let phalanx = bb(&[Square::D4, Square::E4]);
        assert_eq!(phalanx_pawns(phalanx), phalanx);
    }
}
