/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Direction and distance lookups between squares, built on
//! [0x88 coordinates](https://www.chessprogramming.org/0x88).
//!
//! On a 0x88 board the signed difference between two squares uniquely
//! identifies their geometric relationship, so a single 240-entry table
//! answers "which ray, how far" for every pair of squares.

use chessie::Square;

/// A geometric relationship between two squares.
///
/// The eight compass rays plus the knight relation; everything else
/// (e.g. a1 and c2) has no entry in the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ray {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Knight,
}

impl Ray {
    /// Returns `true` if this is a rank or file ray (a rook direction).
    #[inline(always)]
    pub const fn is_orthogonal(&self) -> bool {
        matches!(self, Self::North | Self::East | Self::South | Self::West)
    }

    /// Returns `true` if this is a diagonal ray (a bishop direction).
    #[inline(always)]
    pub const fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Self::NorthEast | Self::SouthEast | Self::SouthWest | Self::NorthWest
        )
    }

    const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::North,
            1 => Self::NorthEast,
            2 => Self::East,
            3 => Self::SouthEast,
            4 => Self::South,
            5 => Self::SouthWest,
            6 => Self::West,
            7 => Self::NorthWest,
            _ => Self::Knight,
        }
    }
}

/// Marker for square pairs with no ray or knight relationship.
const INVALID: u8 = u8::MAX;

/// Offset added to a 0x88 difference to index the tables below.
const CENTER: i32 = 119;

/// `(ray code, distance)` for every possible 0x88 square difference.
const DIR_DIST: [(u8, u8); 240] = {
    let mut table = [(INVALID, 0); 240];

    // 0x88 steps per compass ray, in `Ray` declaration order
    let steps: [i32; 8] = [16, 17, 1, -15, -16, -17, -1, 15];
    let mut ray = 0;
    while ray < 8 {
        let mut dist: i32 = 1;
        while dist <= 7 {
            table[(steps[ray] * dist + CENTER) as usize] = (ray as u8, dist as u8);
            dist += 1;
        }
        ray += 1;
    }

    // Knight offsets all count as distance 1
    let knight: [i32; 8] = [33, 31, 18, 14, -33, -31, -18, -14];
    let mut k = 0;
    while k < 8 {
        table[(knight[k] + CENTER) as usize] = (8, 1);
        k += 1;
    }

    table
};

/// Builds the middle-bit masks for one board-index step, indexed by distance.
///
/// The mask for distance `d` holds the `d - 1` squares strictly between a
/// square and the square `d` steps along the ray, anchored at index 0.
const fn build_middle_masks(step: u32) -> [u64; 8] {
    let mut masks = [0; 8];
    let mut dist = 2;
    while dist <= 7 {
        let mut mask = 0u64;
        let mut i = 1;
        while i < dist {
            mask |= 1 << (step * i);
            i += 1;
        }
        masks[dist as usize] = mask;
        dist += 1;
    }
    masks
}

/// Middle-bit masks for the four ascending board steps: N (+8), NE (+9), E (+1), NW (+7).
///
/// A descending ray between two squares is the ascending ray from the lower
/// square, so these four cover all eight compass directions once the
/// endpoints are ordered.
const MIDDLE_MASKS: [[u64; 8]; 4] = [
    build_middle_masks(8),
    build_middle_masks(9),
    build_middle_masks(1),
    build_middle_masks(7),
];

const fn to_0x88(index: usize) -> i32 {
    ((index / 8) * 16 + index % 8) as i32
}

/// The ray leading from `from` to `to` and the distance along it, if any.
///
/// Knight relationships report a distance of 1.
#[inline(always)]
pub fn direction_between(from: Square, to: Square) -> Option<(Ray, u8)> {
    let diff = to_0x88(to.index()) - to_0x88(from.index());
    let (code, dist) = DIR_DIST[(diff + CENTER) as usize];

    (code != INVALID).then(|| (Ray::from_code(code), dist))
}

/// Bitboard of the squares strictly between `from` and `to` along a common
/// ray, or empty if the squares do not share one.
///
/// Answered in O(1) by shifting a distance-anchored mask up to the lower of
/// the two endpoints.
#[inline(always)]
pub fn squares_between(from: Square, to: Square) -> u64 {
    let Some((ray, dist)) = direction_between(from, to) else {
        return 0;
    };

    if matches!(ray, Ray::Knight) || dist < 2 {
        return 0;
    }

    let (lo, hi) = if from.index() < to.index() {
        (from.index(), to.index())
    } else {
        (to.index(), from.index())
    };

    // The board-index step from `lo` toward `hi` is one of +8, +9, +1, +7
    let step = (hi - lo) / dist as usize;
    let masks = match step {
        8 => MIDDLE_MASKS[0],
        9 => MIDDLE_MASKS[1],
        1 => MIDDLE_MASKS[2],
        7 => MIDDLE_MASKS[3],
        _ => return 0,
    };

    masks[dist as usize] << lo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compass_directions() {
        assert_eq!(
            direction_between(Square::E4, Square::E8),
            Some((Ray::North, 4))
        );
        assert_eq!(
            direction_between(Square::E8, Square::E4),
            Some((Ray::South, 4))
        );
        assert_eq!(
            direction_between(Square::A1, Square::H8),
            Some((Ray::NorthEast, 7))
        );
        assert_eq!(
            direction_between(Square::H1, Square::A8),
            Some((Ray::NorthWest, 7))
        );
        assert_eq!(
            direction_between(Square::C3, Square::A3),
            Some((Ray::West, 2))
        );
    }

    #[test]
    fn test_knight_relationships() {
        assert_eq!(
            direction_between(Square::G1, Square::F3),
            Some((Ray::Knight, 1))
        );
        assert_eq!(
            direction_between(Square::F3, Square::G1),
            Some((Ray::Knight, 1))
        );
    }

    #[test]
    fn test_non_ray_pairs() {
        assert_eq!(direction_between(Square::A1, Square::C2), None);
        assert_eq!(direction_between(Square::B2, Square::G5), None);
        // Same square has no direction either
        assert_eq!(direction_between(Square::D4, Square::D4), None);
    }

    #[test]
    fn test_squares_between() {
        let long_diagonal = squares_between(Square::A1, Square::H8);
        assert_eq!(long_diagonal.count_ones(), 6); // b2..g7
        assert_ne!(long_diagonal & Square::D4.bitboard().inner(), 0);
        assert_eq!(long_diagonal & Square::A1.bitboard().inner(), 0);
        assert_eq!(long_diagonal & Square::H8.bitboard().inner(), 0);

        // Symmetric in its arguments
        assert_eq!(
            squares_between(Square::H8, Square::A1),
            squares_between(Square::A1, Square::H8)
        );

        // Adjacent squares have nothing in between
        assert_eq!(squares_between(Square::E4, Square::E5), 0);

        // Neither do knight hops or unrelated pairs
        assert_eq!(squares_between(Square::G1, Square::F3), 0);
        assert_eq!(squares_between(Square::A1, Square::C2), 0);

        let file = squares_between(Square::D1, Square::D8);
        assert_eq!(file.count_ones(), 6);
        assert_ne!(file & Square::D5.bitboard().inner(), 0);
    }
}
