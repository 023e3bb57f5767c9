/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use uci_parser::UciScore;

use crate::MAX_PLY;

/// A numerical representation of the evaluation of a position / move, in units of ["centipawns"](https://www.chessprogramming.org/Score).
///
/// Values are kept within `i16` range; the extremes are reserved for mate scores.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(pub i32);

impl Score {
    /// Score of mate in the current position.
    ///
    /// A mate found `d` plies from the root is encoded as `MATE - d`,
    /// so that shorter mates always dominate longer ones.
    pub const MATE: Self = Self(i16::MAX as i32);

    /// Initial lower bound of a search window.
    ///
    /// `-MATE` also doubles as the sentinel returned from a branch that was
    /// cancelled by a timeout: a strictly-greater comparison never adopts it.
    pub const ALPHA: Self = Self(-Self::MATE.0);

    /// Initial upper bound of a search window.
    pub const BETA: Self = Self::MATE;

    /// Score of a draw.
    pub const DRAW: Self = Self(0);

    /// Lowest possible magnitude of a mate score.
    ///
    /// This is only obtainable if mate is found [`MAX_PLY`] plies away.
    pub const LOWEST_MATE: Self = Self(Self::MATE.0 - MAX_PLY as i32);

    /// Construct a new [`Score`] instance.
    #[inline(always)]
    pub const fn new(score: i32) -> Self {
        Self(score)
    }

    /// Returns `true` if the score is a mate score (for either side).
    #[inline(always)]
    pub fn is_mate(&self) -> bool {
        self.abs() >= Self::LOWEST_MATE
    }

    /// Returns the number of plies (half moves) this score is from mate.
    #[inline(always)]
    pub const fn mate_distance(&self) -> i32 {
        Self::MATE.0 - self.0.abs()
    }

    /// Returns the number of full moves this score is from mate, signed for
    /// whichever side is delivering it.
    ///
    /// Used when sending the `info score mate` message.
    #[inline(always)]
    pub const fn moves_to_mate(&self) -> i32 {
        let plies = self.mate_distance();

        // A mate in our favor needs our move played first; one against us does not.
        let relative_to_side = if self.0 > 0 { plies + 1 } else { -plies };

        relative_to_side / 2
    }

    /// Converts this [`Score`] into a [`UciScore`],
    /// determining whether it is a centipawns score or a mate score.
    #[inline(always)]
    pub fn into_uci(self) -> UciScore {
        if self.is_mate() {
            UciScore::mate(self.moves_to_mate())
        } else {
            UciScore::cp(self.0)
        }
    }

    /// Adjust a mate score pulled out of a hash table at `ply`.
    ///
    /// Stored mate scores measure the distance from the node that wrote the
    /// entry; this converts them back to a distance from the root, as the
    /// search expects.
    #[inline(always)]
    pub fn relative(self, ply: i32) -> Self {
        if self.is_mate() {
            if self > Self::DRAW {
                self - ply
            } else {
                self + ply
            }
        } else {
            self
        }
    }

    /// Adjust a mate score for storage in a hash table at `ply`.
    ///
    /// Converts a root-relative mate distance into one measured from the
    /// storing node, so the entry stays correct no matter which path later
    /// reaches this position.
    #[inline(always)]
    pub fn absolute(self, ply: i32) -> Self {
        if self.is_mate() {
            if self > Self::DRAW {
                self + ply
            } else {
                self - ply
            }
        } else {
            self
        }
    }

    /// Returns the absolute value of this [`Score`].
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl From<Score> for UciScore {
    #[inline(always)]
    fn from(value: Score) -> Self {
        value.into_uci()
    }
}

macro_rules! impl_binary_op {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$fn(rhs.0))
            }
        }

        impl std::ops::$trait<i32> for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: i32) -> Self::Output {
                Self(self.0.$fn(rhs))
            }
        }
    };
}

macro_rules! impl_binary_op_assign {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: Self) {
                self.0.$fn(rhs.0);
            }
        }

        impl std::ops::$trait<i32> for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: i32) {
                self.0.$fn(rhs);
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);

impl_binary_op_assign!(AddAssign, add_assign);
impl_binary_op_assign!(SubAssign, sub_assign);

impl std::ops::Neg for Score {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self(self.0.neg())
    }
}

impl PartialEq<i32> for Score {
    #[inline(always)]
    fn eq(&self, other: &i32) -> bool {
        self.0.eq(other)
    }
}

impl PartialOrd<i32> for Score {
    #[inline(always)]
    fn partial_cmp(&self, other: &i32) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

impl fmt::Display for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(f, "{} (mate in {} plies)", self.0, self.mate_distance())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_encoding() {
        let plies = 3;

        let our_mate = Score::MATE - plies;
        assert!(our_mate.is_mate());
        assert_eq!(our_mate.mate_distance(), plies);

        let their_mate = -(Score::MATE - plies);
        assert!(their_mate.is_mate());
        assert_eq!(their_mate.mate_distance(), plies);

        // Shorter mates dominate longer ones
        assert!(Score::MATE - 2 > Score::MATE - 4);
        assert!(-(Score::MATE - 2) < -(Score::MATE - 4));
    }

    #[test]
    fn test_relative_absolute_roundtrip() {
        let plies = 5;
        let found = Score::MATE - plies;

        let stored = found.absolute(plies);
        assert_eq!(stored, Score::MATE);
        assert_eq!(stored.relative(plies), found);

        let cp = Score::new(42);
        assert_eq!(cp.absolute(plies), cp);
        assert_eq!(cp.relative(plies), cp);
    }

    #[test]
    fn test_sentinel_never_adopted() {
        // A cancelled branch returns ALPHA; a strictly-greater comparison
        // must prefer even the worst legitimate line over it.
        let worst_real = -(Score::MATE - 0);
        assert!(!(Score::ALPHA > worst_real));
    }
}
