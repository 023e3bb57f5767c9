/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use chessie::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks, Bitboard, Color,
    Game, PieceKind, Square,
};

use crate::{bits, direction_between, squares_between, tune, Score};

/// All piece kinds, cheapest first.
const KINDS: [PieceKind; 6] = [
    PieceKind::Pawn,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
    PieceKind::King,
];

/// Returns a value of the provided `PieceKind`.
///
/// Values are obtained from here: <https://www.chessprogramming.org/Simplified_Evaluation_Function>
#[inline(always)]
pub const fn value_of(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 100,
        PieceKind::Knight => 320,
        PieceKind::Bishop => 330,
        PieceKind::Rook => 500,
        PieceKind::Queen => 900,
        PieceKind::King => 0, // King is invaluable, but 0 is easier to work with in computations
    }
}

/// Index into the concentric board regions, 0 at the four center squares and
/// 3 on the rim.
#[inline(always)]
fn zone(square: Square) -> usize {
    let df = (2 * square.file().index() as i32 - 7).unsigned_abs() as usize;
    let dr = (2 * square.rank().index() as i32 - 7).unsigned_abs() as usize;
    (df.max(dr) - 1) / 2
}

/// Squares attacked by a piece of `kind` and `color` on `square`, given the
/// board occupancy `blockers`.
#[inline(always)]
fn attacks_for(kind: PieceKind, square: Square, color: Color, blockers: Bitboard) -> Bitboard {
    match kind {
        PieceKind::Pawn => pawn_attacks(square, color),
        PieceKind::Knight => knight_attacks(square),
        PieceKind::Bishop => bishop_attacks(square, blockers),
        PieceKind::Rook => rook_attacks(square, blockers),
        PieceKind::Queen => bishop_attacks(square, blockers) | rook_attacks(square, blockers),
        PieceKind::King => king_attacks(square),
    }
}

/// Encapsulates the logic of scoring a chess position.
///
/// All terms are computed from White's perspective and summed; the public
/// entrypoint then negates the total if Black is the side to move, as the
/// negamax search expects.
pub struct Evaluator<'a> {
    /// The game whose position to evaluate.
    game: &'a Game,

    /// `control[color][square][kind]`: how many pieces of `kind` and `color`
    /// attack `square`.
    control: [[[u8; 6]; Square::COUNT]; Color::COUNT],
}

impl<'a> Evaluator<'a> {
    /// Construct a new [`Evaluator`], tallying the attackers of every square.
    pub fn new(game: &'a Game) -> Self {
        let board = game.board();
        let blockers = board.occupied();
        let mut control = [[[0; 6]; Square::COUNT]; Color::COUNT];

        for square in Square::iter() {
            // The slider and leaper reach of a square is color-independent,
            // so compute it once and intersect with each side's pieces.
            let knight = knight_attacks(square);
            let king = king_attacks(square);
            let diag = bishop_attacks(square, blockers);
            let orth = rook_attacks(square, blockers);

            for color in [Color::White, Color::Black] {
                // A pawn of `color` attacks this square iff it sits on a
                // square this square would attack as a pawn of the opponent.
                let pawn = pawn_attacks(square, color.opponent());

                let counts = &mut control[color.index()][square.index()];
                counts[PieceKind::Pawn.index()] = (pawn & board.pawns(color)).population();
                counts[PieceKind::Knight.index()] = (knight & board.knights(color)).population();
                counts[PieceKind::Bishop.index()] = (diag & board.bishops(color)).population();
                counts[PieceKind::Rook.index()] = (orth & board.rooks(color)).population();
                counts[PieceKind::Queen.index()] = ((diag | orth) & board.queens(color)).population();
                counts[PieceKind::King.index()] = (king & board.king(color)).population();
            }
        }

        Self { game, control }
    }

    /// Evaluate this position from the side-to-move's perspective.
    ///
    /// A positive/high number is good for the side-to-move, while a negative number is better for the opponent.
    /// A score of 0 is considered equal.
    #[inline(always)]
    pub fn eval(&self) -> Score {
        let white = self.eval_for_white();
        let score = if self.game.side_to_move().is_white() {
            white
        } else {
            -white
        };

        // Static evaluations must stay clear of the reserved mate range.
        Score::new(score.clamp(-(Score::LOWEST_MATE.0 - 1), Score::LOWEST_MATE.0 - 1))
    }

    /// The sum of all terms, positive when White is better.
    fn eval_for_white(&self) -> i32 {
        self.material()
            + self.pawn_structure()
            + self.influence()
            + self.square_control()
            + self.piece_safety()
            + self.king_safety()
    }

    /// Standard material count, king excluded.
    fn material(&self) -> i32 {
        let board = self.game.board();

        KINDS[..5].iter().fold(0, |term, &kind| {
            let diff = board.piece_parts(Color::White, kind).population() as i32
                - board.piece_parts(Color::Black, kind).population() as i32;
            term + diff * value_of(kind)
        })
    }

    /// Pawn rank bonuses, passed and connected passers, doubled pawns,
    /// islands, isolation, and connectedness.
    fn pawn_structure(&self) -> i32 {
        let board = self.game.board();
        let mut term = 0;

        for color in [Color::White, Color::Black] {
            let sign = if color.is_white() { 1 } else { -1 };
            let own = board.pawns(color).inner();
            let enemy = board.pawns(color.opponent()).inner();
            let mut side = 0;

            let rank_bonus: [i32; 8] = tune::pawn_rank_bonus!();
            for square in Bitboard::new(own) {
                side += rank_bonus[square.rank_relative_to(color).index()];
            }

            let passed = bits::passed_pawns(own, enemy, color);
            let connected = bits::connected_pawns(own);
            let passed_bonus: [i32; 8] = tune::passed_pawn_bonus!();
            for square in Bitboard::new(passed) {
                let rank = square.rank_relative_to(color).index();
                side += passed_bonus[rank];

                // A supported passer is far harder to blockade.
                if connected & square.bitboard().inner() != 0 {
                    side += rank as i32 * tune::connected_passer_factor!();
                }
            }

            let doubled = bits::doubled_pawns(own, color).count_ones() as i32;
            side -= doubled * tune::doubled_pawn_penalty!();

            let files = bits::file_occupancy(own);
            let islands = bits::island_count(files) as i32;
            side -= (islands - 1).max(0) * tune::pawn_island_penalty!();

            let mut isolated_mask = 0u64;
            let isolated = bits::isolated_files(files);
            for file in 0..8 {
                if isolated & (1 << file) != 0 {
                    isolated_mask |= bits::FILE_A << file;
                }
            }
            side -= (own & isolated_mask).count_ones() as i32 * tune::isolated_pawn_penalty!();

            side += connected.count_ones() as i32 * tune::connected_pawn_bonus!();
            side += bits::phalanx_pawns(own).count_ones() as i32 * tune::phalanx_pawn_bonus!();

            term += sign * side;
        }

        term
    }

    /// Space/mobility: attacked squares weighted by how central they are,
    /// with x-ray credit for rooks and bishops aiming through their own queen.
    ///
    /// Accumulated in tenths of a centipawn so the region weights can stay small.
    fn influence(&self) -> i32 {
        let board = self.game.board();
        let blockers = board.occupied();
        let weights: [i32; 4] = tune::influence_weights!();
        let mut tenths = 0;

        for color in [Color::White, Color::Black] {
            let sign = if color.is_white() { 1 } else { -1 };
            let pieces = board.color(color) ^ board.pawns(color);

            for square in pieces {
                let Some(kind) = board.kind_at(square) else {
                    continue;
                };

                let attacks = attacks_for(kind, square, color, blockers);
                for attacked in attacks {
                    tenths += sign * weights[zone(attacked)];
                }

                if matches!(kind, PieceKind::Rook | PieceKind::Bishop) {
                    tenths += sign * self.behind_queen_influence(kind, square, color, attacks);
                }
            }
        }

        tenths / 10
    }

    /// Squares a rook or bishop would attack if its own queen stepped aside,
    /// credited at reduced weight.
    fn behind_queen_influence(
        &self,
        kind: PieceKind,
        square: Square,
        color: Color,
        attacks: Bitboard,
    ) -> i32 {
        let board = self.game.board();
        let blockers = board.occupied();
        let weights: [i32; 4] = tune::influence_weights!();
        let mut tenths = 0;

        for queen in board.queens(color) {
            let Some((ray, _)) = direction_between(square, queen) else {
                continue;
            };

            let aligned = (kind == PieceKind::Rook && ray.is_orthogonal())
                || (kind == PieceKind::Bishop && ray.is_diagonal());
            if !aligned || squares_between(square, queen) & blockers.inner() != 0 {
                continue;
            }

            // Recompute reach with the queen lifted off the board; anything
            // new is influence projected through her.
            let without_queen = blockers ^ queen.bitboard();
            let xray = attacks_for(kind, square, color, without_queen) & !attacks;
            for attacked in xray {
                tenths += weights[zone(attacked)] / tune::behind_queen_divisor!();
            }
        }

        tenths
    }

    /// Square-ownership term: for every square, the side with the stronger
    /// claim on it wins a bonus scaled by the bulls-eye zone factor.
    ///
    /// Ownership is decided by comparing attacker counts kind by kind from
    /// the cheapest up; controlling a square with pawns beats controlling it
    /// with any number of heavier pieces.
    fn square_control(&self) -> i32 {
        let factors: [i32; 4] = tune::zone_factors!();
        let mut term = 0;

        for square in Square::iter() {
            let white = &self.control[Color::White.index()][square.index()];
            let black = &self.control[Color::Black.index()][square.index()];

            for kind in KINDS {
                let (w, b) = (white[kind.index()], black[kind.index()]);
                if w != b {
                    let sign = if w > b { 1 } else { -1 };
                    term += sign * tune::square_control_bonus!() * factors[zone(square)];
                    break;
                }
            }
        }

        term
    }

    /// Value of the cheapest piece of `color` attacking `square`, if any.
    #[inline(always)]
    fn cheapest_attacker(&self, color: Color, square: Square) -> Option<i32> {
        let counts = &self.control[color.index()][square.index()];
        KINDS[..5]
            .iter()
            .find(|kind| counts[kind.index()] > 0)
            .map(|&kind| value_of(kind))
    }

    /// Penalties for pieces that are lost (attacked by something cheaper) or
    /// stuck (every square they could move to is covered by something cheaper).
    fn piece_safety(&self) -> i32 {
        let board = self.game.board();
        let blockers = board.occupied();
        let mut term = 0;

        for color in [Color::White, Color::Black] {
            let sign = if color.is_white() { 1 } else { -1 };
            let enemy = color.opponent();
            let own_pieces = board.color(color);
            let movers = own_pieces ^ board.pawns(color) ^ board.king(color);

            for square in movers {
                let Some(kind) = board.kind_at(square) else {
                    continue;
                };
                let value = value_of(kind);

                if self.cheapest_attacker(enemy, square).is_some_and(|v| v < value) {
                    term -= sign * tune::lost_piece_penalty!();
                }

                let destinations = attacks_for(kind, square, color, blockers) & !own_pieces;
                let stuck = destinations.into_iter().all(|dest| {
                    self.cheapest_attacker(enemy, dest).is_some_and(|v| v < value)
                });
                if stuck {
                    term -= sign * tune::stuck_piece_penalty!();
                }
            }
        }

        term
    }

    /// Attacks into the one- and two-square rings around the enemy king.
    fn king_safety(&self) -> i32 {
        let board = self.game.board();
        let blockers = board.occupied();
        let ring1_weights: [i32; 6] = tune::king_ring1_weights!();
        let ring2_weights: [i32; 6] = tune::king_ring2_weights!();
        let mut term = 0;

        for color in [Color::White, Color::Black] {
            let sign = if color.is_white() { 1 } else { -1 };
            let Some(enemy_king) = board.king(color.opponent()).to_square() else {
                continue;
            };

            let ring1 = king_attacks(enemy_king).inner();
            let ring2 = bits::adjacent(ring1 | enemy_king.bitboard().inner())
                & !enemy_king.bitboard().inner();

            for square in board.color(color) {
                let Some(kind) = board.kind_at(square) else {
                    continue;
                };
                let attacks = attacks_for(kind, square, color, blockers).inner();

                term += sign
                    * ((attacks & ring1).count_ones() as i32 * ring1_weights[kind.index()]
                        + (attacks & ring2).count_ones() as i32 * ring2_weights[kind.index()]);
            }
        }

        term
    }
}

impl fmt::Display for Evaluator<'_> {
    /// Prints a breakdown of each term, from White's perspective.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "material:       {:>6}", self.material())?;
        writeln!(f, "pawn structure: {:>6}", self.pawn_structure())?;
        writeln!(f, "influence:      {:>6}", self.influence())?;
        writeln!(f, "square control: {:>6}", self.square_control())?;
        writeln!(f, "piece safety:   {:>6}", self.piece_safety())?;
        writeln!(f, "king safety:    {:>6}", self.king_safety())?;
        write!(f, "total (White):  {:>6}", self.eval_for_white())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_fen(fen: &str) -> Score {
        let game: Game = fen.parse().unwrap();
        Evaluator::new(&game).eval()
    }

    #[test]
    fn test_startpos_is_balanced() {
        assert_eq!(eval_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").0, 0);
    }

    #[test]
    fn test_mirror_symmetry() {
        // Each pair is a position and its color-mirrored counterpart; the
        // side-to-move-relative evaluations must agree exactly.
        let pairs = [
            (
                "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 0 1",
                "rnb1k1nr/pppp1ppp/5q2/2b1p3/4P3/2N5/PPPP1PPP/R1BQKBNR b KQkq - 0 1",
            ),
            (
                "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
                "4k3/4p3/8/8/8/8/8/4K3 b - - 0 1",
            ),
            (
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQ - 0 1",
                "r3k2r/pppbbppp/2n2q1P/1P2p3/3pn3/BN2PNP1/P1PPQPB1/R3K2R b kq - 0 1",
            ),
        ];

        for (fen, mirrored) in pairs {
            assert_eq!(
                eval_fen(fen),
                eval_fen(mirrored),
                "eval not symmetric for {fen:?}"
            );
        }
    }

    #[test]
    fn test_material_dominates() {
        // White is down a full queen for nothing.
        let score = eval_fen("rn1qkbnr/ppp2ppp/3p4/4p3/3PP1b1/8/PPP2PPP/RNB1KBNR w KQkq - 0 4");
        assert!(score < -600, "expected a large deficit, got {score}");

        // And from Black's perspective the same position is winning.
        let score = eval_fen("rn1qkbnr/ppp2ppp/3p4/4p3/3PP1b1/8/PPP2PPP/RNB1KBNR b KQkq - 0 4");
        assert!(score > 600, "expected a large advantage, got {score}");
    }

    #[test]
    fn test_passed_pawn_is_rewarded() {
        // Identical kings; White's e-pawn is passed in one position and
        // opposed by a black e-pawn in the other.
        let passed = eval_fen("4k3/8/8/8/4P3/8/8/4K3 w - - 0 1");
        let opposed = eval_fen("4k3/4p3/8/8/4P3/8/8/4K3 w - - 0 1");
        assert!(
            passed > opposed,
            "passed pawn ({passed}) should outscore opposed pawn ({opposed})"
        );
    }
}
