/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use chessie::Game;

/// FEN string for the starting position of chess.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN string for the "kiwipete" position, a dense middlegame often used for testing.
pub const FEN_KIWIPETE: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQ - 0 1";

/// Positions used by the `bench` command.
pub const BENCHMARK_FENS: [&str; 10] = [
    FEN_STARTPOS,
    FEN_KIWIPETE,
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "r2q1rk1/ppp2ppp/2n1bn2/2b1p3/3pP3/3P1NPP/PPP1NPB1/R1BQ1RK1 b - - 2 10",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    "8/8/1k6/8/8/8/6K1/4R3 w - - 0 1",
    "rn1qkbnr/ppp2ppp/3p4/4p3/3PP1b1/8/PPP2PPP/RNB1KBNR w KQkq - 0 4",
];

/// Zobrist mix for the side-to-move bit.
///
/// The underlying position key is not refreshed when the side to move is
/// toggled without a move being made, so the search folds the side to move
/// into every key it hands to the history and hash tables itself.
const BLACK_TO_MOVE_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Hash key for `game` as seen by the search's history and hash tables.
#[inline(always)]
pub fn search_key(game: &Game) -> u64 {
    let key = game.key().inner();
    if game.side_to_move().is_black() {
        key ^ BLACK_TO_MOVE_MIX
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_key_distinguishes_null_moves() {
        let mut game = Game::default();
        let original = search_key(&game);

        game.toggle_side_to_move();
        assert_ne!(search_key(&game), original);

        game.toggle_side_to_move();
        assert_eq!(search_key(&game), original);
    }
}
