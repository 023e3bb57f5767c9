/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! End-to-end searches on known positions.

use std::sync::{atomic::AtomicBool, Arc};

use chessie::{Game, Move};
use stoat::{
    search_key, PositionHistory, QuiescenceTable, Score, Search, SearchConfig, SearchResult,
    TranspositionTable,
};

/// Run a fixed-depth search on `fen` with fresh tables.
fn search_to_depth(fen: &str, depth: u8) -> SearchResult {
    let game: Game = fen.parse().unwrap();
    search_with_history(&game, depth, PositionHistory::default())
}

fn search_with_history(game: &Game, depth: u8, history: PositionHistory) -> SearchResult {
    let config = SearchConfig {
        max_depth: depth,
        ..Default::default()
    };
    search_with_config(game, config, history)
}

fn search_with_config(
    game: &Game,
    config: SearchConfig,
    mut history: PositionHistory,
) -> SearchResult {
    let mut ttable = TranspositionTable::new(1 << 16);
    let mut qtable = QuiescenceTable::new(1 << 15);

    Search::new(
        game,
        Arc::new(AtomicBool::new(true)),
        config,
        &mut history,
        &mut ttable,
        &mut qtable,
    )
    .start()
    .unwrap()
}

#[test]
fn checkmated_position_reports_no_move() {
    // Fool's mate has already been delivered; White is mated where they stand.
    let res = search_to_depth(
        "rnb1kbnr/pppp1ppp/8/4p3/5PPq/8/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        3,
    );

    assert!(res.bestmove.is_none());
    assert_eq!(res.score, -Score::MATE);
}

#[test]
fn stalemated_position_is_a_draw() {
    let res = search_to_depth("2k5/8/8/8/8/1q6/r7/2K5 w - - 0 1", 3);

    assert!(res.bestmove.is_none());
    assert_eq!(res.score, Score::DRAW);
}

#[test]
fn finds_scholars_mate() {
    let res = search_to_depth(
        "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 0 1",
        5,
    );

    assert!(
        res.score >= Score::MATE - 6,
        "expected a forced mate, got {:?}",
        res.score
    );
    assert_eq!(res.bestmove.unwrap().to_string(), "f3f7");
}

#[test]
fn startpos_prefers_a_mainline_opening() {
    let res = search_to_depth(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        4,
    );

    let mv = res.bestmove.unwrap().to_string();
    assert!(
        ["e2e4", "d2d4", "g1f3", "c2c4"].contains(&mv.as_str()),
        "unexpected opening move {mv}"
    );

    // The starting position is roughly balanced.
    assert!(res.score.abs() <= 50, "unbalanced score {:?}", res.score);
}

#[test]
fn recognizes_a_lost_queen() {
    // White has given up the queen for a bishop's pin and gotten nothing back.
    let res = search_to_depth(
        "rn1qkbnr/ppp2ppp/3p4/4p3/3PP1b1/8/PPP2PPP/RNB1KBNR w KQkq - 0 4",
        4,
    );

    assert!(res.score < -700, "expected a lost position, got {:?}", res.score);
}

#[test]
fn hash_tables_do_not_change_the_score() {
    // The hash tables only save work; a fixed-depth search must land on
    // the same evaluation whether or not they are consulted.
    for fen in [
        "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
        "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 0 1",
    ] {
        let game: Game = fen.parse().unwrap();

        let cached = search_with_config(
            &game,
            SearchConfig {
                max_depth: 3,
                ..Default::default()
            },
            PositionHistory::default(),
        );
        let uncached = search_with_config(
            &game,
            SearchConfig {
                max_depth: 3,
                use_hash_tables: false,
                ..Default::default()
            },
            PositionHistory::default(),
        );

        assert_eq!(
            cached.score, uncached.score,
            "hash tables changed the score of {fen}"
        );
    }
}

#[test]
fn null_move_pruning_preserves_mate() {
    let game: Game = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 0 1"
        .parse()
        .unwrap();

    let pruned = search_with_config(
        &game,
        SearchConfig {
            max_depth: 5,
            ..Default::default()
        },
        PositionHistory::default(),
    );
    let unpruned = search_with_config(
        &game,
        SearchConfig {
            max_depth: 5,
            use_null_move: false,
            ..Default::default()
        },
        PositionHistory::default(),
    );

    // Null-move pruning is a shortcut, not a different search: the same
    // forced mate must come out either way.
    for res in [&pruned, &unpruned] {
        assert!(res.score >= Score::MATE - 6, "lost the mate: {:?}", res.score);
        assert_eq!(res.bestmove.unwrap().to_string(), "f3f7");
    }
    assert_eq!(pruned.score, unpruned.score);
}

#[test]
fn repeating_the_position_scores_zero() {
    // Black's king has exactly one square; if the resulting position has
    // already occurred twice in the game, moving there is a draw by
    // threefold repetition, whatever the material says.
    let game: Game = "7k/5K2/8/8/8/8/8/6R1 b - - 0 1".parse().unwrap();
    let only_move = Move::from_uci(&game, "h8h7").unwrap();

    let mut history = PositionHistory::default();
    let child_key = search_key(&game.with_move_made(only_move));
    history.enter(child_key);
    history.enter(child_key);

    let res = search_with_history(&game, 3, history);

    assert_eq!(res.bestmove, Some(only_move));
    assert_eq!(res.score, Score::DRAW);
}
