/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{bail, Result};
use arrayvec::ArrayVec;
use chessie::{Game, Move, PieceKind};
use uci_parser::{UciInfo, UciResponse, UciSearchOptions};

use crate::{
    search_key, tune, value_of, Bound, DeepKillers, Evaluator, Killers, PositionHistory, QttSlot,
    QuiescenceTable, Score, TranspositionTable, TtSlot,
};

/// Maximum depth that can be searched.
pub const MAX_DEPTH: u8 = 128;

/// How often the timer thread re-checks the clock.
const TIMER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on the number of legal moves in any position.
const MAX_MOVES: usize = 256;

/// The result of a search: the best move found, its score, the deepest fully
/// completed iteration, and the accumulated statistics.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    /// Best move found during the search.
    pub bestmove: Option<Move>,

    /// Evaluation of the position after `bestmove` is made.
    pub score: Score,

    /// Deepest iteration that ran to completion.
    pub depth: u8,

    /// Counters accumulated across all iterations.
    pub stats: SearchStats,
}

impl SearchResult {
    /// Take over the move and score of a deeper iteration that was cut short
    /// by the timer, provided it got far enough to be trustworthy: it must
    /// have settled on an actual move with a non-sentinel score.
    ///
    /// `depth` is left untouched either way; the iteration did not complete.
    fn adopt_partial(&mut self, bestmove: Option<Move>, score: Score) {
        if bestmove.is_some() && score > Score::ALPHA {
            self.bestmove = bestmove;
            self.score = score;
        }
    }
}

impl Default for SearchResult {
    /// A default search result should initialize to a *very bad* value,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            bestmove: None,
            score: Score::ALPHA,
            depth: 0,
            stats: SearchStats::default(),
        }
    }
}

/// Counters describing where the search spent its effort and what cut it short.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    /// Interior nodes visited by the main search.
    pub nodes: u64,

    /// Nodes visited by the quiescence search.
    pub qnodes: u64,

    /// Nodes answered directly from the transposition table.
    pub tt_cuts: u64,

    /// Beta cutoffs produced by a null-move search.
    pub nullmove_cuts: u64,

    /// Beta cutoffs produced by the hash/hint move.
    pub cuts_on_hint: u64,

    /// Beta cutoffs produced by a killer move.
    pub cuts_on_killer: u64,

    /// Beta cutoffs produced by the deep killer.
    pub cuts_on_deep_killer: u64,

    /// Beta cutoffs produced by the first move tried, from ordering alone.
    pub cuts_on_first_child: u64,

    /// Times the quiescence search dropped the tail of a capture list.
    pub rampage_prunes: u64,
}

impl SearchStats {
    /// Total node count across both searches.
    #[inline(always)]
    pub fn total_nodes(&self) -> u64 {
        self.nodes + self.qnodes
    }
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes ({} quiescence), {} tt cuts, {} nullmove cuts, cut sources: {} hint / {} killer / {} deep killer / {} first child",
            self.nodes,
            self.qnodes,
            self.tt_cuts,
            self.nullmove_cuts,
            self.cuts_on_hint,
            self.cuts_on_killer,
            self.cuts_on_deep_killer,
            self.cuts_on_first_child,
        )
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Maximum depth to execute the search.
    pub max_depth: u8,

    /// Total time allotted to this search.
    pub budget: Duration,

    /// Start time of the search.
    pub starttime: Instant,

    /// Whether the hash tables are probed and written.
    ///
    /// Disabling them must not change the score a fixed-depth search
    /// produces, only how fast it is found.
    pub use_hash_tables: bool,

    /// Whether null-move pruning is applied.
    ///
    /// Disabling it must never lose a mate a pruned search would find.
    pub use_null_move: bool,
}

impl SearchConfig {
    /// Constructs a new [`SearchConfig`] from the provided UCI options and game.
    ///
    /// The [`Game`] determines whose clock the budget is computed from.
    pub fn new(options: UciSearchOptions, game: &Game) -> Self {
        let mut config = Self::default();

        if let Some(depth) = options.depth {
            config.max_depth = (depth as u8).min(MAX_DEPTH);
        }

        if let Some(movetime) = options.movetime {
            config.budget = movetime;
        } else {
            let (time, inc) = if game.side_to_move().is_white() {
                (options.wtime, options.winc)
            } else {
                (options.btime, options.binc)
            };

            if let Some(time) = time {
                let budget = time / tune::time_divisor!();
                // With no clock left to divide, fall back to the increment.
                config.budget = if budget.is_zero() {
                    inc.unwrap_or(TIMER_POLL_INTERVAL)
                } else {
                    budget
                };
            }
        }

        config
    }
}

impl Default for SearchConfig {
    /// A default [`SearchConfig`] will permit an "infinite" search.
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            budget: Duration::MAX,
            starttime: Instant::now(),
            use_hash_tables: true,
            use_null_move: true,
        }
    }
}

/// Clears a shared "searching" flag once a time budget expires.
///
/// The search polls the flag cooperatively; this timer is the only other
/// writer. Dropping the timer via [`TimeoutTimer::stop`] cancels it.
struct TimeoutTimer {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutTimer {
    /// Spawn a timer that stores `false` into `is_searching` once `budget`
    /// has elapsed from `starttime`.
    fn start(is_searching: Arc<AtomicBool>, starttime: Instant, budget: Duration) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let watcher = Arc::clone(&cancelled);

        let handle = thread::spawn(move || {
            while !watcher.load(Ordering::Acquire) {
                if starttime.elapsed() >= budget {
                    is_searching.store(false, Ordering::Release);
                    break;
                }
                thread::sleep(TIMER_POLL_INTERVAL);
            }
        });

        Self {
            cancelled,
            handle: Some(handle),
        }
    }

    /// Cancel the timer and wait for its thread to exit.
    ///
    /// Stopping an already-fired timer is harmless.
    fn stop(mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Executes a search on the provided game.
pub struct Search<'a> {
    /// The game to search on.
    ///
    /// This game will be copied when moves are applied to it.
    game: &'a Game,

    /// An atomic flag to determine if the search should be cancelled at any time.
    ///
    /// If this is ever `false`, the search will exit as soon as possible.
    is_searching: Arc<AtomicBool>,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// Positions on the path from the start of the game through the current
    /// search stack, for repetition detection.
    history: &'a mut PositionHistory,

    /// Main transposition table, shared across searches within a game.
    ttable: &'a mut TranspositionTable,

    /// Quiescence transposition table.
    qtable: &'a mut QuiescenceTable,

    /// Per-ply killer moves for this search.
    killers: Killers,

    /// Per-ply best-move memory for this search.
    deep_killers: DeepKillers,

    /// Counters accumulated during this search.
    stats: SearchStats,
}

impl<'a> Search<'a> {
    /// Construct a new [`Search`] instance to execute on the provided [`Game`].
    pub fn new(
        game: &'a Game,
        is_searching: Arc<AtomicBool>,
        config: SearchConfig,
        history: &'a mut PositionHistory,
        ttable: &'a mut TranspositionTable,
        qtable: &'a mut QuiescenceTable,
    ) -> Self {
        Self {
            game,
            is_searching,
            config,
            history,
            ttable,
            qtable,
            killers: Killers::default(),
            deep_killers: DeepKillers::default(),
            stats: SearchStats::default(),
        }
    }

    /// Start the search, returning its results if the search was successful.
    ///
    /// This is the entrypoint of the search: it validates the limits, arms
    /// the timeout timer, runs [`Self::iterative_deepening`], and concludes
    /// by sending the `bestmove` message.
    pub fn start(mut self) -> Result<SearchResult> {
        if self.config.max_depth == 0 && self.config.budget.is_zero() {
            bail!("cannot search with both depth and time limits set to zero");
        }

        // A zero on one limit means "bounded by the other limit only".
        if self.config.max_depth == 0 {
            self.config.max_depth = MAX_DEPTH;
        }
        if self.config.budget.is_zero() {
            self.config.budget = Duration::MAX;
        }

        let timer = (self.config.budget < Duration::MAX).then(|| {
            TimeoutTimer::start(
                Arc::clone(&self.is_searching),
                self.config.starttime,
                self.config.budget,
            )
        });

        let result = self.iterative_deepening();

        if let Some(timer) = timer {
            timer.stop();
        }

        let response = UciResponse::BestMove {
            bestmove: result.bestmove,
            ponder: None,
        };
        println!("{response}");

        // Search has concluded, alert other threads that we are no longer searching
        self.is_searching.store(false, Ordering::Release);

        Ok(result)
    }

    /// Performs [iterative deepening](https://www.chessprogramming.org/Iterative_Deepening) on the search's position.
    ///
    /// Runs the search at depth 1, 2, 3, ... keeping the last *completed*
    /// iteration's answer. A new iteration is not started once more than
    /// a fixed share of the budget has been spent, since it would be
    /// unlikely to finish. A partial deeper result is adopted only if it is
    /// an actual move with a non-sentinel score.
    fn iterative_deepening(&mut self) -> SearchResult {
        let mut result = SearchResult {
            // Initialize `bestmove` to the first move available
            bestmove: self.game.get_legal_moves().first().copied(),
            ..Default::default()
        };

        let cutoff = self.config.budget / 100 * tune::search_cutoff_percent!();

        let mut depth = 1;
        while depth <= self.config.max_depth
            && self.is_searching()
            && self.config.starttime.elapsed() < cutoff
        {
            let (bestmove, score) =
                self.negamax(self.game, depth, 0, Score::ALPHA, Score::BETA, None, false);

            if self.is_searching() {
                result.bestmove = bestmove;
                result.score = score;
                result.depth = depth;
                self.send_iteration_info(depth, score);
            } else {
                result.adopt_partial(bestmove, score);
                break;
            }

            depth += 1;
        }

        result.stats = self.stats;
        result
    }

    #[inline(always)]
    fn is_searching(&self) -> bool {
        self.is_searching.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn send_info(&self, info: UciInfo) {
        let resp = UciResponse::<String>::Info(Box::new(info));
        println!("{resp}");
    }

    fn send_iteration_info(&self, depth: u8, score: Score) {
        let elapsed = self.config.starttime.elapsed();
        let nodes = self.stats.total_nodes();
        self.send_info(
            UciInfo::new()
                .depth(depth)
                .nodes(nodes)
                .score(score.into_uci())
                .nps((nodes as f32 / elapsed.as_secs_f32()).trunc())
                .time(elapsed.as_millis()),
        );
    }

    /// Number of non-pawn, non-king pieces the side to move still has.
    #[inline(always)]
    fn nonpawn_pieces(game: &Game) -> u8 {
        let us = game.side_to_move();
        let board = game.board();
        (board.color(us) ^ board.pawns(us) ^ board.king(us)).population()
    }

    /// Ordering weight for `mv`: the hash/hint move first, then killers
    /// (most recent first), then the deep killer, then captures by MVV-LVA,
    /// then everything else.
    fn order_score(&self, game: &Game, mv: Move, hint: Option<Move>, ply: i32) -> i32 {
        if hint == Some(mv) {
            return i32::MAX;
        }

        if let Some(slot) = self.killers.at(ply).position(|k| k == mv) {
            return 900_000 - slot as i32;
        }

        if self.deep_killers.at(ply) == Some(mv) {
            return 800_000;
        }

        if mv.is_capture() || mv.is_promotion() {
            return 100_000 + mvv_lva(game, mv);
        }

        0
    }

    /// Apply `mv` to `game` and search the resulting position, handling the
    /// repetition bookkeeping on both sides of the recursion.
    ///
    /// Returns the child's score from the parent's perspective. A position
    /// entered for the second time on the current path is a draw.
    fn search_child(
        &mut self,
        game: &Game,
        mv: Move,
        depth: u8,
        ply: i32,
        alpha: Score,
        beta: Score,
    ) -> Score {
        let child = game.with_move_made(mv);
        let key = search_key(&child);

        let count = self.history.enter(key);
        let score = if count >= 2 {
            Score::DRAW
        } else {
            let hint = self.killers.first(ply + 1);
            let (_, s) = self.negamax(&child, depth - 1, ply + 1, -beta, -alpha, hint, false);
            -s
        };
        self.history.leave(key);

        score
    }

    /// Primary location of search logic.
    ///
    /// Uses the [negamax](https://www.chessprogramming.org/Negamax)
    /// formulation of alpha-beta: score and window are always from the
    /// side-to-move's perspective, and the recursion negates both.
    ///
    /// Fail-soft: the returned score may lie outside `[alpha, beta]`. The
    /// hash-table store at the bottom classifies the score against the
    /// *original* window, not the mutated one.
    fn negamax(
        &mut self,
        game: &Game,
        depth: u8,
        ply: i32,
        mut alpha: Score,
        mut beta: Score,
        hint: Option<Move>,
        parent_nulled: bool,
    ) -> (Option<Move>, Score) {
        // A cancelled branch yields the sentinel worst score, which no
        // strictly-greater comparison above us will ever adopt.
        if !self.is_searching() {
            return (None, -Score::MATE);
        }

        // Horizon reached; resolve captures before trusting the evaluation.
        if depth == 0 {
            let (mv, score, _) =
                self.quiescence(game, tune::max_qsearch_depth!(), ply, 0, alpha, beta);
            return (mv, score);
        }

        self.stats.nodes += 1;

        let key = search_key(game);
        let (orig_alpha, orig_beta) = (alpha, beta);

        //==========================================================================
        // Transposition table probe
        //==========================================================================
        let (usable, tt_move) = if self.config.use_hash_tables {
            self.ttable.probe(key, depth)
        } else {
            (None, None)
        };
        let mut hint = tt_move.or(hint);

        if let Some(slot) = usable {
            let score = slot.score.relative(ply);
            match slot.bound {
                Bound::Exact => {
                    self.stats.tt_cuts += 1;
                    return (slot.mv, score);
                }
                Bound::Lower => alpha = alpha.max(score),
                Bound::Upper => beta = beta.min(score),
            }

            if alpha >= beta {
                self.stats.tt_cuts += 1;
                return (slot.mv, score);
            }
        }

        //==========================================================================
        // Null move pruning
        //==========================================================================
        // Handing the opponent a free move and still clearing beta means this
        // node is almost certainly a cutoff. Unsound in zugzwang, hence the
        // material gate; never twice in a row, and never near mate scores.
        if self.config.use_null_move
            && !parent_nulled
            && depth >= tune::min_nmp_depth!()
            && !game.is_in_check()
            && !beta.is_mate()
            && Self::nonpawn_pieces(game) >= tune::nmp_min_pieces!()
        {
            let mut null_game = *game;
            null_game.toggle_side_to_move();

            let reduced = depth - tune::nmp_reduction!();
            let (_, null_score) =
                self.negamax(&null_game, reduced, ply + 1, -beta, -alpha, None, true);

            if !self.is_searching() {
                return (None, -Score::MATE);
            }

            if -null_score >= beta {
                self.stats.nullmove_cuts += 1;
                return (None, -null_score);
            }
        }

        let mut best: Option<Move> = None;
        let mut best_score = Score::ALPHA;
        let mut searched_hint: Option<Move> = None;

        //==========================================================================
        // Hint move
        //==========================================================================
        // A good hash or killer move often cuts immediately, so it is worth
        // trying before paying for full move generation.
        if let Some(mv) = hint.filter(|&mv| game.get_legal_moves().contains(&mv)) {
            searched_hint = Some(mv);
            let score = self.search_child(game, mv, depth, ply, alpha, beta);

            if !self.is_searching() {
                return (None, -Score::MATE);
            }

            best = Some(mv);
            best_score = score;
            alpha = alpha.max(score);

            if alpha >= beta {
                self.stats.cuts_on_hint += 1;
                if !(mv.is_capture() || mv.is_promotion()) {
                    self.killers.insert(ply, mv);
                }
                self.deep_killers.insert(ply, mv);
                self.store_tt(key, depth, ply, best_score, best, orig_alpha, orig_beta);
                return (best, best_score);
            }
        }

        //==========================================================================
        // Move generation
        //==========================================================================
        let moves = game.get_legal_moves();

        // If there are no legal moves, it's either mate or a draw.
        if moves.is_empty() {
            let score = if game.is_in_check() {
                // Prefer earlier mates
                -Score::MATE + ply
            } else {
                // Drawing is better than losing
                Score::DRAW
            };

            return (None, score);
        }

        //==========================================================================
        // Internal iterative deepening
        //==========================================================================
        // With no hash move to lead the ordering, a shallower search is a
        // cheap way to find one. The two-ply gap keeps the parity of the
        // remaining depth unchanged.
        if hint.is_none() && depth >= tune::min_iid_depth!() {
            let (iid_move, _) = self.negamax(game, depth - 2, ply, alpha, beta, None, parent_nulled);

            if !self.is_searching() {
                return (best, best_score);
            }

            hint = iid_move;
        }

        //==========================================================================
        // Move ordering
        //==========================================================================
        let mut ordered: ArrayVec<(i32, Move), MAX_MOVES> = moves
            .iter()
            .copied()
            .filter(|&mv| searched_hint != Some(mv))
            .map(|mv| (self.order_score(game, mv, hint, ply), mv))
            .collect();
        ordered.sort_unstable_by_key(|&(score, _)| std::cmp::Reverse(score));

        //==========================================================================
        // Main loop
        //==========================================================================
        let mut timed_out = false;

        for (index, &(_, mv)) in ordered.iter().enumerate() {
            let score = self.search_child(game, mv, depth, ply, alpha, beta);

            // Stop descending on timeout and leave the hash table alone;
            // whatever we report now is built from a completed prefix.
            if !self.is_searching() {
                timed_out = true;
                break;
            }

            if score > best_score {
                best_score = score;
                best = Some(mv);
            }

            alpha = alpha.max(best_score);
            if alpha >= beta {
                if hint == Some(mv) {
                    self.stats.cuts_on_hint += 1;
                } else if self.killers.at(ply).any(|k| k == mv) {
                    self.stats.cuts_on_killer += 1;
                } else if self.deep_killers.at(ply) == Some(mv) {
                    self.stats.cuts_on_deep_killer += 1;
                } else if index == 0 {
                    self.stats.cuts_on_first_child += 1;
                }

                if !(mv.is_capture() || mv.is_promotion()) {
                    self.killers.insert(ply, mv);
                }

                break;
            }
        }

        //==========================================================================
        // Post-loop bookkeeping
        //==========================================================================
        if !timed_out {
            if let Some(best_mv) = best {
                self.deep_killers.insert(ply, best_mv);
            }
            self.store_tt(key, depth, ply, best_score, best, orig_alpha, orig_beta);
        }

        (best, best_score)
    }

    /// Store a search result, classifying it against the window the node
    /// *started* with, as fail-soft requires.
    fn store_tt(
        &mut self,
        key: u64,
        depth: u8,
        ply: i32,
        score: Score,
        mv: Option<Move>,
        orig_alpha: Score,
        orig_beta: Score,
    ) {
        if !self.config.use_hash_tables {
            return;
        }

        let bound = if score >= orig_beta {
            Bound::Lower
        } else if score <= orig_alpha {
            Bound::Upper
        } else {
            Bound::Exact
        };

        self.ttable.store(
            key,
            TtSlot {
                score: score.absolute(ply),
                mv,
                depth,
                bound,
            },
        );
    }

    /// [Quiescence search](https://www.chessprogramming.org/Quiescence_Search):
    /// resolves captures, promotions, and check evasions past the horizon so
    /// the evaluator is only consulted in quiet positions.
    ///
    /// The third return value is the "quiesced" flag: `true` only when this
    /// node ran out of noisy moves entirely, in which case its score is
    /// exact at any greater q-depth. It propagates as the AND over children
    /// and is cleared by a beta cutoff or by bottoming out.
    fn quiescence(
        &mut self,
        game: &Game,
        qdepth: u8,
        ply: i32,
        qply: i32,
        mut alpha: Score,
        mut beta: Score,
    ) -> (Option<Move>, Score, bool) {
        if !self.is_searching() {
            return (None, -Score::MATE, false);
        }

        self.stats.qnodes += 1;

        let (orig_alpha, orig_beta) = (alpha, beta);
        let in_check = game.is_in_check();

        // Stand pat: the side to move can always decline to capture.
        let stand_pat = Evaluator::new(game).eval();
        if stand_pat >= beta {
            return (None, stand_pat, false);
        }
        alpha = alpha.max(stand_pat);

        let key = search_key(game);

        let probed = self
            .config
            .use_hash_tables
            .then(|| self.qtable.probe(key, qdepth))
            .flatten();
        if let Some(slot) = probed {
            let score = slot.score.relative(ply);
            match slot.bound {
                Bound::Exact => return (slot.mv, score, slot.quiesced),
                Bound::Lower => alpha = alpha.max(score),
                Bound::Upper => beta = beta.min(score),
            }

            if alpha >= beta {
                return (slot.mv, score, slot.quiesced);
            }
        }

        let legal = game.get_legal_moves();
        if legal.is_empty() {
            let score = if in_check {
                -Score::MATE + ply
            } else {
                Score::DRAW
            };
            return (None, score, true);
        }

        // When in check every legal move is an evasion and must be searched;
        // otherwise only captures and promotions are noisy.
        let mut noisy: ArrayVec<(i32, Move), MAX_MOVES> = legal
            .iter()
            .copied()
            .filter(|mv| in_check || mv.is_capture() || mv.is_promotion())
            .map(|mv| (mvv_lva(game, mv), mv))
            .collect();

        // No noisy moves at all: the position is quiet and the static
        // evaluation is exact, here and at every greater q-depth.
        if noisy.is_empty() {
            if self.config.use_hash_tables {
                self.qtable.store(
                    key,
                    QttSlot {
                        score: stand_pat.absolute(ply),
                        mv: None,
                        qdepth,
                        bound: Bound::Exact,
                        quiesced: true,
                    },
                );
            }
            return (None, stand_pat, true);
        }

        // Out of q-depth with captures still pending: the branch failed to
        // quiesce and the score is merely a stand-pat estimate.
        if qdepth <= 1 {
            return (None, stand_pat, false);
        }

        noisy.sort_unstable_by_key(|&(score, _)| std::cmp::Reverse(score));

        // Deep capture flurries are usually one queen eating everything in
        // sight. Once past the rampage depth, if the top capture wins a
        // queen, only the queen-winning prefix is worth the nodes.
        if qply >= tune::qsearch_rampage_depth!() && captures_queen(game, noisy[0].1) {
            let prefix = noisy
                .iter()
                .take_while(|&&(_, mv)| captures_queen(game, mv))
                .count();
            if prefix < noisy.len() {
                noisy.truncate(prefix);
                self.stats.rampage_prunes += 1;
            }
        }

        let mut best: Option<Move> = None;
        let mut best_score = stand_pat;
        let mut quiesced = true;

        for &(_, mv) in &noisy {
            let child = game.with_move_made(mv);
            let child_key = search_key(&child);

            let count = self.history.enter(child_key);
            let (score, child_quiesced) = if count >= 2 {
                (Score::DRAW, true)
            } else {
                let (_, s, q) = self.quiescence(&child, qdepth - 1, ply + 1, qply + 1, -beta, -alpha);
                (-s, q)
            };
            self.history.leave(child_key);

            if !self.is_searching() {
                return (None, -Score::MATE, false);
            }

            quiesced &= child_quiesced;

            if score > best_score {
                best_score = score;
                best = Some(mv);
            }

            alpha = alpha.max(best_score);
            if alpha >= beta {
                quiesced = false;
                break;
            }
        }

        if self.config.use_hash_tables {
            let bound = if best_score >= orig_beta {
                Bound::Lower
            } else if best_score <= orig_alpha {
                Bound::Upper
            } else {
                Bound::Exact
            };

            self.qtable.store(
                key,
                QttSlot {
                    score: best_score.absolute(ply),
                    mv: best,
                    qdepth,
                    bound,
                    quiesced,
                },
            );
        }

        (best, best_score, quiesced)
    }
}

/// [MVV-LVA](https://www.chessprogramming.org/MVV-LVA) score: prefer
/// capturing the most valuable victim with the least valuable attacker.
/// Promotions count the promoted piece as part of the spoils.
#[inline(always)]
fn mvv_lva(game: &Game, mv: Move) -> i32 {
    let board = game.board();

    // En passant's victim is not on the destination square.
    let victim = if mv.is_en_passant() {
        Some(PieceKind::Pawn)
    } else {
        board.kind_at(mv.to())
    };

    let attacker = board.kind_at(mv.from()).map_or(0, value_of);
    let promotion = mv.promotion().map_or(0, value_of);

    victim.map_or(0, value_of) * 100 - attacker + promotion
}

/// Whether `mv` captures the opponent's queen.
#[inline(always)]
fn captures_queen(game: &Game, mv: Move) -> bool {
    game.board().kind_at(mv.to()) == Some(PieceKind::Queen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_STARTPOS;
    use chessie::{MoveKind, Square};

    fn run_search(fen: &str, depth: u8) -> SearchResult {
        let game: Game = fen.parse().unwrap();
        let mut history = PositionHistory::default();
        let mut ttable = TranspositionTable::new(1 << 16);
        let mut qtable = QuiescenceTable::new(1 << 15);
        let config = SearchConfig {
            max_depth: depth,
            ..Default::default()
        };

        Search::new(
            &game,
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
    fn test_rejects_zero_limits() {
        let game = Game::default();
        let mut history = PositionHistory::default();
        let mut ttable = TranspositionTable::new(1 << 10);
        let mut qtable = QuiescenceTable::new(1 << 10);
        let config = SearchConfig {
            max_depth: 0,
            budget: Duration::ZERO,
            ..Default::default()
        };

        let res = Search::new(
            &game,
            Arc::new(AtomicBool::new(true)),
            config,
            &mut history,
            &mut ttable,
            &mut qtable,
        )
        .start();

        assert!(res.is_err());
    }

    #[test]
    fn test_finds_mate_in_one() {
        // White mates with Qf7
        let res = run_search(
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 0 1",
            3,
        );

        assert!(res.score.is_mate(), "expected mate score, got {:?}", res.score);
        assert_eq!(res.score.mate_distance(), 1);
        assert_eq!(res.bestmove.unwrap().to_string(), "f3f7");
    }

    #[test]
    fn test_already_mated() {
        // Fool's mate has been delivered; White has no moves.
        let res = run_search(
            "rnb1kbnr/pppp1ppp/8/4p3/5PPq/8/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            2,
        );

        assert!(res.bestmove.is_none());
        assert_eq!(res.score, -Score::MATE);
    }

    #[test]
    fn test_stalemate_is_draw() {
        let res = run_search("2k5/8/8/8/8/1q6/r7/2K5 w - - 0 1", 3);

        assert!(res.bestmove.is_none());
        assert_eq!(res.score, Score::DRAW);
    }

    #[test]
    fn test_timeout_returns_sentinel_free_result() {
        let game: Game = FEN_STARTPOS.parse().unwrap();
        let mut history = PositionHistory::default();
        let mut ttable = TranspositionTable::default();
        let mut qtable = QuiescenceTable::default();
        let config = SearchConfig {
            budget: Duration::from_millis(50),
            ..Default::default()
        };

        let res = Search::new(
            &game,
            Arc::new(AtomicBool::new(true)),
            config,
            &mut history,
            &mut ttable,
            &mut qtable,
        )
        .start()
        .unwrap();

        // Even on a tiny budget the fallback bestmove is legal and the
        // sentinel score never leaks out.
        assert!(res.bestmove.is_some());
        assert!(res.score > Score::ALPHA || res.depth == 0);
    }

    #[test]
    fn test_partial_iteration_keeps_completed_depth() {
        let mv = Move::new(Square::E2, Square::E4, MoveKind::Quiet);
        let mut result = SearchResult {
            bestmove: Some(mv),
            score: Score::new(25),
            depth: 3,
            stats: SearchStats::default(),
        };

        // A cut-short iteration that never settled on a move is discarded,
        result.adopt_partial(None, Score::new(90));
        assert_eq!(result.score, 25);

        // and so is one that only produced the cancellation sentinel.
        result.adopt_partial(Some(mv), Score::ALPHA);
        assert_eq!(result.score, 25);

        // A usable partial result replaces the move and score but must
        // still report the last depth that actually ran to completion.
        let deeper = Move::new(Square::D2, Square::D4, MoveKind::Quiet);
        result.adopt_partial(Some(deeper), Score::new(40));
        assert_eq!(result.bestmove, Some(deeper));
        assert_eq!(result.score, 40);
        assert_eq!(result.depth, 3);
    }
}
