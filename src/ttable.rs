/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use chessie::Move;

use crate::Score;

/// Default number of entries in the main transposition table.
const DEFAULT_TT_ENTRIES: usize = 1 << 20;

/// Default number of entries in the quiescence transposition table.
const DEFAULT_QTT_ENTRIES: usize = 1 << 19;

/// How a stored score relates to the true value of the position.
///
/// See <https://www.chessprogramming.org/Node_Types>.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The score is the exact value of the position.
    Exact,
    /// The search failed high; the true value is at least this score.
    Lower,
    /// The search failed low; the true value is at most this score.
    Upper,
}

/// One cached search result: score, best move, remaining depth, and how the
/// score relates to the window it was searched with.
///
/// Mate scores are stored relative to the root and re-normalized on probe.
#[derive(Debug, Clone, Copy)]
pub struct TtSlot {
    pub score: Score,
    pub mv: Option<Move>,
    pub depth: u8,
    pub bound: Bound,
}

impl TtSlot {
    /// Whether `self` should survive being challenged by `new` at the same key.
    ///
    /// Deeper searches win. At equal depth an exact score beats a bound, and
    /// between two like bounds the tighter one is kept: the higher score for
    /// lower bounds, the lower score for upper bounds.
    fn survives(&self, new: &TtSlot) -> bool {
        if new.depth != self.depth {
            return new.depth < self.depth;
        }

        match (self.bound, new.bound) {
            (Bound::Exact, Bound::Exact) => false, // fresher exact wins
            (Bound::Exact, _) => true,
            (_, Bound::Exact) => false,
            (Bound::Lower, Bound::Lower) => self.score >= new.score,
            (Bound::Upper, Bound::Upper) => self.score <= new.score,
            _ => false, // mismatched bounds at equal depth: keep the fresher
        }
    }
}

/// A keyed pair of slots, one per parity of the remaining depth.
///
/// The evaluation is not stable between even and odd remaining depth, so
/// results from the two parities never overwrite each other.
#[derive(Debug, Clone, Copy)]
struct TtEntry {
    key: u64,
    slots: [Option<TtSlot>; 2],
}

/// Statistics shared by both hash tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableStats {
    /// Number of probes performed.
    pub accesses: u64,
    /// Probes that found a usable entry.
    pub hits: u64,
    /// Probes that found an entry for a different position at the same index.
    pub collisions: u64,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accesses, {} hits, {} collisions",
            self.accesses, self.hits, self.collisions
        )
    }
}

/// The main [transposition table](https://www.chessprogramming.org/Transposition_Table).
///
/// Fixed power-of-two capacity, indexed by `key & (len - 1)`, with the full
/// key verified on every read.
#[derive(Debug)]
pub struct TranspositionTable {
    entries: Vec<Option<TtEntry>>,
    pub stats: TableStats,
}

impl TranspositionTable {
    /// Create a table with at least `capacity` entries, rounded up to a power of two.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity.next_power_of_two()],
            stats: TableStats::default(),
        }
    }

    /// Create a table that fits within `mb` megabytes.
    pub fn with_size_mb(mb: usize) -> Self {
        let capacity = (mb << 20) / std::mem::size_of::<Option<TtEntry>>();
        // next_power_of_two rounds up, so halve first to stay within budget
        Self::new(capacity / 2 + 1)
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        key as usize & (self.entries.len() - 1)
    }

    /// Look up `key`, wanting a result searched to at least `depth` plies.
    ///
    /// Returns the usable slot, if any, plus the best-move hint from either
    /// parity slot. A slot is usable when its stored depth is at least the
    /// requested depth with the same parity; the slot layout guarantees the
    /// parity match, so only the depth needs checking.
    pub fn probe(&mut self, key: u64, depth: u8) -> (Option<TtSlot>, Option<Move>) {
        self.stats.accesses += 1;

        let index = self.index(key);
        let Some(entry) = &self.entries[index] else {
            return (None, None);
        };

        if entry.key != key {
            self.stats.collisions += 1;
            return (None, None);
        }

        let parity = (depth & 1) as usize;
        let same_parity = entry.slots[parity];
        let other_parity = entry.slots[parity ^ 1];

        let usable = same_parity.filter(|slot| slot.depth >= depth);
        if usable.is_some() {
            self.stats.hits += 1;
        }

        // Even an unusable slot's move is a worthwhile ordering hint.
        let hint = same_parity
            .and_then(|slot| slot.mv)
            .or_else(|| other_parity.and_then(|slot| slot.mv));

        (usable, hint)
    }

    /// Store a search result for `key`, subject to the replacement policy.
    pub fn store(&mut self, key: u64, slot: TtSlot) {
        let index = self.index(key);
        let parity = (slot.depth & 1) as usize;

        match &mut self.entries[index] {
            Some(entry) if entry.key == key => {
                let keep_old = entry.slots[parity].is_some_and(|old| old.survives(&slot));
                if !keep_old {
                    entry.slots[parity] = Some(slot);
                }
            }
            // A different position hashing here is simply evicted.
            occupant => {
                let mut slots = [None, None];
                slots[parity] = Some(slot);
                *occupant = Some(TtEntry { key, slots });
            }
        }
    }

    /// Drop all entries and reset statistics.
    pub fn clear(&mut self) {
        self.entries.fill(None);
        self.stats = TableStats::default();
    }

    /// Number of entries the table can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(DEFAULT_TT_ENTRIES)
    }
}

/// A cached quiescence-search result.
#[derive(Debug, Clone, Copy)]
pub struct QttSlot {
    pub score: Score,
    pub mv: Option<Move>,
    pub qdepth: u8,
    pub bound: Bound,
    /// Set when the node had no noisy moves at all: the score is then exact
    /// for any greater q-depth.
    pub quiesced: bool,
}

#[derive(Debug, Clone, Copy)]
struct QttEntry {
    key: u64,
    slot: QttSlot,
}

/// Transposition table for the quiescence search.
#[derive(Debug)]
pub struct QuiescenceTable {
    entries: Vec<Option<QttEntry>>,
    pub stats: TableStats,
}

impl QuiescenceTable {
    /// Create a table with at least `capacity` entries, rounded up to a power of two.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity.next_power_of_two()],
            stats: TableStats::default(),
        }
    }

    /// Create a table that fits within `mb` megabytes.
    pub fn with_size_mb(mb: usize) -> Self {
        let capacity = (mb << 20) / std::mem::size_of::<Option<QttEntry>>();
        Self::new(capacity / 2 + 1)
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        key as usize & (self.entries.len() - 1)
    }

    /// Look up `key`, wanting a result searched to at least `qdepth`.
    ///
    /// Unlike the main table, a *shallower* entry is also usable when it is
    /// flagged quiesced, since a fully-quiet position evaluates identically
    /// at every greater q-depth.
    pub fn probe(&mut self, key: u64, qdepth: u8) -> Option<QttSlot> {
        self.stats.accesses += 1;

        let entry = self.entries[self.index(key)].as_ref()?;
        if entry.key != key {
            self.stats.collisions += 1;
            return None;
        }

        let slot = entry.slot;
        let usable = slot.qdepth >= qdepth || slot.quiesced;
        if usable {
            self.stats.hits += 1;
        }

        usable.then_some(slot)
    }

    /// Store a quiescence result for `key`.
    ///
    /// Quiesced entries are the most valuable and are never displaced by
    /// unquiesced ones; otherwise deeper wins and exact beats a bound.
    pub fn store(&mut self, key: u64, slot: QttSlot) {
        let index = self.index(key);

        if let Some(entry) = &self.entries[index] {
            if entry.key == key {
                let old = &entry.slot;
                let keep_old = (old.quiesced && !slot.quiesced)
                    || (old.quiesced == slot.quiesced
                        && (old.qdepth > slot.qdepth
                            || (old.qdepth == slot.qdepth
                                && old.bound == Bound::Exact
                                && slot.bound != Bound::Exact)));
                if keep_old {
                    return;
                }
            }
        }

        self.entries[index] = Some(QttEntry { key, slot });
    }

    /// Drop all entries and reset statistics.
    pub fn clear(&mut self) {
        self.entries.fill(None);
        self.stats = TableStats::default();
    }

    /// Number of entries this table can hold.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

impl Default for QuiescenceTable {
    fn default() -> Self {
        Self::new(DEFAULT_QTT_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessie::{MoveKind, Square};

    fn slot(score: i32, depth: u8, bound: Bound) -> TtSlot {
        TtSlot {
            score: Score::new(score),
            mv: Some(Move::new(Square::E2, Square::E4, MoveKind::Quiet)),
            depth,
            bound,
        }
    }

    #[test]
    fn test_probe_respects_depth_and_parity() {
        let mut tt = TranspositionTable::new(1 << 10);
        tt.store(123, slot(50, 4, Bound::Exact));

        // Same parity, shallower request: usable
        let (usable, hint) = tt.probe(123, 2);
        assert!(usable.is_some());
        assert!(hint.is_some());

        // Deeper request: not usable, but the move hint survives
        let (usable, hint) = tt.probe(123, 6);
        assert!(usable.is_none());
        assert!(hint.is_some());

        // Odd-parity request looks at the other (empty) slot
        let (usable, hint) = tt.probe(123, 3);
        assert!(usable.is_none());
        assert!(hint.is_some());

        // Different key entirely
        let (usable, hint) = tt.probe(456, 2);
        assert!(usable.is_none());
        assert!(hint.is_none());
    }

    #[test]
    fn test_parities_do_not_clobber_each_other() {
        let mut tt = TranspositionTable::new(1 << 10);
        tt.store(99, slot(10, 4, Bound::Exact));
        tt.store(99, slot(-30, 5, Bound::Exact));

        let (even, _) = tt.probe(99, 4);
        let (odd, _) = tt.probe(99, 5);
        assert_eq!(even.unwrap().score, Score::new(10));
        assert_eq!(odd.unwrap().score, Score::new(-30));
    }

    #[test]
    fn test_replacement_policy() {
        let mut tt = TranspositionTable::new(1 << 10);

        // Deeper always wins
        tt.store(7, slot(10, 2, Bound::Exact));
        tt.store(7, slot(20, 4, Bound::Upper));
        assert_eq!(tt.probe(7, 2).0.unwrap().depth, 4);

        // Shallower never replaces
        tt.store(7, slot(99, 2, Bound::Exact));
        assert_eq!(tt.probe(7, 2).0.unwrap().depth, 4);

        // At equal depth, exact beats a bound
        tt.store(7, slot(15, 4, Bound::Exact));
        assert_eq!(tt.probe(7, 4).0.unwrap().bound, Bound::Exact);
        tt.store(7, slot(25, 4, Bound::Lower));
        assert_eq!(tt.probe(7, 4).0.unwrap().bound, Bound::Exact);

        // Between like bounds, the tighter one survives
        let mut tt = TranspositionTable::new(1 << 10);
        tt.store(8, slot(30, 4, Bound::Lower));
        tt.store(8, slot(20, 4, Bound::Lower));
        assert_eq!(tt.probe(8, 4).0.unwrap().score, Score::new(30));
        tt.store(8, slot(40, 4, Bound::Lower));
        assert_eq!(tt.probe(8, 4).0.unwrap().score, Score::new(40));
    }

    #[test]
    fn test_qtt_quiesced_entries_are_depth_independent() {
        let mut qtt = QuiescenceTable::new(1 << 10);

        qtt.store(
            55,
            QttSlot {
                score: Score::new(12),
                mv: None,
                qdepth: 2,
                bound: Bound::Exact,
                quiesced: true,
            },
        );

        // Usable even at a far deeper request
        assert!(qtt.probe(55, 8).is_some());

        // An unquiesced shallow entry is not
        qtt.store(
            56,
            QttSlot {
                score: Score::new(12),
                mv: None,
                qdepth: 2,
                bound: Bound::Exact,
                quiesced: false,
            },
        );
        assert!(qtt.probe(56, 8).is_none());
        assert!(qtt.probe(56, 2).is_some());
    }
}
