/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;

/// Counts how many times each position has been entered, keyed by hash.
///
/// The driver seeds this with the game line leading to the root, and the
/// search pairs every [`PositionHistory::enter`] with a
/// [`PositionHistory::leave`] on the way back up, so the table stays the size
/// of the search stack plus the game line. A count of 2 seen inside the
/// search means the line has cycled and is scored as a draw.
#[derive(Debug, Default, Clone)]
pub struct PositionHistory {
    counts: HashMap<u64, u32>,
}

impl PositionHistory {
    /// Record that the search has entered the position hashed by `key`,
    /// returning the new count.
    #[inline(always)]
    pub fn enter(&mut self, key: u64) -> u32 {
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    /// Record that the search has left the position hashed by `key`.
    ///
    /// Keys that drop to zero are removed so absent means zero.
    #[inline(always)]
    pub fn leave(&mut self, key: u64) {
        if let Some(count) = self.counts.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&key);
            }
        }
    }

    /// How many times the position hashed by `key` has been entered.
    #[inline(always)]
    pub fn count(&self, key: u64) -> u32 {
        self.counts.get(&key).copied().unwrap_or_default()
    }

    /// Forget everything, e.g. when a new game starts.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_leave_pairing() {
        let mut history = PositionHistory::default();

        assert_eq!(history.count(42), 0);
        assert_eq!(history.enter(42), 1);
        assert_eq!(history.enter(42), 2);
        assert_eq!(history.count(42), 2);

        history.leave(42);
        assert_eq!(history.count(42), 1);

        history.leave(42);
        assert_eq!(history.count(42), 0);
        // Fully-left keys are removed, not kept at zero
        assert!(history.counts.is_empty());
    }

    #[test]
    fn test_leave_of_absent_key_is_harmless() {
        let mut history = PositionHistory::default();
        history.leave(7);
        assert_eq!(history.count(7), 0);
    }
}
