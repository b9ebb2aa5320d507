//! Distinct permutations of a multiset, optionally with pinned positions.

use std::collections::BTreeMap;
use std::iter::FusedIterator;

use crate::error::EngineError;

/// Lazily yields every distinct arrangement of a multiset exactly once.
///
/// Equal elements are interchangeable, so `[a, a, b]` yields three sequences,
/// not six. Positions in the fixed map always carry their pinned value, and the
/// pinned values are taken out of the multiset first. Sequences come out in
/// lexicographic order of first-occurrence rank. [`reset`](Self::reset)
/// restarts the enumeration.
#[derive(Debug, Clone)]
pub struct UniquePermutations<T> {
    values: Vec<T>,
    initial_counts: Vec<usize>,
    counts: Vec<usize>,
    /// Pinned value index per position; `None` for free positions.
    slots: Vec<Option<usize>>,
    /// Value index chosen for each filled position.
    stack: Vec<usize>,
    started: bool,
    exhausted: bool,
}

impl<T: Clone + PartialEq> UniquePermutations<T> {
    pub fn new(items: &[T], fixed: &BTreeMap<usize, T>) -> Result<Self, EngineError> {
        let (values, mut counts) = tally(items);
        let mut slots = vec![None; items.len()];
        for (&position, value) in fixed {
            if position >= items.len() {
                return Err(EngineError::FixedPositionOutOfRange {
                    position,
                    len: items.len(),
                });
            }
            let index = values
                .iter()
                .zip(&counts)
                .position(|(candidate, count)| candidate == value && *count > 0)
                .ok_or(EngineError::FixedValueUnavailable { position })?;
            counts[index] -= 1;
            slots[position] = Some(index);
        }

        Ok(Self {
            values,
            initial_counts: counts.clone(),
            counts,
            slots,
            stack: Vec::with_capacity(items.len()),
            started: false,
            exhausted: false,
        })
    }

    /// Without pinned positions.
    pub fn unrestricted(items: &[T]) -> Self {
        let (values, counts) = tally(items);
        Self {
            values,
            initial_counts: counts.clone(),
            counts,
            slots: vec![None; items.len()],
            stack: Vec::with_capacity(items.len()),
            started: false,
            exhausted: false,
        }
    }

    /// Number of sequences a full enumeration yields, saturating at `u128::MAX`.
    pub fn total(&self) -> u128 {
        multinomial(&self.initial_counts)
    }

    pub fn reset(&mut self) {
        self.counts.clone_from(&self.initial_counts);
        self.stack.clear();
        self.started = false;
        self.exhausted = false;
    }

    /// Fills positions from the current depth, trying value indices from
    /// `start` at the first unfilled one. Returns `false` once every branch
    /// has been visited.
    fn advance(&mut self, mut start: usize) -> bool {
        loop {
            let depth = self.stack.len();
            if depth == self.slots.len() {
                return true;
            }
            let choice = match self.slots[depth] {
                Some(pinned) => (start == 0).then_some(pinned),
                None => (start..self.values.len()).find(|&index| self.counts[index] > 0),
            };
            match choice {
                Some(index) => {
                    if self.slots[depth].is_none() {
                        self.counts[index] -= 1;
                    }
                    self.stack.push(index);
                    start = 0;
                }
                None => match self.retreat() {
                    Some(next) => start = next,
                    None => return false,
                },
            }
        }
    }

    /// Undoes the deepest choice and returns the next index to try there.
    fn retreat(&mut self) -> Option<usize> {
        let index = self.stack.pop()?;
        let depth = self.stack.len();
        match self.slots[depth] {
            // a pinned slot has no alternative
            Some(_) => Some(1),
            None => {
                self.counts[index] += 1;
                Some(index + 1)
            }
        }
    }
}

impl<T: Clone + PartialEq> Iterator for UniquePermutations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let found = if self.started {
            match self.retreat() {
                Some(start) => self.advance(start),
                None => false,
            }
        } else {
            self.started = true;
            self.advance(0)
        };
        if !found {
            self.exhausted = true;
            return None;
        }
        Some(
            self.stack
                .iter()
                .map(|&index| self.values[index].clone())
                .collect(),
        )
    }
}

impl<T: Clone + PartialEq> FusedIterator for UniquePermutations<T> {}

/// Distinct values in first-occurrence order with their multiplicities.
fn tally<T: Clone + PartialEq>(items: &[T]) -> (Vec<T>, Vec<usize>) {
    let mut values: Vec<T> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for item in items {
        match values.iter().position(|value| value == item) {
            Some(index) => counts[index] += 1,
            None => {
                values.push(item.clone());
                counts.push(1);
            }
        }
    }
    (values, counts)
}

/// `n! / Π(kᵢ!)` for `n = Σ kᵢ`, computed as a product of binomials.
pub fn multinomial(counts: &[usize]) -> u128 {
    let mut total: u128 = 1;
    let mut placed: u128 = 0;
    for &count in counts {
        for k in 1..=count as u128 {
            placed += 1;
            // C(placed, k) built incrementally stays integral at each step.
            total = match total.checked_mul(placed) {
                Some(value) => value / k,
                None => return u128::MAX,
            };
        }
    }
    total
}

/// Distinct arrangements of `items`.
pub fn count_unique_permutations<T: Clone + PartialEq>(items: &[T]) -> u128 {
    multinomial(&tally(items).1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn yields_each_distinct_sequence_once() {
        let items = ['v', 'v', 's', 'p', 'w'];
        let all: Vec<Vec<char>> = UniquePermutations::unrestricted(&items).collect();
        let distinct: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 60);
        assert_eq!(distinct.len(), all.len());
        assert_eq!(count_unique_permutations(&items), 60);
    }

    #[test]
    fn fixed_positions_are_respected() {
        let items = ['v', 'v', 's', 'p', 'w'];
        let fixed = BTreeMap::from([(0, 's'), (3, 'v')]);
        let mut iter = UniquePermutations::new(&items, &fixed).unwrap();
        // remaining multiset {v, p, w}
        assert_eq!(iter.total(), 6);
        let all: Vec<Vec<char>> = iter.by_ref().collect();
        assert_eq!(all.len(), 6);
        assert!(all.iter().all(|seq| seq[0] == 's' && seq[3] == 'v'));
        let distinct: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(distinct.len(), 6);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn fixed_last_position() {
        let items = [1, 1, 2];
        let fixed = BTreeMap::from([(2, 1)]);
        let all: Vec<_> = UniquePermutations::new(&items, &fixed).unwrap().collect();
        assert_eq!(all, vec![vec![1, 2, 1], vec![2, 1, 1]]);
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let items = [1, 2, 2];
        let mut iter = UniquePermutations::unrestricted(&items);
        let first: Vec<_> = iter.by_ref().collect();
        assert_eq!(first, vec![vec![1, 2, 2], vec![2, 1, 2], vec![2, 2, 1]]);
        iter.reset();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_one_empty_sequence() {
        let items: [u8; 0] = [];
        let all: Vec<_> = UniquePermutations::unrestricted(&items).collect();
        assert_eq!(all, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn rejects_bad_fixed_maps() {
        let items = ['a', 'b'];
        assert_eq!(
            UniquePermutations::new(&items, &BTreeMap::from([(2, 'a')])).unwrap_err(),
            EngineError::FixedPositionOutOfRange { position: 2, len: 2 }
        );
        assert_eq!(
            UniquePermutations::new(&items, &BTreeMap::from([(0, 'a'), (1, 'a')])).unwrap_err(),
            EngineError::FixedValueUnavailable { position: 1 }
        );
    }

    #[test]
    fn multinomial_matches_known_counts() {
        assert_eq!(multinomial(&[8, 1, 1, 3, 1, 1]), 5_405_400);
        assert_eq!(multinomial(&[]), 1);
    }
}
