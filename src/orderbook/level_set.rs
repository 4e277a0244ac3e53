use tracing::{debug, trace};

use crate::orderbook::error::{OrderBookError, OrderBookResult};
use crate::orderbook::price_level::Tolerance;
use crate::orderbook::types::{LevelChange, Price, PriceLevel, Side};

/// Fixed-capacity set of active price levels for one side of the book.
///
/// Levels live unordered in a flat buffer that never grows past `capacity`;
/// removal swaps the last slot into the hole. The best level is tracked by
/// index and only rescanned after the best itself is removed or evicted, so
/// most updates touch a single slot. Every public method leaves the cache
/// valid before returning.
#[derive(Debug, Clone)]
pub struct LevelSet {
    side: Side,
    capacity: usize,
    tolerance: Tolerance,
    levels: Vec<PriceLevel>,
    best: usize,
    best_valid: bool,
    dropped: u64,
}

impl LevelSet {
    pub fn new(side: Side, capacity: usize, tolerance: Tolerance) -> OrderBookResult<Self> {
        if capacity == 0 {
            return Err(OrderBookError::Configuration(
                "max_levels must be positive".to_string(),
            ));
        }

        Ok(Self {
            side,
            capacity,
            tolerance,
            levels: Vec::with_capacity(capacity),
            best: 0,
            best_valid: true,
            dropped: 0,
        })
    }

    /// Seed the set from a full snapshot.
    ///
    /// Exactly the first `capacity` entries are taken, in feed order. The set
    /// is left untouched when the snapshot is too short or carries a
    /// non-finite level.
    pub fn init(&mut self, snapshot: &[PriceLevel]) -> OrderBookResult<()> {
        if snapshot.len() < self.capacity {
            return Err(OrderBookError::InvalidSnapshot {
                side: self.side,
                required: self.capacity,
                actual: snapshot.len(),
            });
        }

        let seed = &snapshot[..self.capacity];
        if let Some(bad) = seed.iter().find(|level| !level.is_finite()) {
            return Err(self.invalid_level(bad));
        }

        self.levels.clear();
        self.best_valid = false;
        for level in seed {
            self.upsert(*level)?;
        }
        self.refresh_best();

        debug!(
            "Initialized {} side with {} of {} levels",
            self.side,
            self.levels.len(),
            self.capacity
        );
        Ok(())
    }

    /// Insert, update or remove the level at `level.price`.
    pub fn upsert(&mut self, level: PriceLevel) -> OrderBookResult<LevelChange> {
        if !level.is_finite() {
            return Err(self.invalid_level(&level));
        }

        let remove = self.tolerance.is_empty_amount(level.amount);
        let change = self.apply_level(level, remove);
        if !self.best_valid {
            self.refresh_best();
        }

        trace!(side = %self.side, price = level.price, amount = level.amount, ?change, "upsert");
        Ok(change)
    }

    /// Current best level, `None` once every level has been removed
    pub fn best(&self) -> Option<PriceLevel> {
        self.best_index().map(|index| self.levels[index])
    }

    /// Level furthest from the best by this side's ordering
    pub fn worst(&self) -> Option<PriceLevel> {
        self.worst_index().map(|index| self.levels[index])
    }

    pub fn get(&self, price: Price) -> Option<PriceLevel> {
        self.position(price).map(|index| self.levels[index])
    }

    pub fn contains(&self, price: Price) -> bool {
        self.position(price).is_some()
    }

    pub fn count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Active levels in storage order
    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    /// Active levels ordered best first
    pub fn sorted_levels(&self) -> Vec<PriceLevel> {
        let mut levels = self.levels.clone();
        match self.side {
            Side::Bid => levels.sort_by(|a, b| b.price.total_cmp(&a.price)),
            Side::Ask => levels.sort_by(|a, b| a.price.total_cmp(&b.price)),
        }
        levels
    }

    /// Number of new levels discarded because the set was full of better prices
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    // Private helper methods

    fn apply_level(&mut self, level: PriceLevel, remove: bool) -> LevelChange {
        // Fast path: most traffic lands on the top of book
        if let Some(best) = self.best_index() {
            if self.tolerance.price_eq(&self.levels[best], &level) {
                if remove {
                    return LevelChange::Removed(self.remove_at(best));
                }
                self.levels[best].amount = level.amount;
                return LevelChange::Updated;
            }
        }

        if let Some(index) = self.position(level.price) {
            if remove {
                return LevelChange::Removed(self.remove_at(index));
            }
            self.levels[index].amount = level.amount;
            self.promote_if_better(index);
            return LevelChange::Updated;
        }

        if remove {
            return LevelChange::Ignored;
        }

        if self.levels.len() < self.capacity {
            self.levels.push(level);
            self.promote_if_better(self.levels.len() - 1);
            return LevelChange::Inserted;
        }

        self.replace_worst(level)
    }

    fn replace_worst(&mut self, level: PriceLevel) -> LevelChange {
        let Some(worst) = self.worst_index() else {
            return LevelChange::Dropped;
        };

        if !self.side.is_better(level.price, self.levels[worst].price) {
            self.dropped += 1;
            debug!(
                "Dropped {} level {} beyond capacity {}",
                self.side, level.price, self.capacity
            );
            return LevelChange::Dropped;
        }

        let evicted = std::mem::replace(&mut self.levels[worst], level);
        if worst == self.best {
            // Only reachable with a single slot
            self.best_valid = false;
        } else {
            self.promote_if_better(worst);
        }
        LevelChange::Evicted(evicted)
    }

    fn remove_at(&mut self, index: usize) -> PriceLevel {
        let last = self.levels.len() - 1;
        let removed = self.levels.swap_remove(index);

        if index == self.best {
            self.best_valid = false;
        } else if self.best == last {
            // The best level was moved into the freed slot
            self.best = index;
        }
        removed
    }

    fn promote_if_better(&mut self, index: usize) {
        match self.best_index() {
            Some(best) if best != index => {
                let candidate = &self.levels[index];
                let current = &self.levels[best];
                if self.side.is_better(candidate.price, current.price)
                    || self.tolerance.price_eq(candidate, current)
                {
                    self.best = index;
                }
            }
            Some(_) => {}
            None => self.best_valid = false,
        }
    }

    fn refresh_best(&mut self) {
        let side = self.side;
        let levels = &self.levels;
        self.best = (0..levels.len())
            .reduce(|best, i| {
                if side.is_better(levels[i].price, levels[best].price) {
                    i
                } else {
                    best
                }
            })
            .unwrap_or(0);
        self.best_valid = true;
    }

    fn best_index(&self) -> Option<usize> {
        if self.best_valid && !self.levels.is_empty() {
            Some(self.best)
        } else {
            None
        }
    }

    fn worst_index(&self) -> Option<usize> {
        let side = self.side;
        let levels = &self.levels;
        (0..levels.len()).reduce(|worst, i| {
            if side.is_better(levels[worst].price, levels[i].price) {
                i
            } else {
                worst
            }
        })
    }

    fn position(&self, price: Price) -> Option<usize> {
        let target = PriceLevel::new(price, 0.0);
        self.levels
            .iter()
            .position(|level| self.tolerance.price_eq(level, &target))
    }

    fn invalid_level(&self, level: &PriceLevel) -> OrderBookError {
        OrderBookError::InvalidLevel {
            side: self.side,
            price: level.price,
            amount: level.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tolerance() -> Tolerance {
        Tolerance::new(0.001, 0.0001).unwrap()
    }

    fn level_set(side: Side, capacity: usize, levels: &[(f64, f64)]) -> LevelSet {
        let mut set = LevelSet::new(side, capacity, tolerance()).unwrap();
        let snapshot: Vec<PriceLevel> = levels.iter().copied().map(PriceLevel::from).collect();
        set.init(&snapshot).unwrap();
        set
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = LevelSet::new(Side::Bid, 0, tolerance());
        assert!(matches!(result, Err(OrderBookError::Configuration(_))));
    }

    #[test]
    fn test_init_computes_best_from_unsorted_snapshot() {
        let bids = level_set(Side::Bid, 3, &[(99.98, 1.0), (100.00, 2.0), (99.99, 3.0)]);
        assert_eq!(bids.best(), Some(PriceLevel::new(100.00, 2.0)));
        assert_eq!(bids.worst(), Some(PriceLevel::new(99.98, 1.0)));

        let asks = level_set(Side::Ask, 3, &[(100.03, 1.0), (100.01, 2.0), (100.02, 3.0)]);
        assert_eq!(asks.best(), Some(PriceLevel::new(100.01, 2.0)));
        assert_eq!(asks.worst(), Some(PriceLevel::new(100.03, 1.0)));
    }

    #[test]
    fn test_init_takes_first_capacity_entries() {
        let bids = level_set(Side::Bid, 2, &[(99.0, 1.0), (98.0, 1.0), (101.0, 1.0)]);
        assert_eq!(bids.count(), 2);
        assert!(!bids.contains(101.0));
        assert_eq!(bids.best().unwrap().price, 99.0);
    }

    #[test]
    fn test_init_rejects_short_snapshot() {
        let mut set = level_set(Side::Ask, 2, &[(10.0, 1.0), (11.0, 1.0)]);
        let err = set.init(&[PriceLevel::new(9.0, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            OrderBookError::InvalidSnapshot {
                side: Side::Ask,
                required: 2,
                actual: 1
            }
        );
        // Previous contents survive the failed init
        assert_eq!(set.count(), 2);
        assert_eq!(set.best().unwrap().price, 10.0);
    }

    #[test]
    fn test_init_skips_empty_and_merges_duplicates() {
        let bids = level_set(
            Side::Bid,
            4,
            &[(100.0, 1.0), (99.0, 0.0), (100.0004, 5.0), (98.0, 2.0)],
        );
        assert_eq!(bids.count(), 2);
        assert_eq!(bids.best(), Some(PriceLevel::new(100.0, 5.0)));
    }

    #[test]
    fn test_update_best_amount_in_place() {
        let mut bids = level_set(Side::Bid, 2, &[(100.0, 1.0), (99.99, 2.0)]);
        let change = bids.upsert(PriceLevel::new(100.0, 7.5)).unwrap();
        assert_eq!(change, LevelChange::Updated);
        assert_eq!(bids.best(), Some(PriceLevel::new(100.0, 7.5)));
        assert_eq!(bids.count(), 2);
    }

    #[test]
    fn test_remove_best_rescans() {
        let mut bids = level_set(Side::Bid, 3, &[(100.0, 1.0), (99.99, 2.0), (99.98, 3.0)]);
        let change = bids.upsert(PriceLevel::new(100.0, 0.0)).unwrap();
        assert_eq!(change, LevelChange::Removed(PriceLevel::new(100.0, 1.0)));
        assert_eq!(bids.best(), Some(PriceLevel::new(99.99, 2.0)));
        assert_eq!(bids.count(), 2);
    }

    #[test]
    fn test_remove_non_best_keeps_best_when_last_slot_moves() {
        // Best sits in the last slot, so the swap relocates it
        let mut asks = level_set(Side::Ask, 3, &[(10.3, 1.0), (10.2, 1.0), (10.1, 4.0)]);
        asks.upsert(PriceLevel::new(10.3, 0.0)).unwrap();
        assert_eq!(asks.best(), Some(PriceLevel::new(10.1, 4.0)));
        assert_eq!(asks.levels()[0], PriceLevel::new(10.1, 4.0));
    }

    #[test]
    fn test_remove_unknown_price_is_ignored() {
        let mut asks = level_set(Side::Ask, 2, &[(10.0, 1.0), (11.0, 1.0)]);
        let change = asks.upsert(PriceLevel::new(12.0, 0.0)).unwrap();
        assert_eq!(change, LevelChange::Ignored);
        assert_eq!(asks.count(), 2);
    }

    #[test]
    fn test_insert_promotes_better_price() {
        let mut asks = level_set(Side::Ask, 3, &[(10.0, 1.0), (11.0, 1.0), (12.0, 1.0)]);
        asks.upsert(PriceLevel::new(10.0, 0.0)).unwrap();
        assert_eq!(asks.count(), 2);

        let change = asks.upsert(PriceLevel::new(9.5, 2.0)).unwrap();
        assert_eq!(change, LevelChange::Inserted);
        assert_eq!(asks.best(), Some(PriceLevel::new(9.5, 2.0)));
    }

    #[test]
    fn test_full_set_evicts_worst() {
        let mut asks = level_set(Side::Ask, 2, &[(100.01, 1.5), (100.02, 0.5)]);
        let change = asks.upsert(PriceLevel::new(100.00, 3.0)).unwrap();
        assert_eq!(change, LevelChange::Evicted(PriceLevel::new(100.02, 0.5)));
        assert_eq!(asks.best(), Some(PriceLevel::new(100.00, 3.0)));
        assert_eq!(asks.count(), 2);
        assert!(!asks.contains(100.02));
    }

    #[test]
    fn test_full_set_drops_worse_level() {
        let mut bids = level_set(Side::Bid, 2, &[(100.0, 1.0), (99.0, 1.0)]);
        let change = bids.upsert(PriceLevel::new(98.0, 1.0)).unwrap();
        assert_eq!(change, LevelChange::Dropped);
        assert_eq!(bids.dropped_count(), 1);
        assert!(!bids.contains(98.0));
        assert_eq!(bids.count(), 2);
    }

    #[test]
    fn test_single_slot_eviction_replaces_best() {
        let mut bids = level_set(Side::Bid, 1, &[(50.0, 1.0)]);
        let change = bids.upsert(PriceLevel::new(51.0, 2.0)).unwrap();
        assert_eq!(change, LevelChange::Evicted(PriceLevel::new(50.0, 1.0)));
        assert_eq!(bids.best(), Some(PriceLevel::new(51.0, 2.0)));
    }

    #[test]
    fn test_emptied_set_has_no_best() {
        let mut bids = level_set(Side::Bid, 2, &[(100.0, 1.0), (99.0, 1.0)]);
        bids.upsert(PriceLevel::new(100.0, 0.0)).unwrap();
        bids.upsert(PriceLevel::new(99.0, 0.00001)).unwrap();
        assert!(bids.is_empty());
        assert_eq!(bids.best(), None);

        bids.upsert(PriceLevel::new(97.0, 1.0)).unwrap();
        assert_eq!(bids.best(), Some(PriceLevel::new(97.0, 1.0)));
    }

    #[test]
    fn test_tied_price_last_writer_wins() {
        let mut asks = level_set(Side::Ask, 2, &[(10.0, 1.0), (11.0, 1.0)]);
        asks.upsert(PriceLevel::new(11.0004, 3.0)).unwrap();
        asks.upsert(PriceLevel::new(10.9996, 4.0)).unwrap();
        assert_eq!(asks.count(), 2);
        assert_eq!(asks.get(11.0), Some(PriceLevel::new(11.0, 4.0)));
    }

    #[test]
    fn test_non_finite_level_rejected() {
        let mut bids = level_set(Side::Bid, 2, &[(100.0, 1.0), (99.0, 1.0)]);
        let err = bids.upsert(PriceLevel::new(f64::NAN, 1.0)).unwrap_err();
        assert!(matches!(err, OrderBookError::InvalidLevel { side: Side::Bid, .. }));
        assert_eq!(bids.count(), 2);
        assert_eq!(bids.best().unwrap().price, 100.0);
    }

    #[test]
    fn test_sorted_levels_best_first() {
        let bids = level_set(Side::Bid, 3, &[(99.0, 1.0), (101.0, 1.0), (100.0, 1.0)]);
        let prices: Vec<f64> = bids.sorted_levels().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![101.0, 100.0, 99.0]);
    }

    fn arb_update() -> impl Strategy<Value = PriceLevel> {
        // Prices on a 0.01 grid, a third of the updates delete
        (9_000u32..9_050u32, prop_oneof![Just(0.0), 0.1f64..10.0, 0.1f64..10.0])
            .prop_map(|(ticks, amount)| PriceLevel::new(ticks as f64 / 100.0, amount))
    }

    fn arb_noisy_update() -> impl Strategy<Value = PriceLevel> {
        // Continuous prices a few epsilons apart, so updates often land within tolerance
        (90.0f64..90.02, prop_oneof![Just(0.0), 0.1f64..10.0, 0.1f64..10.0])
            .prop_map(|(price, amount)| PriceLevel::new(price, amount))
    }

    fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Bid), Just(Side::Ask)]
    }

    proptest! {
        #[test]
        fn prop_best_is_extremal_and_capacity_holds(
            side in arb_side(),
            capacity in 1usize..8,
            updates in proptest::collection::vec(arb_update(), 0..200),
        ) {
            let snapshot: Vec<PriceLevel> = (0..capacity)
                .map(|i| PriceLevel::new(90.0 + i as f64 * 0.05, 1.0))
                .collect();
            let mut set = LevelSet::new(side, capacity, tolerance()).unwrap();
            set.init(&snapshot).unwrap();

            for update in updates {
                set.upsert(update).unwrap();
                prop_assert!(set.count() <= capacity);

                if let Some(best) = set.best() {
                    for level in set.levels() {
                        match side {
                            Side::Bid => prop_assert!(best.price >= level.price - 0.001),
                            Side::Ask => prop_assert!(best.price <= level.price + 0.001),
                        }
                    }
                } else {
                    prop_assert!(set.is_empty());
                }

                for level in set.levels() {
                    prop_assert!(level.amount.abs() >= 0.0001);
                }
            }
        }

        #[test]
        fn prop_noisy_prices_stay_distinct(
            side in arb_side(),
            capacity in 1usize..8,
            updates in proptest::collection::vec(arb_noisy_update(), 0..200),
        ) {
            let snapshot: Vec<PriceLevel> = (0..capacity)
                .map(|i| PriceLevel::new(90.0 + i as f64 * 0.003, 1.0))
                .collect();
            let mut set = LevelSet::new(side, capacity, tolerance()).unwrap();
            set.init(&snapshot).unwrap();

            for update in updates {
                set.upsert(update).unwrap();
                prop_assert!(set.count() <= capacity);

                let levels = set.levels();
                for (i, a) in levels.iter().enumerate() {
                    for b in &levels[i + 1..] {
                        prop_assert!((a.price - b.price).abs() >= 0.001);
                    }
                }

                match set.best() {
                    Some(best) => {
                        prop_assert!(levels.contains(&best));
                        for level in levels {
                            match side {
                                Side::Bid => prop_assert!(best.price >= level.price),
                                Side::Ask => prop_assert!(best.price <= level.price),
                            }
                        }
                    }
                    None => prop_assert!(set.is_empty()),
                }
            }
        }

        #[test]
        fn prop_zero_amount_removes(
            side in arb_side(),
            updates in proptest::collection::vec(arb_update(), 1..100),
            target in 0usize..100,
        ) {
            let snapshot: Vec<PriceLevel> = (0..5)
                .map(|i| PriceLevel::new(90.0 + i as f64 * 0.01, 1.0))
                .collect();
            let mut set = LevelSet::new(side, 5, tolerance()).unwrap();
            set.init(&snapshot).unwrap();
            for update in &updates {
                set.upsert(*update).unwrap();
            }

            let price = updates[target % updates.len()].price;
            set.upsert(PriceLevel::new(price, 0.0)).unwrap();
            prop_assert!(!set.contains(price));
        }

        #[test]
        fn prop_reapplying_active_level_is_idempotent(
            side in arb_side(),
            updates in proptest::collection::vec(arb_update(), 0..100),
            pick in 0usize..5,
        ) {
            let snapshot: Vec<PriceLevel> = (0..5)
                .map(|i| PriceLevel::new(90.1 + i as f64 * 0.01, 2.0))
                .collect();
            let mut set = LevelSet::new(side, 5, tolerance()).unwrap();
            set.init(&snapshot).unwrap();
            for update in updates {
                set.upsert(update).unwrap();
            }
            prop_assume!(!set.is_empty());

            let level = set.levels()[pick % set.count()];
            let before = set.sorted_levels();
            let best = set.best();

            prop_assert_eq!(set.upsert(level).unwrap(), LevelChange::Updated);
            prop_assert_eq!(set.sorted_levels(), before);
            prop_assert_eq!(set.best(), best);
        }
    }
}
