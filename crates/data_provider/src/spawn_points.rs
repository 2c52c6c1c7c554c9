//! Spawn point allocator
//!
//! Shuffled list of candidate poses consumed through a monotonic cursor.

use contracts::Transform;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

/// Hands out each candidate pose at most once per pass
#[derive(Debug, Clone, Default)]
pub struct SpawnPointAllocator {
    points: Vec<Transform>,
    cursor: usize,
}

impl SpawnPointAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidates with a shuffled copy of `points` and rewind
    pub fn bind<R: Rng + ?Sized>(&mut self, points: Vec<Transform>, rng: &mut R) {
        self.points = points;
        self.points.shuffle(rng);
        self.cursor = 0;
        debug!(candidates = self.points.len(), "spawn points bound");
    }

    /// Next unused pose; `None` once the pass is exhausted
    pub fn allocate_next(&mut self) -> Option<Transform> {
        let point = self.points.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(point)
    }

    /// Uniformly drawn candidate; does not move the cursor
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Transform> {
        self.points.choose(rng).copied()
    }

    /// Candidates not yet handed out
    pub fn remaining(&self) -> usize {
        self.points.len() - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop all candidates
    pub fn reset(&mut self) {
        self.points.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Location, Rotation};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(n: usize) -> Vec<Transform> {
        (0..n)
            .map(|i| Transform::new(Location::new(i as f64, 0.0, 0.0), Rotation::default()))
            .collect()
    }

    #[test]
    fn test_allocates_each_point_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut allocator = SpawnPointAllocator::new();
        allocator.bind(row(5), &mut rng);

        let mut xs: Vec<i64> = std::iter::from_fn(|| allocator.allocate_next())
            .map(|t| t.location.x as i64)
            .collect();
        xs.sort();
        assert_eq!(xs, vec![0, 1, 2, 3, 4]);

        // exhaustion is explicit and sticky
        assert!(allocator.allocate_next().is_none());
        assert!(allocator.allocate_next().is_none());
        assert_eq!(allocator.cursor(), 5);
        assert_eq!(allocator.remaining(), 0);
    }

    #[test]
    fn test_bind_rewinds_cursor() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut allocator = SpawnPointAllocator::new();
        allocator.bind(row(3), &mut rng);
        allocator.allocate_next();
        allocator.allocate_next();
        assert_eq!(allocator.remaining(), 1);

        allocator.bind(row(4), &mut rng);
        assert_eq!(allocator.cursor(), 0);
        assert_eq!(allocator.remaining(), 4);
    }

    #[test]
    fn test_empty_and_reset() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut allocator = SpawnPointAllocator::new();
        assert!(allocator.allocate_next().is_none());
        assert!(allocator.random_point(&mut rng).is_none());

        allocator.bind(row(2), &mut rng);
        assert!(allocator.random_point(&mut rng).is_some());
        allocator.reset();
        assert!(allocator.is_empty());
        assert!(allocator.allocate_next().is_none());
    }
}
