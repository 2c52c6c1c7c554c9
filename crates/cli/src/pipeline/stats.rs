//! Run statistics.

use std::time::Duration;

use contracts::ActorId;
use observability::ProviderStatsAggregator;

/// Statistics from a scenario run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Hero actor id
    pub hero: Option<ActorId>,

    /// Pool size after spawning
    pub pool_size: usize,

    /// Traffic lights registered by prepare_map
    pub traffic_lights: usize,

    /// Light controlling the junction ahead of the hero
    pub next_light: Option<ActorId>,

    /// Lights changed by the green wave
    pub lights_overridden: usize,

    /// Hero planar speed after the last tick (m/s)
    pub hero_speed: f64,

    pub last_frame: u64,

    /// Actors still in the world after cleanup
    pub remaining_actors: usize,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Batch and tick aggregates
    pub metrics: ProviderStatsAggregator,
}

impl RunStats {
    /// Ticks per second of wall time
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.total_ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Scenario Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Last frame: {}", self.last_frame);
        println!("   ├─ Ticks/s: {:.2}", self.tick_rate());
        match self.hero {
            Some(hero) => println!("   ├─ Hero: {} ({:.2} m/s)", hero, self.hero_speed),
            None => println!("   ├─ Hero: none"),
        }
        println!("   ├─ Pooled actors: {}", self.pool_size);
        println!("   └─ Left after cleanup: {}", self.remaining_actors);

        println!("\n🚦 Traffic Lights");
        println!("   ├─ Registered: {}", self.traffic_lights);
        match self.next_light {
            Some(light) => println!("   ├─ Next for hero: {}", light),
            None => println!("   ├─ Next for hero: none"),
        }
        println!("   └─ Overridden: {}", self.lights_overridden);

        println!("\n{}", self.metrics.summary());
    }
}
