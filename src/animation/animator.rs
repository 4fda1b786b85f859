use serde::{Deserialize, Serialize};

/// Per-phase timing curve attached to a descriptor. Shared and read-only, so
/// every query takes the elapsed time explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animator {
    /// (minimum, maximum) duration of each phase in milliseconds.
    pub phase_durations: Vec<(u32, u32)>,
    #[serde(default)]
    pub loop_count: i32,
    #[serde(default)]
    pub start_phase: i32,
    #[serde(default)]
    pub synchronized: bool,
}

impl Animator {
    pub fn new(phase_durations: Vec<(u32, u32)>) -> Self {
        Self {
            phase_durations,
            loop_count: 0,
            start_phase: 0,
            synchronized: false,
        }
    }

    pub fn animation_phases(&self) -> u32 {
        self.phase_durations.len() as u32
    }

    pub fn is_async(&self) -> bool {
        !self.synchronized
    }

    /// Phase reached after `elapsed` ms; each phase lasts its maximum
    /// duration divided by `duration_factor`.
    pub fn phase_at(&self, elapsed: u64, duration_factor: f64) -> u32 {
        let factor = if duration_factor > 0.0 { duration_factor } else { 1.0 };
        let time = elapsed as f64;
        let mut total = 0.0;
        for (index, (_, max)) in self.phase_durations.iter().enumerate() {
            total += f64::from(*max) / factor;
            if time < total {
                return index as u32;
            }
        }
        self.animation_phases().saturating_sub(1)
    }

    pub fn total_duration(&self) -> u64 {
        let cycle: u64 = self
            .phase_durations
            .iter()
            .map(|(_, max)| u64::from(*max))
            .sum();
        cycle * self.loop_count.max(1) as u64
    }

    pub fn min_duration(&self) -> u64 {
        self.phase_durations
            .iter()
            .map(|(min, _)| u64::from(*min))
            .min()
            .unwrap_or(0)
    }

    pub fn average_duration(&self) -> u64 {
        let phases = u64::from(self.animation_phases());
        if phases == 0 {
            return 0;
        }
        self.total_duration() / phases
    }

    /// Phase of a synchronized animation at wall-clock `now`, so every
    /// instance of the descriptor shows the same frame.
    pub fn synchronous_phase_at(&self, now: u64) -> u32 {
        let cycle: u64 = self
            .phase_durations
            .iter()
            .map(|(min, _)| u64::from(*min).max(1))
            .sum();
        if cycle == 0 {
            return 0;
        }
        let mut elapsed = now % cycle;
        for (index, (min, _)) in self.phase_durations.iter().enumerate() {
            let duration = u64::from(*min).max(1);
            if elapsed < duration {
                return index as u32;
            }
            elapsed -= duration;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        Animator::new(vec![(100, 100), (50, 200), (100, 100)])
    }

    #[test]
    fn phase_at_walks_cumulative_durations() {
        let animator = animator();
        assert_eq!(animator.phase_at(0, 1.0), 0);
        assert_eq!(animator.phase_at(99, 1.0), 0);
        assert_eq!(animator.phase_at(100, 1.0), 1);
        assert_eq!(animator.phase_at(299, 1.0), 1);
        assert_eq!(animator.phase_at(300, 1.0), 2);
        assert_eq!(animator.phase_at(10_000, 1.0), 2);
        assert_eq!(animator.phase_at(120, 2.0), 1);
        assert_eq!(animator.phase_at(150, 2.0), 2);
    }

    #[test]
    fn durations() {
        let mut animator = animator();
        assert_eq!(animator.total_duration(), 400);
        assert_eq!(animator.min_duration(), 50);
        assert_eq!(animator.average_duration(), 133);
        animator.loop_count = 3;
        assert_eq!(animator.total_duration(), 1_200);
    }

    #[test]
    fn synchronous_phase_repeats_every_cycle() {
        let animator = animator();
        assert_eq!(animator.synchronous_phase_at(0), 0);
        assert_eq!(animator.synchronous_phase_at(120), 1);
        assert_eq!(animator.synchronous_phase_at(160), 2);
        assert_eq!(animator.synchronous_phase_at(250), 0);
    }
}
