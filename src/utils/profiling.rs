use log::debug;
use std::fmt;
use std::time::Duration;

/// Per-stage timings and counters for the most recent call to `step`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicsProfiler {
    pub integrator_time: Duration,
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub solver_time: Duration,
    pub total_frame_time: Duration,

    pub ticks: u32,
    pub body_count: usize,
    pub sleeping_count: usize,
    pub candidate_pair_count: usize,
    pub contact_count: usize,
}

impl PhysicsProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn share(part: Duration, total: Duration) -> f32 {
        let total_us = total.as_micros() as f32;
        if total_us < 1.0 {
            return 0.0;
        }
        (part.as_micros() as f32 / total_us) * 100.0
    }

    /// Writes the profile through the `log` facade at debug level.
    pub fn report(&self) {
        if self.ticks == 0 {
            return;
        }
        debug!("{self}");
    }
}

impl fmt::Display for PhysicsProfiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "physics profile: {} ticks, {} bodies ({} asleep), {} pairs, {} contacts, {:.2} ms total",
            self.ticks,
            self.body_count,
            self.sleeping_count,
            self.candidate_pair_count,
            self.contact_count,
            self.total_frame_time.as_secs_f32() * 1000.0
        )?;
        write!(
            f,
            "  integrate {:.1}% | broad {:.1}% | narrow {:.1}% | solve {:.1}%",
            Self::share(self.integrator_time, self.total_frame_time),
            Self::share(self.broad_phase_time, self.total_frame_time),
            Self::share(self.narrow_phase_time, self.total_frame_time),
            Self::share(self.solver_time, self.total_frame_time),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_every_stage_share() {
        let profiler = PhysicsProfiler {
            integrator_time: Duration::from_micros(100),
            broad_phase_time: Duration::from_micros(300),
            narrow_phase_time: Duration::from_micros(200),
            solver_time: Duration::from_micros(400),
            total_frame_time: Duration::from_micros(1000),
            ticks: 2,
            body_count: 12,
            sleeping_count: 3,
            candidate_pair_count: 7,
            contact_count: 5,
        };
        let text = profiler.to_string();
        assert!(text.starts_with("physics profile: 2 ticks, 12 bodies (3 asleep), 7 pairs, 5 contacts, 1.00 ms total"));
        assert!(text.contains("integrate 10.0% | broad 30.0% | narrow 20.0% | solve 40.0%"));
        profiler.report();
    }

    #[test]
    fn empty_profile_has_zero_shares() {
        let text = PhysicsProfiler::default().to_string();
        assert!(text.contains("integrate 0.0% | broad 0.0% | narrow 0.0% | solve 0.0%"));
    }
}
