//! Annealing temperature schedule

use super::types::SimulationConfig;

/// Exponentially decaying temperature with a convergence threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoolingSchedule {
    initial: f32,
    rate: f32,
    min: f32,
    temperature: f32,
}

impl CoolingSchedule {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            initial: config.initial_temperature,
            rate: config.cooling_rate,
            min: config.min_temperature,
            temperature: config.initial_temperature,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn initial_temperature(&self) -> f32 {
        self.initial
    }

    /// Current temperature relative to the initial one, in (0, 1]
    pub fn scale(&self) -> f32 {
        self.temperature / self.initial
    }

    pub fn is_converged(&self) -> bool {
        self.temperature <= self.min
    }

    /// Decay by one step; returns true once the threshold is reached
    pub fn cool(&mut self) -> bool {
        if !self.is_converged() {
            self.temperature *= self.rate;
        }
        self.is_converged()
    }

    /// Restart the anneal from the initial temperature
    pub fn reset(&mut self) {
        self.temperature = self.initial;
    }

    /// Number of `cool` calls from the initial temperature to convergence.
    ///
    /// `None` when the rate is 1 and the temperature never decays.
    pub fn steps_to_converge(&self) -> Option<u32> {
        if self.rate >= 1.0 {
            return None;
        }
        let ratio = f64::from(self.min) / f64::from(self.initial);
        let steps = ratio.ln() / f64::from(self.rate).ln();
        Some(steps.ceil().max(0.0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_initial_temperature() {
        let schedule = CoolingSchedule::new(&SimulationConfig::default());
        assert_eq!(schedule.temperature(), 1.0);
        assert_eq!(schedule.scale(), 1.0);
        assert!(!schedule.is_converged());
    }

    #[test]
    fn cooling_is_monotonic_until_converged() {
        let mut schedule = CoolingSchedule::new(&SimulationConfig::default());
        let mut last = schedule.temperature();
        let mut steps = 0;

        while !schedule.cool() {
            assert!(schedule.temperature() < last);
            last = schedule.temperature();
            steps += 1;
            assert!(steps < 10_000, "schedule never converged");
        }

        assert!(schedule.temperature() <= 0.001);
        // Further calls hold the temperature
        let frozen = schedule.temperature();
        assert!(schedule.cool());
        assert_eq!(schedule.temperature(), frozen);
    }

    #[test]
    fn predicted_step_count_matches_decay() {
        let mut schedule = CoolingSchedule::new(&SimulationConfig::default());
        let predicted = schedule.steps_to_converge().unwrap();
        // ln(0.001) / ln(0.995)
        assert_eq!(predicted, 1379);

        let mut steps: u32 = 1;
        while !schedule.cool() {
            steps += 1;
        }
        assert!(steps.abs_diff(predicted) <= 1);
    }

    #[test]
    fn unit_rate_never_converges() {
        let config = SimulationConfig {
            cooling_rate: 1.0,
            ..Default::default()
        };
        let mut schedule = CoolingSchedule::new(&config);
        assert_eq!(schedule.steps_to_converge(), None);
        for _ in 0..100 {
            assert!(!schedule.cool());
        }
    }

    #[test]
    fn reset_restores_initial_temperature() {
        let mut schedule = CoolingSchedule::new(&SimulationConfig::default());
        for _ in 0..50 {
            schedule.cool();
        }
        schedule.reset();
        assert_eq!(schedule.temperature(), 1.0);
    }
}
