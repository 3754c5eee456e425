//! Scripted and generated radio traffic driving mode transitions.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::energy::radio::Mode;

use super::time::SimTime;

/// One scripted mode transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionStep {
    /// Dispatch time.
    pub at: SimTime,
    /// Target operating mode.
    pub mode: Mode,
    /// Transmit power in dBm; required on transmit steps.
    pub power_dbm: Option<f64>,
}

/// An ordered sequence of mode transitions for one radio.
#[derive(Debug, Clone)]
pub struct TransitionScript {
    steps: Vec<TransitionStep>,
}

impl TransitionScript {
    /// Creates a script from explicit steps.
    ///
    /// # Panics
    ///
    /// Panics if step times decrease or a transmit step lacks a power
    /// value. Scenario validation reports both as field errors first.
    pub fn new(steps: Vec<TransitionStep>) -> Self {
        assert!(
            steps.windows(2).all(|w| w[0].at <= w[1].at),
            "script step times must be non-decreasing"
        );
        assert!(
            steps
                .iter()
                .all(|s| s.mode != Mode::Transmit || s.power_dbm.is_some()),
            "transmit steps must carry a power value"
        );
        Self { steps }
    }

    /// The scripted steps in dispatch order.
    pub fn steps(&self) -> &[TransitionStep] {
        &self.steps
    }
}

/// Generator for a periodic uplink duty cycle.
///
/// Each cycle wakes the radio to standby, transmits for the airtime, opens
/// a receive window, and returns to sleep. Cycle starts carry optional
/// gaussian jitter so repeated cycles do not align perfectly with the
/// source's periodic refresh.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTraffic {
    period_s: f64,
    wakeup_s: f64,
    airtime_s: f64,
    rx_window_s: f64,
    tx_power_dbm: f64,
    jitter_std_s: f64,
}

impl PeriodicTraffic {
    /// Creates a duty-cycle generator.
    ///
    /// # Panics
    ///
    /// Panics if the period is not positive, any phase duration is
    /// negative, the active part of the cycle exceeds half the period, or
    /// the jitter deviation is negative. The half-period bound keeps
    /// jittered cycles from overlapping.
    pub fn new(
        period_s: f64,
        wakeup_s: f64,
        airtime_s: f64,
        rx_window_s: f64,
        tx_power_dbm: f64,
        jitter_std_s: f64,
    ) -> Self {
        assert!(period_s > 0.0);
        assert!(wakeup_s >= 0.0 && airtime_s >= 0.0 && rx_window_s >= 0.0);
        assert!(wakeup_s + airtime_s + rx_window_s <= period_s / 2.0);
        assert!(jitter_std_s >= 0.0);

        Self {
            period_s,
            wakeup_s,
            airtime_s,
            rx_window_s,
            tx_power_dbm,
            jitter_std_s,
        }
    }

    /// Generates the transition script covering `[0, stop]`.
    ///
    /// Identical seed and parameters produce an identical script.
    pub fn script(&self, stop: SimTime, seed: u64) -> TransitionScript {
        let mut rng = StdRng::seed_from_u64(seed);
        let stop_s = stop.as_secs_f64();
        let mut steps = Vec::new();

        let mut cycle = 0u64;
        loop {
            let nominal_s = cycle as f64 * self.period_s;
            if nominal_s > stop_s {
                break;
            }
            // Jitter is bounded to a quarter period; together with the
            // half-period active bound this keeps cycles ordered.
            let jitter = gaussian_noise(&mut rng, self.jitter_std_s)
                .clamp(-self.period_s / 4.0, self.period_s / 4.0);
            let start_s = (nominal_s + jitter).max(0.0);

            let tx_s = start_s + self.wakeup_s;
            let rx_s = tx_s + self.airtime_s;
            let sleep_s = rx_s + self.rx_window_s;
            steps.push(TransitionStep {
                at: SimTime::from_secs_f64(start_s),
                mode: Mode::Standby,
                power_dbm: None,
            });
            steps.push(TransitionStep {
                at: SimTime::from_secs_f64(tx_s),
                mode: Mode::Transmit,
                power_dbm: Some(self.tx_power_dbm),
            });
            steps.push(TransitionStep {
                at: SimTime::from_secs_f64(rx_s),
                mode: Mode::Receive,
                power_dbm: None,
            });
            steps.push(TransitionStep {
                at: SimTime::from_secs_f64(sleep_s),
                mode: Mode::Sleep,
                power_dbm: None,
            });
            cycle += 1;
        }

        TransitionScript::new(steps)
    }
}

/// Gaussian noise via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
