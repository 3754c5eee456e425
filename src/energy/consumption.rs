//! Transmit-power to current-draw conversion.

/// Piecewise-linear lookup converting transmit power to current draw.
///
/// The calibration table is an ordered sequence of (power dBm, current mA)
/// pairs, strictly increasing in power. Lookups interpolate linearly between
/// the two bracketing pairs; the model holds no other state.
#[derive(Debug, Clone)]
pub struct InterpolatedConsumptionModel {
    power_dbm: Vec<f64>,
    current_ma: Vec<f64>,
}

impl InterpolatedConsumptionModel {
    /// Creates a model from parallel power/current calibration vectors.
    ///
    /// # Panics
    ///
    /// Panics if the vectors differ in length, hold fewer than two points,
    /// contain a non-finite value or negative current, or if the power
    /// values are not strictly increasing. Scenario configuration reports
    /// these as field errors before construction.
    pub fn new(power_dbm: Vec<f64>, current_ma: Vec<f64>) -> Self {
        assert_eq!(power_dbm.len(), current_ma.len());
        assert!(power_dbm.len() >= 2, "calibration table needs >= 2 points");
        assert!(power_dbm.iter().all(|p| p.is_finite()));
        assert!(current_ma.iter().all(|c| c.is_finite() && *c >= 0.0));
        assert!(
            power_dbm.windows(2).all(|w| w[0] < w[1]),
            "calibration power values must be strictly increasing"
        );

        Self {
            power_dbm,
            current_ma,
        }
    }

    /// Default calibration for the SX1272 transceiver (datasheet values).
    pub fn sx1272() -> Self {
        Self::new(
            vec![7.0, 13.0, 17.0, 20.0],
            vec![18.0, 28.0, 90.0, 125.0],
        )
    }

    /// Lowest and highest calibrated power in dBm.
    pub fn span_dbm(&self) -> (f64, f64) {
        (
            self.power_dbm[0],
            self.power_dbm[self.power_dbm.len() - 1],
        )
    }

    /// Returns `true` when `power_dbm` lies within the calibrated span.
    pub fn covers(&self, power_dbm: f64) -> bool {
        let (lo, hi) = self.span_dbm();
        power_dbm >= lo && power_dbm <= hi
    }

    /// Interpolated current draw in amperes for a transmit power in dBm.
    ///
    /// # Panics
    ///
    /// Panics if `power_dbm` falls outside the calibrated span; the radio
    /// layer must guarantee in-range power.
    pub fn tx_current_a(&self, power_dbm: f64) -> f64 {
        assert!(
            self.covers(power_dbm),
            "transmit power {power_dbm} dBm outside calibrated span"
        );

        let mut index = 0;
        while power_dbm > self.power_dbm[index + 1] {
            index += 1;
        }

        let power_l = self.power_dbm[index];
        let power_r = self.power_dbm[index + 1];
        let current_l = self.current_ma[index];
        let current_r = self.current_ma[index + 1];

        let current_ma =
            current_l + (current_r - current_l) / (power_r - power_l) * (power_dbm - power_l);
        current_ma / 1000.0
    }
}
