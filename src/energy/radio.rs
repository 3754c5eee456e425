//! Per-radio energy accounting state machine.

use std::fmt;
use std::str::FromStr;

use crate::sim::time::SimTime;

use super::consumption::InterpolatedConsumptionModel;

/// Default transmit current in amperes (SX1272 at 14 dBm).
pub const TX_CURRENT_DEFAULT_A: f64 = 43.5e-3;
/// Default receive current in amperes.
pub const RX_CURRENT_DEFAULT_A: f64 = 11.2e-3;
/// Default standby current in amperes.
pub const STANDBY_CURRENT_DEFAULT_A: f64 = 1.4e-3;
/// Default sleep current in amperes.
pub const SLEEP_CURRENT_DEFAULT_A: f64 = 1.8e-6;

/// Radio operating mode. Exactly one is active per radio at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Transmit,
    Receive,
    Standby,
    Sleep,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Transmit => write!(f, "TX"),
            Mode::Receive => write!(f, "RX"),
            Mode::Standby => write!(f, "STANDBY"),
            Mode::Sleep => write!(f, "SLEEP"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transmit" => Ok(Mode::Transmit),
            "receive" => Ok(Mode::Receive),
            "standby" => Ok(Mode::Standby),
            "sleep" => Ok(Mode::Sleep),
            other => Err(format!(
                "unknown mode \"{other}\", expected transmit, receive, standby, or sleep"
            )),
        }
    }
}

/// Energy accounting for a single radio transceiver.
///
/// Tracks the active operating mode and, per mode, the cumulative time spent
/// and energy consumed. Every transition closes out the outgoing mode's
/// bucket before the mode switches, so the accessors are always current
/// without recomputation.
///
/// Starts in [`Mode::Sleep`] at time zero.
#[derive(Debug, Clone)]
pub struct RadioEnergyModel {
    tx_current_a: f64,
    rx_current_a: f64,
    standby_current_a: f64,
    sleep_current_a: f64,
    consumption: Option<InterpolatedConsumptionModel>,
    mode: Mode,
    last_transition: SimTime,
    tx_time: SimTime,
    rx_time: SimTime,
    standby_time: SimTime,
    sleep_time: SimTime,
    tx_energy_j: f64,
    rx_energy_j: f64,
    standby_energy_j: f64,
    sleep_energy_j: f64,
    total_energy_j: f64,
}

impl RadioEnergyModel {
    /// Creates a model with the four per-mode supply currents in amperes.
    ///
    /// # Panics
    ///
    /// Panics if any current is negative or not finite.
    pub fn new(
        tx_current_a: f64,
        rx_current_a: f64,
        standby_current_a: f64,
        sleep_current_a: f64,
    ) -> Self {
        for current in [tx_current_a, rx_current_a, standby_current_a, sleep_current_a] {
            assert!(current.is_finite() && current >= 0.0);
        }

        Self {
            tx_current_a,
            rx_current_a,
            standby_current_a,
            sleep_current_a,
            consumption: None,
            mode: Mode::Sleep,
            last_transition: SimTime::ZERO,
            tx_time: SimTime::ZERO,
            rx_time: SimTime::ZERO,
            standby_time: SimTime::ZERO,
            sleep_time: SimTime::ZERO,
            tx_energy_j: 0.0,
            rx_energy_j: 0.0,
            standby_energy_j: 0.0,
            sleep_energy_j: 0.0,
            total_energy_j: 0.0,
        }
    }

    /// Creates a model with the SX1272 default currents.
    pub fn with_default_currents() -> Self {
        Self::new(
            TX_CURRENT_DEFAULT_A,
            RX_CURRENT_DEFAULT_A,
            STANDBY_CURRENT_DEFAULT_A,
            SLEEP_CURRENT_DEFAULT_A,
        )
    }

    /// Attaches a consumption model; transmit notifications will derive the
    /// transmit current from it instead of keeping the configured value.
    pub fn set_consumption_model(&mut self, model: InterpolatedConsumptionModel) {
        self.consumption = Some(model);
    }

    /// Recomputes the transmit current for a transmit power in dBm.
    ///
    /// Without an attached consumption model the configured transmit
    /// current stays in effect.
    pub fn update_tx_current(&mut self, power_dbm: f64) {
        if let Some(model) = &self.consumption {
            self.tx_current_a = model.tx_current_a(power_dbm);
        }
    }

    /// Closes the running interval: charges the active mode's time and
    /// energy buckets up to `now` and returns the energy decrement in
    /// joules.
    ///
    /// # Panics
    ///
    /// Panics if `now` precedes the last transition; notifications must
    /// arrive in timestamp order.
    pub fn account_until(&mut self, now: SimTime, supply_voltage_v: f64) -> f64 {
        assert!(
            now >= self.last_transition,
            "state notification with time running backwards"
        );
        let elapsed = now - self.last_transition;
        let decrement_j = self.current_a() * supply_voltage_v * elapsed.as_secs_f64();

        match self.mode {
            Mode::Transmit => {
                self.tx_time += elapsed;
                self.tx_energy_j += decrement_j;
            }
            Mode::Receive => {
                self.rx_time += elapsed;
                self.rx_energy_j += decrement_j;
            }
            Mode::Standby => {
                self.standby_time += elapsed;
                self.standby_energy_j += decrement_j;
            }
            Mode::Sleep => {
                self.sleep_time += elapsed;
                self.sleep_energy_j += decrement_j;
            }
        }

        self.total_energy_j += decrement_j;
        self.last_transition = now;
        decrement_j
    }

    /// Commits a mode switch. Suppressed while the source is depleted: a
    /// radio without power stays frozen in its last mode.
    pub fn enter_mode(&mut self, mode: Mode, source_depleted: bool) {
        if !source_depleted {
            self.mode = mode;
        }
    }

    /// Instantaneous current draw in amperes for the active mode.
    pub fn current_a(&self) -> f64 {
        match self.mode {
            Mode::Transmit => self.tx_current_a,
            Mode::Receive => self.rx_current_a,
            Mode::Standby => self.standby_current_a,
            Mode::Sleep => self.sleep_current_a,
        }
    }

    /// The active operating mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Timestamp of the last committed accounting point.
    pub fn last_transition(&self) -> SimTime {
        self.last_transition
    }

    /// Configured or derived transmit current in amperes.
    pub fn tx_current_a(&self) -> f64 {
        self.tx_current_a
    }

    /// Configured receive current in amperes.
    pub fn rx_current_a(&self) -> f64 {
        self.rx_current_a
    }

    /// Configured standby current in amperes.
    pub fn standby_current_a(&self) -> f64 {
        self.standby_current_a
    }

    /// Configured sleep current in amperes.
    pub fn sleep_current_a(&self) -> f64 {
        self.sleep_current_a
    }

    /// Cumulative time spent transmitting.
    pub fn total_tx_time(&self) -> SimTime {
        self.tx_time
    }

    /// Cumulative time spent receiving.
    pub fn total_rx_time(&self) -> SimTime {
        self.rx_time
    }

    /// Cumulative time spent in standby.
    pub fn total_standby_time(&self) -> SimTime {
        self.standby_time
    }

    /// Cumulative time spent sleeping.
    pub fn total_sleep_time(&self) -> SimTime {
        self.sleep_time
    }

    /// Energy consumed transmitting, in joules.
    pub fn tx_energy_j(&self) -> f64 {
        self.tx_energy_j
    }

    /// Energy consumed receiving, in joules.
    pub fn rx_energy_j(&self) -> f64 {
        self.rx_energy_j
    }

    /// Energy consumed in standby, in joules.
    pub fn standby_energy_j(&self) -> f64 {
        self.standby_energy_j
    }

    /// Energy consumed sleeping, in joules.
    pub fn sleep_energy_j(&self) -> f64 {
        self.sleep_energy_j
    }

    /// Total energy consumed across all modes, in joules.
    pub fn total_energy_consumed_j(&self) -> f64 {
        self.total_energy_j
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, RadioEnergyModel};
    use crate::energy::consumption::InterpolatedConsumptionModel;
    use crate::sim::time::SimTime;

    fn secs(s: f64) -> SimTime {
        SimTime::from_secs_f64(s)
    }

    #[test]
    fn starts_asleep_with_empty_buckets() {
        let radio = RadioEnergyModel::with_default_currents();
        assert_eq!(radio.mode(), Mode::Sleep);
        assert_eq!(radio.total_sleep_time(), SimTime::ZERO);
        assert_eq!(radio.total_energy_consumed_j(), 0.0);
        assert_eq!(radio.current_a(), 1.8e-6);
    }

    #[test]
    fn account_charges_the_outgoing_mode() {
        let mut radio = RadioEnergyModel::new(0.04, 0.01, 0.001, 1e-6);
        radio.enter_mode(Mode::Transmit, false);

        let decrement = radio.account_until(secs(2.0), 3.7);
        assert!((decrement - 0.04 * 3.7 * 2.0).abs() < 1e-12);
        assert_eq!(radio.total_tx_time(), secs(2.0));
        assert!((radio.tx_energy_j() - decrement).abs() < 1e-15);
        assert_eq!(radio.total_energy_consumed_j(), radio.tx_energy_j());
        assert_eq!(radio.last_transition(), secs(2.0));
    }

    #[test]
    fn time_and_energy_are_conserved_across_modes() {
        let mut radio = RadioEnergyModel::with_default_currents();
        let voltage = 3.7;
        let sequence = [
            (Mode::Transmit, 1.0),
            (Mode::Receive, 2.25),
            (Mode::Standby, 3.75),
            (Mode::Sleep, 5.5),
        ];
        for (mode, at) in sequence {
            radio.account_until(secs(at), voltage);
            radio.enter_mode(mode, false);
        }
        radio.account_until(secs(7.0), voltage);

        let total_time = radio.total_tx_time()
            + radio.total_rx_time()
            + radio.total_standby_time()
            + radio.total_sleep_time();
        assert_eq!(total_time, secs(7.0));

        let total_energy = radio.tx_energy_j()
            + radio.rx_energy_j()
            + radio.standby_energy_j()
            + radio.sleep_energy_j();
        assert!((total_energy - radio.total_energy_consumed_j()).abs() < 1e-12);
    }

    #[test]
    fn depleted_source_freezes_the_mode() {
        let mut radio = RadioEnergyModel::with_default_currents();
        radio.enter_mode(Mode::Receive, false);
        radio.enter_mode(Mode::Transmit, true);
        assert_eq!(radio.mode(), Mode::Receive);
    }

    #[test]
    fn consumption_model_overrides_tx_current() {
        let mut radio = RadioEnergyModel::new(0.1, 0.01, 0.001, 1e-6);
        radio.update_tx_current(14.0);
        assert_eq!(radio.tx_current_a(), 0.1); // no model attached

        radio.set_consumption_model(InterpolatedConsumptionModel::sx1272());
        radio.update_tx_current(14.0);
        assert!((radio.tx_current_a() - 0.0435).abs() < 1e-12);
    }

    #[test]
    fn mode_parses_from_config_strings() {
        assert_eq!("transmit".parse::<Mode>(), Ok(Mode::Transmit));
        assert_eq!("receive".parse::<Mode>(), Ok(Mode::Receive));
        assert_eq!("standby".parse::<Mode>(), Ok(Mode::Standby));
        assert_eq!("sleep".parse::<Mode>(), Ok(Mode::Sleep));
        assert!("tx".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_display_matches_log_names() {
        assert_eq!(Mode::Transmit.to_string(), "TX");
        assert_eq!(Mode::Sleep.to_string(), "SLEEP");
    }

    #[test]
    #[should_panic]
    fn negative_current_panics() {
        RadioEnergyModel::new(-0.01, 0.01, 0.001, 1e-6);
    }

    #[test]
    #[should_panic]
    fn out_of_order_notification_panics() {
        let mut radio = RadioEnergyModel::with_default_currents();
        radio.account_until(secs(2.0), 3.7);
        radio.account_until(secs(1.0), 3.7);
    }
}
