//! Post-run summary derived from the energy node.

use std::fmt;

use crate::energy::node::{EnergyNode, RadioHandle};
use crate::energy::source::SourceEvent;

/// Aggregate summary of one simulation run.
///
/// Computed post-hoc from the node so the reported numbers always agree
/// with the accumulators the run actually produced.
#[derive(Debug, Clone)]
pub struct EnergyReport {
    /// Cumulative transmit time (s).
    pub tx_time_s: f64,
    /// Cumulative receive time (s).
    pub rx_time_s: f64,
    /// Cumulative standby time (s).
    pub standby_time_s: f64,
    /// Cumulative sleep time (s).
    pub sleep_time_s: f64,
    /// Energy consumed transmitting (J).
    pub tx_energy_j: f64,
    /// Energy consumed receiving (J).
    pub rx_energy_j: f64,
    /// Energy consumed in standby (J).
    pub standby_energy_j: f64,
    /// Energy consumed sleeping (J).
    pub sleep_energy_j: f64,
    /// Total energy consumed (J).
    pub total_energy_j: f64,
    /// Remaining source energy (J).
    pub remaining_energy_j: f64,
    /// Remaining source charge (mAh).
    pub remaining_charge_mah: f64,
    /// Remaining energy as a fraction of the initial energy.
    pub energy_fraction: f64,
    /// Whether the source ended the run depleted.
    pub depleted: bool,
    /// Number of depletion notifications raised.
    pub depleted_count: usize,
    /// Number of recharge notifications raised.
    pub recharged_count: usize,
}

impl EnergyReport {
    /// Builds the report for one radio on a node.
    pub fn from_node(node: &EnergyNode, radio: RadioHandle) -> Self {
        let radio = node.radio(radio);
        let source = node.source();
        let count = |kind: SourceEvent| {
            node.events()
                .iter()
                .filter(|(_, event)| *event == kind)
                .count()
        };

        Self {
            tx_time_s: radio.total_tx_time().as_secs_f64(),
            rx_time_s: radio.total_rx_time().as_secs_f64(),
            standby_time_s: radio.total_standby_time().as_secs_f64(),
            sleep_time_s: radio.total_sleep_time().as_secs_f64(),
            tx_energy_j: radio.tx_energy_j(),
            rx_energy_j: radio.rx_energy_j(),
            standby_energy_j: radio.standby_energy_j(),
            sleep_energy_j: radio.sleep_energy_j(),
            total_energy_j: radio.total_energy_consumed_j(),
            remaining_energy_j: source.remaining_energy_j(),
            remaining_charge_mah: source.remaining_charge_mah(),
            energy_fraction: source.energy_fraction(),
            depleted: source.is_depleted(),
            depleted_count: count(SourceEvent::Depleted),
            recharged_count: count(SourceEvent::Recharged),
        }
    }
}

impl fmt::Display for EnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy Report ---")?;
        writeln!(
            f,
            "TX:      {:>9.3} s  {:>12.6} J",
            self.tx_time_s, self.tx_energy_j
        )?;
        writeln!(
            f,
            "RX:      {:>9.3} s  {:>12.6} J",
            self.rx_time_s, self.rx_energy_j
        )?;
        writeln!(
            f,
            "STANDBY: {:>9.3} s  {:>12.6} J",
            self.standby_time_s, self.standby_energy_j
        )?;
        writeln!(
            f,
            "SLEEP:   {:>9.3} s  {:>12.6} J",
            self.sleep_time_s, self.sleep_energy_j
        )?;
        writeln!(f, "Total consumed:   {:.6} J", self.total_energy_j)?;
        writeln!(
            f,
            "Remaining:        {:.6} J ({:.1}%, {:.1} mAh)",
            self.remaining_energy_j,
            self.energy_fraction * 100.0,
            self.remaining_charge_mah
        )?;
        write!(
            f,
            "Depleted: {} (depletions: {}, recharges: {})",
            self.depleted, self.depleted_count, self.recharged_count
        )
    }
}
