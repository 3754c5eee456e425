//! Simulation engine wiring config, node, scheduler, and traffic together.

use crate::config::ScenarioConfig;
use crate::energy::consumption::InterpolatedConsumptionModel;
use crate::energy::node::{EnergyNode, RadioHandle};
use crate::energy::radio::{Mode, RadioEnergyModel};
use crate::energy::source::{EnergySource, SourceEvent};
use crate::telemetry::TelemetryRow;

use super::report::EnergyReport;
use super::scheduler::{Event, Scheduler};
use super::script::{PeriodicTraffic, TransitionScript, TransitionStep};
use super::time::SimTime;

/// Everything a finished run produced.
pub struct RunResult {
    /// One sample per dispatched event plus a final sample at the stop time.
    pub samples: Vec<TelemetryRow>,
    /// Source notifications in dispatch order.
    pub events: Vec<(SimTime, SourceEvent)>,
    /// Post-run summary.
    pub report: EnergyReport,
}

/// Simulation engine owning the energy node, the scheduler, and the traffic
/// script.
///
/// The engine is the single owner through which every mutation flows, which
/// serializes all accounting per the single-threaded dispatch model.
pub struct Engine {
    node: EnergyNode,
    radio: RadioHandle,
    scheduler: Scheduler,
    script: TransitionScript,
}

impl Engine {
    /// Builds an engine from a validated scenario configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration fails validation; callers run
    /// [`ScenarioConfig::validate`] first and report the field errors.
    pub fn new(config: &ScenarioConfig) -> Self {
        let errors = config.validate();
        assert!(errors.is_empty(), "invalid scenario configuration: {errors:?}");

        let stop = SimTime::from_secs_f64(config.simulation.stop_time_s);
        let src = &config.source;
        let source = EnergySource::new(
            src.initial_energy_j,
            src.initial_charge_mah,
            src.supply_voltage_v,
            src.low_battery_threshold,
            src.high_battery_threshold,
            SimTime::from_secs_f64(src.update_interval_s),
        );

        let r = &config.radio;
        let mut radio_model = RadioEnergyModel::new(
            r.tx_current_a,
            r.rx_current_a,
            r.standby_current_a,
            r.sleep_current_a,
        );
        if config.consumption.enabled {
            radio_model.set_consumption_model(InterpolatedConsumptionModel::new(
                config.consumption.power_dbm.clone(),
                config.consumption.current_ma.clone(),
            ));
        }

        let mut node = EnergyNode::new(source);
        let radio = node.attach(radio_model);

        let script = config.traffic.build_script(stop, config.simulation.seed);

        Self {
            node,
            radio,
            scheduler: Scheduler::new(stop),
            script,
        }
    }

    /// Runs the simulation to the stop time and returns the results.
    ///
    /// Dispatch order per event: scripted transitions run the full
    /// notification sequence (close interval, refresh source, commit mode);
    /// periodic refresh events re-integrate the standing draw. At the stop
    /// time every radio's open interval is closed, the source refreshed one
    /// last time, and the pending periodic event cancelled before the
    /// scheduler is marked finished.
    pub fn run(&mut self) -> RunResult {
        self.node.start(&mut self.scheduler);
        for step in self.script.steps().to_vec() {
            self.scheduler.schedule(
                step.at,
                Event::Transition {
                    radio: self.radio,
                    mode: step.mode,
                    power_dbm: step.power_dbm,
                },
            );
        }

        let mut samples = Vec::new();
        while let Some((now, event)) = self.scheduler.pop_next() {
            let kind = match event {
                Event::Refresh => {
                    self.node.refresh(now, &mut self.scheduler);
                    "refresh"
                }
                Event::Transition {
                    radio,
                    mode,
                    power_dbm,
                } => {
                    self.dispatch_transition(radio, mode, power_dbm, now);
                    "transition"
                }
            };
            samples.push(self.sample(now, kind));
        }

        let stop = self.scheduler.stop_at();
        self.node.finalize(stop, &mut self.scheduler);
        self.node.shutdown(&mut self.scheduler);
        self.scheduler.finish();
        samples.push(self.sample(stop, "final"));

        RunResult {
            samples,
            events: self.node.events().to_vec(),
            report: EnergyReport::from_node(&self.node, self.radio),
        }
    }

    fn dispatch_transition(
        &mut self,
        radio: RadioHandle,
        mode: Mode,
        power_dbm: Option<f64>,
        now: SimTime,
    ) {
        match mode {
            Mode::Transmit => {
                // Script validation guarantees the power value.
                let power = power_dbm.expect("transmit step without power");
                self.node
                    .notify_transmit_start(radio, power, now, &mut self.scheduler);
            }
            Mode::Receive => self.node.notify_receive_start(radio, now, &mut self.scheduler),
            Mode::Standby => self.node.notify_standby(radio, now, &mut self.scheduler),
            Mode::Sleep => self.node.notify_sleep(radio, now, &mut self.scheduler),
        }
    }

    fn sample(&self, time: SimTime, kind: &'static str) -> TelemetryRow {
        let radio = self.node.radio(self.radio);
        let source = self.node.source();
        TelemetryRow {
            time_s: time.as_secs_f64(),
            kind,
            mode: radio.mode(),
            current_a: radio.current_a(),
            remaining_j: source.remaining_energy_j(),
            remaining_mah: source.remaining_charge_mah(),
            fraction: source.energy_fraction(),
            total_consumed_j: radio.total_energy_consumed_j(),
            depleted: source.is_depleted(),
        }
    }

    /// The energy node (for post-run inspection).
    pub fn node(&self) -> &EnergyNode {
        &self.node
    }

    /// Handle of the configured radio.
    pub fn radio(&self) -> RadioHandle {
        self.radio
    }

    /// The traffic script the run will dispatch.
    pub fn script(&self) -> &[TransitionStep] {
        self.script.steps()
    }
}

/// Builds the traffic script for one run. Implemented on the config type so
/// the engine stays free of traffic-model string matching.
impl crate::config::TrafficConfig {
    pub(crate) fn build_script(&self, stop: SimTime, seed: u64) -> TransitionScript {
        match self.model.as_str() {
            "periodic" => PeriodicTraffic::new(
                self.period_s,
                self.wakeup_s,
                self.airtime_s,
                self.rx_window_s,
                self.tx_power_dbm,
                self.jitter_std_s,
            )
            .script(stop, seed),
            _ => {
                let steps = self
                    .step
                    .iter()
                    .map(|s| TransitionStep {
                        at: SimTime::from_secs_f64(s.at_s),
                        mode: s.mode.parse().expect("validated mode"),
                        power_dbm: s.power_dbm,
                    })
                    .collect();
                TransitionScript::new(steps)
            }
        }
    }
}
