//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::energy::radio::{
    Mode, RX_CURRENT_DEFAULT_A, SLEEP_CURRENT_DEFAULT_A, STANDBY_CURRENT_DEFAULT_A,
    TX_CURRENT_DEFAULT_A,
};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Energy source parameters.
    #[serde(default)]
    pub source: SourceConfig,
    /// Radio per-mode supply currents.
    #[serde(default)]
    pub radio: RadioConfig,
    /// Transmit consumption calibration table.
    #[serde(default)]
    pub consumption: ConsumptionConfig,
    /// Traffic model driving mode transitions.
    #[serde(default)]
    pub traffic: TrafficConfig,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated run length in seconds (must be > 0).
    pub stop_time_s: f64,
    /// Master random seed for generated traffic.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            stop_time_s: 5.5,
            seed: 42,
        }
    }
}

/// Energy source parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Initial stored energy (J, >= 0).
    pub initial_energy_j: f64,
    /// Initial stored charge (mAh, >= 0).
    pub initial_charge_mah: f64,
    /// Supply voltage (V, > 0).
    pub supply_voltage_v: f64,
    /// Depletion threshold as a fraction of initial energy.
    pub low_battery_threshold: f64,
    /// Recharge threshold as a fraction of initial energy.
    pub high_battery_threshold: f64,
    /// Periodic refresh cadence (s, > 0).
    pub update_interval_s: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            initial_energy_j: 5.55,
            initial_charge_mah: 1500.0,
            supply_voltage_v: 3.7,
            low_battery_threshold: 0.10,
            high_battery_threshold: 0.15,
            update_interval_s: 1.0,
        }
    }
}

/// Radio per-mode supply currents in amperes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    /// Transmit current (A, >= 0); replaced per-transmission when a
    /// consumption table is enabled.
    pub tx_current_a: f64,
    /// Receive current (A, >= 0).
    pub rx_current_a: f64,
    /// Standby current (A, >= 0).
    pub standby_current_a: f64,
    /// Sleep current (A, >= 0).
    pub sleep_current_a: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            tx_current_a: TX_CURRENT_DEFAULT_A,
            rx_current_a: RX_CURRENT_DEFAULT_A,
            standby_current_a: STANDBY_CURRENT_DEFAULT_A,
            sleep_current_a: SLEEP_CURRENT_DEFAULT_A,
        }
    }
}

/// Transmit consumption calibration table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumptionConfig {
    /// Whether transmit current is derived from the table.
    pub enabled: bool,
    /// Calibrated transmit powers (dBm, strictly increasing).
    pub power_dbm: Vec<f64>,
    /// Calibrated currents (mA), parallel to `power_dbm`.
    pub current_ma: Vec<f64>,
}

impl Default for ConsumptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            power_dbm: vec![7.0, 13.0, 17.0, 20.0],
            current_ma: vec![18.0, 28.0, 90.0, 125.0],
        }
    }
}

/// One scripted mode transition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrafficStepConfig {
    /// Dispatch time (s, >= 0, non-decreasing across steps).
    pub at_s: f64,
    /// Target mode: `transmit`, `receive`, `standby`, or `sleep`.
    pub mode: String,
    /// Transmit power (dBm); required on transmit steps, forbidden
    /// elsewhere.
    pub power_dbm: Option<f64>,
}

/// Traffic model driving mode transitions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficConfig {
    /// Traffic model: `"script"` or `"periodic"`.
    pub model: String,
    /// Explicit transitions for the script model.
    pub step: Vec<TrafficStepConfig>,
    /// Uplink period for the periodic model (s, > 0).
    pub period_s: f64,
    /// Standby lead time before each transmission (s, >= 0).
    pub wakeup_s: f64,
    /// Transmission airtime (s, >= 0).
    pub airtime_s: f64,
    /// Receive window after each transmission (s, >= 0).
    pub rx_window_s: f64,
    /// Transmit power for the periodic model (dBm).
    pub tx_power_dbm: f64,
    /// Gaussian jitter on cycle starts (s, >= 0).
    pub jitter_std_s: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            model: "script".to_string(),
            step: vec![
                TrafficStepConfig {
                    at_s: 0.0,
                    mode: "transmit".to_string(),
                    power_dbm: Some(14.0),
                },
                TrafficStepConfig {
                    at_s: 1.0,
                    mode: "receive".to_string(),
                    power_dbm: None,
                },
                TrafficStepConfig {
                    at_s: 2.25,
                    mode: "standby".to_string(),
                    power_dbm: None,
                },
                TrafficStepConfig {
                    at_s: 3.75,
                    mode: "sleep".to_string(),
                    power_dbm: None,
                },
            ],
            period_s: 10.0,
            wakeup_s: 0.05,
            airtime_s: 1.0,
            rx_window_s: 1.2,
            tx_power_dbm: 14.0,
            jitter_std_s: 0.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"source.supply_voltage_v"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one transmission, a receive window,
    /// standby, then sleep, on a fully charged 5.55 J source.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            source: SourceConfig::default(),
            radio: RadioConfig::default(),
            consumption: ConsumptionConfig::default(),
            traffic: TrafficConfig::default(),
        }
    }

    /// Returns the duty-cycle preset: periodic uplinks with jittered cycle
    /// starts over a ten-minute run.
    pub fn duty_cycle() -> Self {
        Self {
            simulation: SimulationConfig {
                stop_time_s: 600.0,
                ..SimulationConfig::default()
            },
            source: SourceConfig {
                // Sized so a ten-minute duty cycle stays well above the
                // low-battery threshold.
                initial_energy_j: 50.0,
                initial_charge_mah: 13500.0,
                ..SourceConfig::default()
            },
            traffic: TrafficConfig {
                model: "periodic".to_string(),
                period_s: 10.0,
                wakeup_s: 0.05,
                airtime_s: 1.0,
                rx_window_s: 1.2,
                tx_power_dbm: 14.0,
                jitter_std_s: 0.2,
                ..TrafficConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the depletion preset: an undersized source drained by a
    /// long high-power transmission.
    pub fn depletion() -> Self {
        Self {
            simulation: SimulationConfig {
                stop_time_s: 10.0,
                ..SimulationConfig::default()
            },
            source: SourceConfig {
                initial_energy_j: 2.0,
                initial_charge_mah: 540.0,
                ..SourceConfig::default()
            },
            traffic: TrafficConfig {
                step: vec![
                    TrafficStepConfig {
                        at_s: 0.0,
                        mode: "standby".to_string(),
                        power_dbm: None,
                    },
                    TrafficStepConfig {
                        at_s: 0.5,
                        mode: "transmit".to_string(),
                        power_dbm: Some(17.0),
                    },
                ],
                ..TrafficConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "duty_cycle", "depletion"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "duty_cycle" => Ok(Self::duty_cycle()),
            "depletion" => Ok(Self::depletion()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is
    /// invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown
    /// fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let sim = &self.simulation;
        if !(sim.stop_time_s > 0.0 && sim.stop_time_s.is_finite()) {
            errors.push(ConfigError {
                field: "simulation.stop_time_s".into(),
                message: "must be > 0".into(),
            });
        }

        let src = &self.source;
        if !(src.initial_energy_j >= 0.0 && src.initial_energy_j.is_finite()) {
            errors.push(ConfigError {
                field: "source.initial_energy_j".into(),
                message: "must be >= 0".into(),
            });
        }
        if !(src.initial_charge_mah >= 0.0 && src.initial_charge_mah.is_finite()) {
            errors.push(ConfigError {
                field: "source.initial_charge_mah".into(),
                message: "must be >= 0".into(),
            });
        }
        if !(src.supply_voltage_v > 0.0 && src.supply_voltage_v.is_finite()) {
            errors.push(ConfigError {
                field: "source.supply_voltage_v".into(),
                message: "must be > 0".into(),
            });
        }
        if !(src.low_battery_threshold > 0.0
            && src.low_battery_threshold < src.high_battery_threshold)
        {
            errors.push(ConfigError {
                field: "source.low_battery_threshold".into(),
                message: "must satisfy 0 < low < high".into(),
            });
        }
        if !(src.high_battery_threshold <= 1.0) {
            errors.push(ConfigError {
                field: "source.high_battery_threshold".into(),
                message: "must be <= 1".into(),
            });
        }
        if !(src.update_interval_s > 0.0 && src.update_interval_s.is_finite()) {
            errors.push(ConfigError {
                field: "source.update_interval_s".into(),
                message: "must be > 0".into(),
            });
        }

        let radio = &self.radio;
        for (field, current) in [
            ("radio.tx_current_a", radio.tx_current_a),
            ("radio.rx_current_a", radio.rx_current_a),
            ("radio.standby_current_a", radio.standby_current_a),
            ("radio.sleep_current_a", radio.sleep_current_a),
        ] {
            if !(current >= 0.0 && current.is_finite()) {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be >= 0".into(),
                });
            }
        }

        let table_span = self.validate_consumption(&mut errors);
        self.validate_traffic(table_span, &mut errors);

        errors
    }

    /// Checks the calibration table; returns its power span when usable.
    fn validate_consumption(&self, errors: &mut Vec<ConfigError>) -> Option<(f64, f64)> {
        let c = &self.consumption;
        if !c.enabled {
            return None;
        }

        let mut ok = true;
        if c.power_dbm.len() != c.current_ma.len() {
            errors.push(ConfigError {
                field: "consumption.current_ma".into(),
                message: "must have the same length as consumption.power_dbm".into(),
            });
            ok = false;
        }
        if c.power_dbm.len() < 2 {
            errors.push(ConfigError {
                field: "consumption.power_dbm".into(),
                message: "needs at least two calibration points".into(),
            });
            ok = false;
        }
        if !c.power_dbm.windows(2).all(|w| w[0] < w[1]) {
            errors.push(ConfigError {
                field: "consumption.power_dbm".into(),
                message: "must be strictly increasing".into(),
            });
            ok = false;
        }
        if !c.current_ma.iter().all(|v| v.is_finite() && *v >= 0.0) {
            errors.push(ConfigError {
                field: "consumption.current_ma".into(),
                message: "must be finite and >= 0".into(),
            });
            ok = false;
        }

        if ok {
            Some((c.power_dbm[0], c.power_dbm[c.power_dbm.len() - 1]))
        } else {
            None
        }
    }

    fn validate_traffic(&self, table_span: Option<(f64, f64)>, errors: &mut Vec<ConfigError>) {
        let t = &self.traffic;
        let power_in_span = |power: f64| match table_span {
            Some((lo, hi)) => power >= lo && power <= hi,
            None => true,
        };

        match t.model.as_str() {
            "script" => {
                let mut last_at = 0.0_f64;
                for (i, step) in t.step.iter().enumerate() {
                    let path = format!("traffic.step[{i}]");
                    if !(step.at_s >= 0.0 && step.at_s.is_finite()) {
                        errors.push(ConfigError {
                            field: format!("{path}.at_s"),
                            message: "must be >= 0".into(),
                        });
                    } else if step.at_s < last_at {
                        errors.push(ConfigError {
                            field: format!("{path}.at_s"),
                            message: "must be non-decreasing".into(),
                        });
                    } else {
                        last_at = step.at_s;
                    }

                    match step.mode.parse::<Mode>() {
                        Ok(Mode::Transmit) => match step.power_dbm {
                            None => errors.push(ConfigError {
                                field: format!("{path}.power_dbm"),
                                message: "required on transmit steps".into(),
                            }),
                            Some(power) if !power_in_span(power) => {
                                errors.push(ConfigError {
                                    field: format!("{path}.power_dbm"),
                                    message: "outside the consumption table span".into(),
                                });
                            }
                            Some(_) => {}
                        },
                        Ok(_) => {
                            if step.power_dbm.is_some() {
                                errors.push(ConfigError {
                                    field: format!("{path}.power_dbm"),
                                    message: "only valid on transmit steps".into(),
                                });
                            }
                        }
                        Err(message) => errors.push(ConfigError {
                            field: format!("{path}.mode"),
                            message,
                        }),
                    }
                }
            }
            "periodic" => {
                if !(t.period_s > 0.0 && t.period_s.is_finite()) {
                    errors.push(ConfigError {
                        field: "traffic.period_s".into(),
                        message: "must be > 0".into(),
                    });
                }
                for (field, value) in [
                    ("traffic.wakeup_s", t.wakeup_s),
                    ("traffic.airtime_s", t.airtime_s),
                    ("traffic.rx_window_s", t.rx_window_s),
                    ("traffic.jitter_std_s", t.jitter_std_s),
                ] {
                    if !(value >= 0.0 && value.is_finite()) {
                        errors.push(ConfigError {
                            field: field.into(),
                            message: "must be >= 0".into(),
                        });
                    }
                }
                if t.period_s > 0.0
                    && t.wakeup_s + t.airtime_s + t.rx_window_s > t.period_s / 2.0
                {
                    errors.push(ConfigError {
                        field: "traffic.period_s".into(),
                        message: "active part of the cycle must fit in half the period".into(),
                    });
                }
                if !power_in_span(t.tx_power_dbm) {
                    errors.push(ConfigError {
                        field: "traffic.tx_power_dbm".into(),
                        message: "outside the consumption table span".into(),
                    });
                }
            }
            other => errors.push(ConfigError {
                field: "traffic.model".into(),
                message: format!("must be \"script\" or \"periodic\", got \"{other}\""),
            }),
        }
    }
}
