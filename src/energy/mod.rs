//! Energy accounting components for battery-powered radios.

/// Transmit-power to current-draw interpolation.
pub mod consumption;
/// Mediator binding one source to its attached radios.
pub mod node;
/// Per-radio mode state machine and accumulators.
pub mod radio;
/// Linear battery with depletion/recharge hysteresis.
pub mod source;

// Re-export the main types for convenience
pub use consumption::InterpolatedConsumptionModel;
pub use node::EnergyNode;
pub use node::RadioHandle;
pub use radio::Mode;
pub use radio::RadioEnergyModel;
pub use source::EnergySource;
pub use source::SourceEvent;
