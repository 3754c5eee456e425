//! Single-owner mediator binding an energy source to its attached radios.

use crate::sim::scheduler::{Event, EventHandle, Scheduler};
use crate::sim::time::SimTime;

use super::radio::{Mode, RadioEnergyModel};
use super::source::{EnergySource, SourceEvent};

/// Identifies a radio attached to an [`EnergyNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RadioHandle(usize);

impl RadioHandle {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

/// Observer invoked for every source notification, with its timestamp.
pub type SourceObserver = Box<dyn FnMut(SimTime, SourceEvent)>;

/// One battery and the radios it powers.
///
/// All mutation of the source and its radios runs through this owner, which
/// serializes the accounting order the model depends on: a state-change
/// notification first closes the outgoing mode's interval, then refreshes
/// the source (so the freshly consumed energy is included), and only then
/// commits the new mode, gated on the depleted flag.
///
/// The node also owns the source's periodic refresh: each refresh cancels
/// the outstanding timer event and schedules the next one, so event-driven
/// and periodic updates never double-count an interval.
pub struct EnergyNode {
    source: EnergySource,
    radios: Vec<RadioEnergyModel>,
    pending_refresh: Option<EventHandle>,
    observer: Option<SourceObserver>,
    events: Vec<(SimTime, SourceEvent)>,
}

impl EnergyNode {
    /// Creates a node around an energy source with no radios attached.
    pub fn new(source: EnergySource) -> Self {
        Self {
            source,
            radios: Vec::new(),
            pending_refresh: None,
            observer: None,
            events: Vec::new(),
        }
    }

    /// Attaches a radio; its current draw is summed into every refresh.
    pub fn attach(&mut self, radio: RadioEnergyModel) -> RadioHandle {
        self.radios.push(radio);
        RadioHandle::from_index(self.radios.len() - 1)
    }

    /// Registers an observer for source notifications. Without one the
    /// notifications are only recorded in [`EnergyNode::events`].
    pub fn set_observer(&mut self, observer: impl FnMut(SimTime, SourceEvent) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Seeds the first refresh and the periodic update timer.
    pub fn start(&mut self, sched: &mut Scheduler) {
        self.refresh(sched.now(), sched);
    }

    /// Radio enters transmit at the given power.
    ///
    /// The transmit current is re-derived from the consumption model (when
    /// attached) before the outgoing interval is closed.
    pub fn notify_transmit_start(
        &mut self,
        radio: RadioHandle,
        power_dbm: f64,
        now: SimTime,
        sched: &mut Scheduler,
    ) {
        self.radios[radio.index()].update_tx_current(power_dbm);
        self.transition(radio, Mode::Transmit, now, sched);
    }

    /// Radio enters receive.
    pub fn notify_receive_start(&mut self, radio: RadioHandle, now: SimTime, sched: &mut Scheduler) {
        self.transition(radio, Mode::Receive, now, sched);
    }

    /// Radio enters standby.
    pub fn notify_standby(&mut self, radio: RadioHandle, now: SimTime, sched: &mut Scheduler) {
        self.transition(radio, Mode::Standby, now, sched);
    }

    /// Radio enters sleep.
    pub fn notify_sleep(&mut self, radio: RadioHandle, now: SimTime, sched: &mut Scheduler) {
        self.transition(radio, Mode::Sleep, now, sched);
    }

    fn transition(&mut self, radio: RadioHandle, mode: Mode, now: SimTime, sched: &mut Scheduler) {
        let supply_voltage_v = self.source.supply_voltage_v();
        self.radios[radio.index()].account_until(now, supply_voltage_v);
        self.refresh(now, sched);
        let depleted = self.source.is_depleted();
        self.radios[radio.index()].enter_mode(mode, depleted);
    }

    /// Refreshes the source against the summed draw of all attached radios
    /// and reschedules the periodic update.
    ///
    /// A no-op once the scheduler has finished, so teardown never schedules
    /// work past the end of the run.
    pub fn refresh(&mut self, now: SimTime, sched: &mut Scheduler) {
        if sched.finished() {
            return;
        }
        if let Some(handle) = self.pending_refresh.take() {
            sched.cancel(handle);
        }

        let total_current_a: f64 = self.radios.iter().map(RadioEnergyModel::current_a).sum();
        if let Some(event) = self.source.refresh(now, total_current_a) {
            if let Some(observer) = &mut self.observer {
                observer(now, event);
            }
            self.events.push((now, event));
        }

        let next = now + self.source.update_interval();
        self.pending_refresh = Some(sched.schedule(next, Event::Refresh));
    }

    /// Deposits harvested energy and immediately re-evaluates hysteresis.
    pub fn recharge(&mut self, energy_j: f64, now: SimTime, sched: &mut Scheduler) {
        self.source.recharge(energy_j);
        self.refresh(now, sched);
    }

    /// Closes every radio's running interval at `now` and refreshes the
    /// source one final time. Called by the engine at the stop time.
    pub fn finalize(&mut self, now: SimTime, sched: &mut Scheduler) {
        let supply_voltage_v = self.source.supply_voltage_v();
        for radio in &mut self.radios {
            radio.account_until(now, supply_voltage_v);
        }
        self.refresh(now, sched);
    }

    /// Cancels the outstanding periodic refresh. Idempotent; part of the
    /// teardown obligation on every exit path.
    pub fn shutdown(&mut self, sched: &mut Scheduler) {
        if let Some(handle) = self.pending_refresh.take() {
            sched.cancel(handle);
        }
    }

    /// Remaining energy in joules, refreshed to the scheduler's clock.
    pub fn remaining_energy_j(&mut self, sched: &mut Scheduler) -> f64 {
        self.refresh(sched.now(), sched);
        self.source.remaining_energy_j()
    }

    /// Remaining charge in mAh, refreshed to the scheduler's clock.
    pub fn remaining_charge_mah(&mut self, sched: &mut Scheduler) -> f64 {
        self.refresh(sched.now(), sched);
        self.source.remaining_charge_mah()
    }

    /// Remaining energy fraction, refreshed to the scheduler's clock.
    pub fn energy_fraction(&mut self, sched: &mut Scheduler) -> f64 {
        self.refresh(sched.now(), sched);
        self.source.energy_fraction()
    }

    /// The energy source, without triggering a refresh.
    pub fn source(&self) -> &EnergySource {
        &self.source
    }

    /// An attached radio, without triggering a refresh.
    pub fn radio(&self, handle: RadioHandle) -> &RadioEnergyModel {
        &self.radios[handle.index()]
    }

    /// Mutable access to an attached radio (setup only).
    pub fn radio_mut(&mut self, handle: RadioHandle) -> &mut RadioEnergyModel {
        &mut self.radios[handle.index()]
    }

    /// Source notifications recorded so far, in dispatch order.
    pub fn events(&self) -> &[(SimTime, SourceEvent)] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::EnergyNode;
    use crate::energy::radio::{Mode, RadioEnergyModel};
    use crate::energy::source::{EnergySource, SourceEvent};
    use crate::sim::scheduler::Scheduler;
    use crate::sim::time::SimTime;

    fn secs(s: f64) -> SimTime {
        SimTime::from_secs_f64(s)
    }

    fn test_source() -> EnergySource {
        EnergySource::new(5.55, 1500.0, 3.7, 0.10, 0.15, secs(1.0))
    }

    fn test_radio() -> RadioEnergyModel {
        RadioEnergyModel::with_default_currents()
    }

    #[test]
    fn transition_accounts_before_refreshing_the_source() {
        let mut sched = Scheduler::new(secs(100.0));
        let mut node = EnergyNode::new(test_source());
        let radio = node.attach(test_radio());
        node.start(&mut sched);

        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);
        node.notify_receive_start(radio, secs(1.0), &mut sched);

        // The 1 s transmit interval is in both the radio bucket and the
        // source's remaining energy after the same notification.
        let consumed = 0.0435 * 3.7;
        assert!((node.radio(radio).tx_energy_j() - consumed).abs() < 1e-12);
        assert!((node.source().remaining_energy_j() - (5.55 - consumed)).abs() < 1e-12);
        assert_eq!(node.radio(radio).mode(), Mode::Receive);
    }

    #[test]
    fn reads_are_idempotent_without_time_advance() {
        let mut sched = Scheduler::new(secs(100.0));
        let mut node = EnergyNode::new(test_source());
        let radio = node.attach(test_radio());
        node.start(&mut sched);
        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);

        let first = node.remaining_energy_j(&mut sched);
        let second = node.remaining_energy_j(&mut sched);
        assert_eq!(first, second);
    }

    #[test]
    fn multiple_radios_sum_their_currents() {
        let mut sched = Scheduler::new(secs(100.0));
        let mut node = EnergyNode::new(EnergySource::new(
            100.0,
            1500.0,
            1.0,
            0.10,
            0.15,
            secs(1.0),
        ));
        let a = node.attach(RadioEnergyModel::new(0.5, 0.5, 0.5, 0.5));
        let b = node.attach(RadioEnergyModel::new(0.25, 0.25, 0.25, 0.25));
        node.start(&mut sched);

        node.refresh(secs(2.0), &mut sched);
        // (0.5 + 0.25) A * 1 V * 2 s = 1.5 J
        assert!((node.source().remaining_energy_j() - 98.5).abs() < 1e-12);
        let _ = (a, b);
    }

    #[test]
    fn depletion_freezes_mode_but_keeps_accounting() {
        let mut sched = Scheduler::new(secs(100.0));
        // 1 J at 1 V: a 1 A transmit depletes the source fast.
        let mut node = EnergyNode::new(EnergySource::new(1.0, 270.0, 1.0, 0.10, 0.15, secs(1.0)));
        let radio = node.attach(RadioEnergyModel::new(1.0, 0.1, 0.01, 1e-6));
        node.start(&mut sched);

        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);
        // 2 s of 1 A at 1 V drains 2 J > 1 J: the source is depleted, so
        // the requested switch to receive is suppressed.
        node.notify_receive_start(radio, secs(2.0), &mut sched);
        assert!(node.source().is_depleted());
        assert_eq!(node.radio(radio).mode(), Mode::Transmit);
        assert_eq!(node.radio(radio).total_tx_time(), secs(2.0));

        // Accounting still runs while frozen.
        node.notify_sleep(radio, secs(3.0), &mut sched);
        assert_eq!(node.radio(radio).mode(), Mode::Transmit);
        assert_eq!(node.radio(radio).total_tx_time(), secs(3.0));
    }

    #[test]
    fn depleted_notification_is_edge_triggered() {
        let mut sched = Scheduler::new(secs(100.0));
        let mut node = EnergyNode::new(EnergySource::new(1.0, 270.0, 1.0, 0.10, 0.15, secs(1.0)));
        let radio = node.attach(RadioEnergyModel::new(1.0, 0.1, 0.01, 1e-6));
        node.start(&mut sched);
        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);

        for step in 1..=5 {
            node.refresh(secs(step as f64), &mut sched);
        }
        let depletions = node
            .events()
            .iter()
            .filter(|(_, e)| *e == SourceEvent::Depleted)
            .count();
        assert_eq!(depletions, 1);
    }

    #[test]
    fn observer_sees_recorded_events() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut sched = Scheduler::new(secs(100.0));
        let mut node = EnergyNode::new(test_source());
        let radio = node.attach(test_radio());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        node.set_observer(move |at, event| sink.borrow_mut().push((at, event)));
        node.start(&mut sched);

        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);
        node.notify_receive_start(radio, secs(1.0), &mut sched);

        assert_eq!(seen.borrow().as_slice(), node.events());
        assert!(!seen.borrow().is_empty());
    }

    #[test]
    fn refresh_after_finish_is_a_no_op() {
        let mut sched = Scheduler::new(secs(10.0));
        let mut node = EnergyNode::new(test_source());
        let radio = node.attach(test_radio());
        node.start(&mut sched);
        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);

        node.shutdown(&mut sched);
        sched.finish();

        let before = node.source().remaining_energy_j();
        node.refresh(secs(10.0), &mut sched);
        assert_eq!(node.source().remaining_energy_j(), before);
        assert_eq!(node.remaining_energy_j(&mut sched), before);
    }

    #[test]
    fn recharge_raises_recharged_through_refresh() {
        let mut sched = Scheduler::new(secs(100.0));
        let mut node = EnergyNode::new(EnergySource::new(10.0, 2700.0, 1.0, 0.10, 0.15, secs(1.0)));
        let radio = node.attach(RadioEnergyModel::new(9.0, 0.1, 0.01, 1e-6));
        node.start(&mut sched);
        node.notify_transmit_start(radio, 14.0, secs(0.0), &mut sched);

        // One second of 9 A at 1 V drains to exactly the low threshold.
        node.refresh(secs(1.0), &mut sched);
        assert!(node.source().is_depleted());

        node.recharge(5.0, secs(1.0), &mut sched);
        assert!(!node.source().is_depleted());
        assert_eq!(
            node.events().last().map(|(_, e)| *e),
            Some(SourceEvent::Recharged)
        );
    }
}
