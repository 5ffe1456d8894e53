//! Alert notifications raised by the speech timer.
//!
//! The timer never plays sounds itself. It tells an [`AlertSink`] that
//! something happened and the sink decides what to do about it. Sink methods
//! are called while the timer holds its lock, so they must return quickly
//! and must not call back into the timer.

use tokio::sync::mpsc::UnboundedSender;

use crate::debate_format::BellInfo;
use crate::period::PeriodInfo;

/// Receiver of timer alerts.
pub trait AlertSink: Send + Sync {
    /// The timer started running in the given period.
    fn make_active(&self, period: &PeriodInfo);

    /// The timer stopped.
    fn make_inactive(&self);

    /// A scheduled bell rang; `period` is the period now in effect.
    fn bell_triggered(&self, bell: &BellInfo, period: &PeriodInfo);

    /// An overtime bell is due at `time` seconds into the speech.
    fn overtime_bell(&self, time: u64);

    /// A pause-on-bell stopped the timer and the user should be told.
    fn wake_for_pause(&self);
}

/// Alert sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAlerts;

impl AlertSink for NoAlerts {
    fn make_active(&self, _period: &PeriodInfo) {}
    fn make_inactive(&self) {}
    fn bell_triggered(&self, _bell: &BellInfo, _period: &PeriodInfo) {}
    fn overtime_bell(&self, _time: u64) {}
    fn wake_for_pause(&self) {}
}

/// Owned form of an alert, for forwarding across tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    Active { period: PeriodInfo },
    Inactive,
    Bell { time: u64, pause_on_bell: bool, period: PeriodInfo },
    OvertimeBell { time: u64 },
    WakeForPause,
}

/// Forwards alerts over an unbounded channel. Sending never blocks; alerts
/// raised after the receiver is dropped are discarded.
impl AlertSink for UnboundedSender<AlertEvent> {
    fn make_active(&self, period: &PeriodInfo) {
        let _ = self.send(AlertEvent::Active {
            period: period.clone(),
        });
    }

    fn make_inactive(&self) {
        let _ = self.send(AlertEvent::Inactive);
    }

    fn bell_triggered(&self, bell: &BellInfo, period: &PeriodInfo) {
        let _ = self.send(AlertEvent::Bell {
            time: bell.time(),
            pause_on_bell: bell.is_pause_on_bell(),
            period: period.clone(),
        });
    }

    fn overtime_bell(&self, time: u64) {
        let _ = self.send(AlertEvent::OvertimeBell { time });
    }

    fn wake_for_pause(&self) {
        let _ = self.send(AlertEvent::WakeForPause);
    }
}
