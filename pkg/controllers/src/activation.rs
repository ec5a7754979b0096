//! Activation gate with cooldown debouncing.
//!
//! `Inactive → Active` happens on the first active observation.
//! `Active → Inactive` happens only once no trigger has been active for the
//! full cooldown period, measured from the last active observation.

use chrono::{DateTime, Duration, Utc};
use pkg_types::scaledobject::ScaledObjectStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Replica target pinned to the configured minimum
    Inactive,
    /// Replica target computed from metrics
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
    /// Active, inactive readings seen, cooldown not yet elapsed
    CoolingDown,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ActivationDecider {
    cooldown: Duration,
    state: Activation,
    last_active_time: Option<DateTime<Utc>>,
}

impl ActivationDecider {
    /// A fresh object starts inactive.
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs.min(u64::from(u32::MAX)) as i64),
            state: Activation::Inactive,
            last_active_time: None,
        }
    }

    /// Rebuild the gate from a persisted status so a restart neither drops an
    /// active object early nor forgets the cooldown window.
    pub fn restore(cooldown_secs: u64, status: &ScaledObjectStatus) -> Self {
        let mut decider = Self::new(cooldown_secs);
        decider.last_active_time = status.last_active_time;
        if status.is_active {
            decider.state = Activation::Active;
        }
        decider
    }

    pub fn is_active(&self) -> bool {
        self.state == Activation::Active
    }

    pub fn last_active_time(&self) -> Option<DateTime<Utc>> {
        self.last_active_time
    }

    /// Feed one aggregated activity observation taken at `now`.
    pub fn observe(&mut self, is_active: bool, now: DateTime<Utc>) -> Transition {
        if is_active {
            self.last_active_time = Some(now);
            return match self.state {
                Activation::Inactive => {
                    self.state = Activation::Active;
                    Transition::Activated
                }
                Activation::Active => Transition::Unchanged,
            };
        }

        match self.state {
            Activation::Inactive => Transition::Unchanged,
            Activation::Active => {
                let last = *self.last_active_time.get_or_insert(now);
                if now - last >= self.cooldown {
                    self.state = Activation::Inactive;
                    Transition::Deactivated
                } else {
                    Transition::CoolingDown
                }
            }
        }
    }
}
