//! Period descriptors.
//!
//! A period is the named, coloured stretch of a speech between two bells
//! (e.g. "Points of information allowed"). The timer owns exactly one
//! current `PeriodInfo` and replaces it whenever a bell rings.

use crate::state_store::StateBundle;

const SUFFIX_DESCRIPTION: &str = ".description";
const SUFFIX_BACKGROUND_COLOR: &str = ".background_color";
const SUFFIX_PAUSE_ON_BELL: &str = ".pause_on_bell";

/// Display information for the period in effect at some point of a speech.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodInfo {
    /// Text shown to the user, e.g. "Warning bell rung".
    pub description: Option<String>,
    /// Background colour as ARGB.
    pub background_color: Option<u32>,
    /// Whether the bell that started this period paused the timer.
    pub pause_on_bell: bool,
}

impl PeriodInfo {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            background_color: None,
            pause_on_bell: false,
        }
    }

    pub fn with_background_color(mut self, argb: u32) -> Self {
        self.background_color = Some(argb);
        self
    }

    /// Returns the period that results when a bell introducing `next` rings
    /// during this one. Fields `next` leaves unset carry over; the pause
    /// indicator is taken from the bell.
    pub fn followed_by(&self, next: &PeriodInfo, pause_on_bell: bool) -> PeriodInfo {
        PeriodInfo {
            description: next
                .description
                .clone()
                .or_else(|| self.description.clone()),
            background_color: next.background_color.or(self.background_color),
            pause_on_bell,
        }
    }

    pub fn save_state(&self, key: &str, bundle: &mut StateBundle) {
        let description_key = format!("{key}{SUFFIX_DESCRIPTION}");
        match &self.description {
            Some(description) => bundle.put_str(description_key, description.as_str()),
            None => {
                bundle.remove(&description_key);
            }
        }

        let color_key = format!("{key}{SUFFIX_BACKGROUND_COLOR}");
        match self.background_color {
            Some(color) => bundle.put_u64(color_key, u64::from(color)),
            None => {
                bundle.remove(&color_key);
            }
        }

        bundle.put_bool(format!("{key}{SUFFIX_PAUSE_ON_BELL}"), self.pause_on_bell);
    }

    /// Restore from `bundle`.
    ///
    /// The pause entry is always written, so it marks a saved period. Without
    /// it the current value is kept; with it, fields that have no entry were
    /// saved unset and are restored unset.
    pub fn restore_state(&mut self, key: &str, bundle: &StateBundle) {
        let Some(pause) = bundle.get_bool(&format!("{key}{SUFFIX_PAUSE_ON_BELL}")) else {
            return;
        };
        self.description = bundle
            .get_str(&format!("{key}{SUFFIX_DESCRIPTION}"))
            .map(str::to_string);
        self.background_color = bundle
            .get_u64(&format!("{key}{SUFFIX_BACKGROUND_COLOR}"))
            .and_then(|c| u32::try_from(c).ok());
        self.pause_on_bell = pause;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_followed_by_overrides_set_fields() {
        let current = PeriodInfo::new("Initial").with_background_color(0xFF00_0000);
        let next = PeriodInfo::new("POIs allowed").with_background_color(0xFF22_8B22);

        let result = current.followed_by(&next, true);
        assert_eq!(result.description.as_deref(), Some("POIs allowed"));
        assert_eq!(result.background_color, Some(0xFF22_8B22));
        assert!(result.pause_on_bell);
    }

    #[test]
    fn test_followed_by_inherits_unset_fields() {
        let current = PeriodInfo::new("Initial").with_background_color(0xFF00_0000);
        let next = PeriodInfo {
            description: Some("Warning".to_string()),
            ..Default::default()
        };

        let result = current.followed_by(&next, false);
        assert_eq!(result.description.as_deref(), Some("Warning"));
        assert_eq!(result.background_color, Some(0xFF00_0000));
        assert!(!result.pause_on_bell);
        // the receiver is untouched
        assert_eq!(current.description.as_deref(), Some("Initial"));
    }

    #[test]
    fn test_save_and_restore() {
        let period = PeriodInfo {
            description: Some("Overtime".to_string()),
            background_color: Some(0xFF8B_0000),
            pause_on_bell: true,
        };
        let mut bundle = StateBundle::new();
        period.save_state("sm.period", &mut bundle);

        let mut restored = PeriodInfo::new("Initial");
        restored.restore_state("sm.period", &bundle);
        assert_eq!(restored, period);
    }

    #[test]
    fn test_restore_without_saved_period_keeps_current() {
        let mut bundle = StateBundle::new();
        bundle.put_str("p.description", "Warning");

        let mut period = PeriodInfo::new("Initial").with_background_color(0xFF00_0000);
        period.restore_state("p", &bundle);

        assert_eq!(period, PeriodInfo::new("Initial").with_background_color(0xFF00_0000));
    }

    #[test]
    fn test_restore_clears_fields_saved_unset() {
        let saved = PeriodInfo::new("Opening");
        let mut bundle = StateBundle::new();
        saved.save_state("p", &mut bundle);

        let mut period = PeriodInfo::new("Second half").with_background_color(0xFFFF_0000);
        period.pause_on_bell = true;
        period.restore_state("p", &bundle);

        assert_eq!(period, saved);
        assert_eq!(period.background_color, None);

        let mut bundle = StateBundle::new();
        PeriodInfo::default().save_state("p", &mut bundle);
        period.restore_state("p", &bundle);
        assert_eq!(period, PeriodInfo::default());
    }

    #[test]
    fn test_save_clears_stale_entries() {
        let mut bundle = StateBundle::new();
        PeriodInfo::new("Old")
            .with_background_color(1)
            .save_state("p", &mut bundle);
        PeriodInfo::default().save_state("p", &mut bundle);

        assert!(!bundle.contains_key("p.description"));
        assert!(!bundle.contains_key("p.background_color"));
    }
}
