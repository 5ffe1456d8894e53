//! Helpers for showing times to the user.

use serde::Deserialize;

use crate::debate_format::CountDirection;

/// The user's preferred clock direction.
///
/// `Always*` overrides whatever a speech format suggests; `Generally*`
/// only applies when the format has no preference of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserCountDirection {
    AlwaysUp,
    #[default]
    GenerallyUp,
    GenerallyDown,
    AlwaysDown,
}

impl UserCountDirection {
    /// Combine this preference with a speech format's hint.
    /// Never returns [`CountDirection::Unspecified`].
    pub fn resolve(self, format_hint: CountDirection) -> CountDirection {
        match (self, format_hint) {
            (UserCountDirection::AlwaysUp, _) => CountDirection::Up,
            (UserCountDirection::AlwaysDown, _) => CountDirection::Down,
            (_, CountDirection::Up) => CountDirection::Up,
            (_, CountDirection::Down) => CountDirection::Down,
            (UserCountDirection::GenerallyDown, CountDirection::Unspecified) => {
                CountDirection::Down
            }
            (UserCountDirection::GenerallyUp, CountDirection::Unspecified) => CountDirection::Up,
        }
    }
}

/// The number to show for `time` in a speech of `speech_length`.
///
/// Counting down shows the time remaining, which goes negative in overtime.
pub fn display_seconds(time: u64, speech_length: u64, direction: CountDirection) -> i64 {
    let time = i64::try_from(time).unwrap_or(i64::MAX);
    match direction {
        CountDirection::Down => i64::try_from(speech_length)
            .unwrap_or(i64::MAX)
            .saturating_sub(time),
        CountDirection::Up | CountDirection::Unspecified => time,
    }
}

/// Elapsed seconds for a time the user entered as it is displayed.
///
/// Counting down, the entry is the time remaining, so anything longer than
/// the speech means zero elapsed.
pub fn elapsed_from_display(entered: u64, speech_length: u64, direction: CountDirection) -> u64 {
    match direction {
        CountDirection::Down => speech_length.saturating_sub(entered),
        CountDirection::Up | CountDirection::Unspecified => entered,
    }
}

/// Format seconds as `mm:ss`, or `mm:ss over` for negative values.
pub fn secs_to_text(seconds: i64) -> String {
    let magnitude = seconds.unsigned_abs();
    let text = format!("{:02}:{:02}", magnitude / 60, magnitude % 60);
    if seconds < 0 {
        format!("{} over", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_overrides_format() {
        assert_eq!(
            UserCountDirection::AlwaysUp.resolve(CountDirection::Down),
            CountDirection::Up
        );
        assert_eq!(
            UserCountDirection::AlwaysDown.resolve(CountDirection::Up),
            CountDirection::Down
        );
    }

    #[test]
    fn test_format_overrides_generally() {
        assert_eq!(
            UserCountDirection::GenerallyUp.resolve(CountDirection::Down),
            CountDirection::Down
        );
        assert_eq!(
            UserCountDirection::GenerallyDown.resolve(CountDirection::Up),
            CountDirection::Up
        );
    }

    #[test]
    fn test_generally_applies_without_hint() {
        assert_eq!(
            UserCountDirection::GenerallyUp.resolve(CountDirection::Unspecified),
            CountDirection::Up
        );
        assert_eq!(
            UserCountDirection::GenerallyDown.resolve(CountDirection::Unspecified),
            CountDirection::Down
        );
    }

    #[test]
    fn test_display_seconds() {
        assert_eq!(display_seconds(90, 420, CountDirection::Up), 90);
        assert_eq!(display_seconds(90, 420, CountDirection::Down), 330);
        assert_eq!(display_seconds(450, 420, CountDirection::Down), -30);
    }

    #[test]
    fn test_elapsed_from_display() {
        assert_eq!(elapsed_from_display(60, 420, CountDirection::Up), 60);
        assert_eq!(elapsed_from_display(60, 420, CountDirection::Down), 360);
        assert_eq!(elapsed_from_display(500, 420, CountDirection::Down), 0);
        assert_eq!(
            display_seconds(elapsed_from_display(60, 420, CountDirection::Down), 420, CountDirection::Down),
            60
        );
    }

    #[test]
    fn test_secs_to_text() {
        assert_eq!(secs_to_text(0), "00:00");
        assert_eq!(secs_to_text(65), "01:05");
        assert_eq!(secs_to_text(600), "10:00");
        assert_eq!(secs_to_text(-30), "00:30 over");
    }
}
