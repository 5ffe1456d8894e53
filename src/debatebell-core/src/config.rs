//! Configuration module for loading TOML config and debate format files.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::debate_format::{BellInfo, CountDirection, DebateFormat, SpeechFormat, parse_time};
use crate::display::UserCountDirection;
use crate::error::DebateError;
use crate::period::PeriodInfo;
use crate::speech_timer::OvertimeBells;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub overtime_bells: OvertimeBellsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Overtime bell settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OvertimeBellsConfig {
    pub enabled: bool,
    /// Seconds after the end of the speech for the first overtime bell.
    pub first_bell: u64,
    /// Seconds between later overtime bells.
    pub period: u64,
}

impl Default for OvertimeBellsConfig {
    fn default() -> Self {
        let defaults = OvertimeBells::default();
        Self {
            enabled: true,
            first_bell: defaults.first_bell,
            period: defaults.period,
        }
    }
}

impl OvertimeBellsConfig {
    /// The overtime rule to hand to the timer.
    pub fn rule(&self) -> OvertimeBells {
        if self.enabled {
            OvertimeBells::new(self.first_bell, self.period)
        } else {
            OvertimeBells::DISABLED
        }
    }
}

/// Display preferences.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub count_direction: UserCountDirection,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml(content: &str) -> Result<Self, DebateError> {
        toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))
    }
}

/// On-disk layout of a debate format file.
#[derive(Debug, Clone, Deserialize)]
struct DebateFormatFile {
    name: String,
    #[serde(default)]
    periods: HashMap<String, PeriodConfig>,
    #[serde(default)]
    resources: Vec<ResourceConfig>,
    speech_types: Vec<SpeechTypeConfig>,
    speeches: Vec<SpeechConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct PeriodConfig {
    description: Option<String>,
    background_color: Option<u32>,
}

/// A named set of bells shared by several speech types.
#[derive(Debug, Clone, Deserialize)]
struct ResourceConfig {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default)]
    bells: Vec<BellConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpeechTypeConfig {
    #[serde(rename = "ref")]
    reference: String,
    length: String,
    #[serde(default)]
    count_direction: CountDirection,
    first_period: Option<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    bells: Vec<BellConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct BellConfig {
    /// `"m:ss"`, plain seconds, or `"finish"` for the end of the speech.
    time: String,
    #[serde(default)]
    pause_on_bell: bool,
    next_period: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpeechConfig {
    name: String,
    speech_type: String,
}

impl DebateFormat {
    /// Load a debate format from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            DebateError::ConfigError(format!("Failed to read debate format: {}", e))
        })?;

        Self::from_toml(&content)
    }

    /// Parse a debate format from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, DebateError> {
        let file: DebateFormatFile = toml::from_str(content).map_err(|e| {
            DebateError::ConfigError(format!("Failed to parse debate format: {}", e))
        })?;
        file.build()
    }
}

impl DebateFormatFile {
    fn build(self) -> Result<DebateFormat, DebateError> {
        let resources: HashMap<&str, &ResourceConfig> = self
            .resources
            .iter()
            .map(|r| (r.reference.as_str(), r))
            .collect();

        let mut speech_types: HashMap<&str, Arc<SpeechFormat>> = HashMap::new();
        for speech_type in &self.speech_types {
            let format = self.build_speech_type(speech_type, &resources)?;
            speech_types.insert(speech_type.reference.as_str(), Arc::new(format));
        }

        let mut debate = DebateFormat::new(self.name.as_str());
        for speech in &self.speeches {
            let format = speech_types
                .get(speech.speech_type.as_str())
                .ok_or_else(|| DebateError::UnknownSpeechType {
                    speech_type: speech.speech_type.clone(),
                    speech: speech.name.clone(),
                })?;
            debate = debate.with_speech(speech.name.as_str(), format.clone());
        }

        Ok(debate)
    }

    fn build_speech_type(
        &self,
        config: &SpeechTypeConfig,
        resources: &HashMap<&str, &ResourceConfig>,
    ) -> Result<SpeechFormat, DebateError> {
        let length = parse_time(&config.length)?;
        let context = format!("speech type '{}'", config.reference);

        let mut format = SpeechFormat::new(length).with_count_direction(config.count_direction);
        if let Some(ref first) = config.first_period {
            format = format.with_first_period(self.period(first, &context)?);
        }

        for reference in &config.include {
            let resource =
                resources
                    .get(reference.as_str())
                    .ok_or_else(|| DebateError::UnknownResource {
                        resource: reference.clone(),
                        speech_type: config.reference.clone(),
                    })?;
            for bell in &resource.bells {
                format = format.with_bell(self.bell(bell, length, &context)?);
            }
        }

        for bell in &config.bells {
            format = format.with_bell(self.bell(bell, length, &context)?);
        }

        Ok(format)
    }

    fn bell(&self, config: &BellConfig, length: u64, context: &str) -> Result<BellInfo, DebateError> {
        let time = if config.time.trim().eq_ignore_ascii_case("finish") {
            length
        } else {
            parse_time(&config.time)?
        };
        let next_period = match config.next_period {
            Some(ref reference) => self.period(reference, context)?,
            None => PeriodInfo::default(),
        };
        Ok(BellInfo::new(time, config.pause_on_bell, next_period))
    }

    fn period(&self, reference: &str, context: &str) -> Result<PeriodInfo, DebateError> {
        self.periods
            .get(reference)
            .map(|p| PeriodInfo {
                description: p.description.clone(),
                background_color: p.background_color,
                pause_on_bell: false,
            })
            .ok_or_else(|| DebateError::UnknownPeriod {
                period: reference.to_string(),
                context: context.to_string(),
            })
    }
}

const NORMAL: u32 = 0xFF00_0000;
const POI_ALLOWED: u32 = 0xFF1E_5631;
const WARNING: u32 = 0xFF7A_5C00;
const OVERTIME: u32 = 0xFF6B_0F0F;

/// Default debate format embedded in the binary: two teams of three with
/// eight-minute substantive speeches and four-minute replies.
pub fn default_debate_format() -> DebateFormat {
    let substantive = Arc::new(
        SpeechFormat::new(480)
            .with_first_period(PeriodInfo::new("No points of information").with_background_color(NORMAL))
            .with_bell(BellInfo::new(
                60,
                false,
                PeriodInfo::new("Points of information allowed").with_background_color(POI_ALLOWED),
            ))
            .with_bell(BellInfo::new(
                420,
                false,
                PeriodInfo::new("Warning bell rung").with_background_color(WARNING),
            ))
            .with_finish_bell(
                false,
                PeriodInfo::new("Overtime").with_background_color(OVERTIME),
            ),
    );

    let reply = Arc::new(
        SpeechFormat::new(240)
            .with_first_period(PeriodInfo::new("Reply").with_background_color(NORMAL))
            .with_bell(BellInfo::new(
                180,
                false,
                PeriodInfo::new("Warning bell rung").with_background_color(WARNING),
            ))
            .with_finish_bell(
                false,
                PeriodInfo::new("Overtime").with_background_color(OVERTIME),
            ),
    );

    DebateFormat::new("Two-team (3 v 3 with replies)")
        .with_speech("1st Proposition", substantive.clone())
        .with_speech("1st Opposition", substantive.clone())
        .with_speech("2nd Proposition", substantive.clone())
        .with_speech("2nd Opposition", substantive.clone())
        .with_speech("3rd Proposition", substantive.clone())
        .with_speech("3rd Opposition", substantive)
        .with_speech("Opposition Reply", reply.clone())
        .with_speech("Proposition Reply", reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT_TOML: &str = r#"
name = "Australs"

[periods.initial]
description = "Initial"
background_color = 0xFF000000

[periods.pois]
description = "POIs allowed"
background_color = 0xFF1E5631

[periods.warning]
description = "Warning bell rung"

[periods.overtime]
description = "Overtime"
background_color = 0xFF6B0F0F

[[resources]]
ref = "warning-bells"

[[resources.bells]]
time = "7:00"
next_period = "warning"

[[speech_types]]
ref = "substantive"
length = "8:00"
first_period = "initial"
include = ["warning-bells"]

[[speech_types.bells]]
time = "1:00"
next_period = "pois"

[[speech_types.bells]]
time = "finish"
pause_on_bell = true
next_period = "overtime"

[[speech_types]]
ref = "reply"
length = "240"
count_direction = "down"

[[speech_types.bells]]
time = "finish"

[[speeches]]
name = "1st Affirmative"
speech_type = "substantive"

[[speeches]]
name = "Negative Reply"
speech_type = "reply"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.overtime_bells.enabled);
        assert_eq!(config.overtime_bells.rule(), OvertimeBells::new(30, 20));
        assert_eq!(config.display.count_direction, UserCountDirection::GenerallyUp);
    }

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml(
            r#"
[overtime_bells]
first_bell = 15
period = 10

[display]
count_direction = "always_down"
"#,
        )
        .unwrap();

        assert_eq!(config.overtime_bells.rule(), OvertimeBells::new(15, 10));
        assert_eq!(config.display.count_direction, UserCountDirection::AlwaysDown);
    }

    #[test]
    fn test_disabled_overtime_bells() {
        let config = Config::from_toml("[overtime_bells]\nenabled = false\n").unwrap();
        assert_eq!(config.overtime_bells.rule(), OvertimeBells::DISABLED);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.overtime_bells.rule(), OvertimeBells::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_toml("[display]\ncount_direction = \"sideways\"\n"),
            Err(DebateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_debate_format() {
        let debate = DebateFormat::from_toml(FORMAT_TOML).unwrap();
        assert_eq!(debate.name(), "Australs");
        assert_eq!(debate.number_of_speeches(), 2);

        let first = &debate.speech(0).unwrap().format;
        assert_eq!(first.length(), 480);
        assert_eq!(first.count_direction(), CountDirection::Unspecified);
        assert_eq!(first.first_period().description.as_deref(), Some("Initial"));

        let times: Vec<(u64, bool)> = first
            .bells()
            .iter()
            .map(|b| (b.time(), b.is_pause_on_bell()))
            .collect();
        assert_eq!(times, vec![(60, false), (420, false), (480, true)]);

        let warning = first.period_at(420);
        assert_eq!(warning.description.as_deref(), Some("Warning bell rung"));
        // warning period has no colour of its own
        assert_eq!(warning.background_color, Some(0xFF1E_5631));

        let reply = &debate.speech(1).unwrap().format;
        assert_eq!(reply.length(), 240);
        assert_eq!(reply.count_direction(), CountDirection::Down);
        assert_eq!(reply.bell_at(240).map(|b| b.is_pause_on_bell()), Some(false));
    }

    #[test]
    fn test_unknown_speech_type() {
        let content = r#"
name = "Broken"

[[speech_types]]
ref = "a"
length = "1:00"

[[speeches]]
name = "Only"
speech_type = "b"
"#;
        assert!(matches!(
            DebateFormat::from_toml(content),
            Err(DebateError::UnknownSpeechType { .. })
        ));
    }

    #[test]
    fn test_unknown_period_and_resource() {
        let unknown_period = r#"
name = "Broken"

[[speech_types]]
ref = "a"
length = "1:00"
first_period = "missing"

[[speeches]]
name = "Only"
speech_type = "a"
"#;
        assert!(matches!(
            DebateFormat::from_toml(unknown_period),
            Err(DebateError::UnknownPeriod { .. })
        ));

        let unknown_resource = r#"
name = "Broken"

[[speech_types]]
ref = "a"
length = "1:00"
include = ["missing"]

[[speeches]]
name = "Only"
speech_type = "a"
"#;
        assert!(matches!(
            DebateFormat::from_toml(unknown_resource),
            Err(DebateError::UnknownResource { .. })
        ));
    }

    #[test]
    fn test_bad_bell_time() {
        let content = r#"
name = "Broken"

[[speech_types]]
ref = "a"
length = "1:00"

[[speech_types.bells]]
time = "soon"

[[speeches]]
name = "Only"
speech_type = "a"
"#;
        assert!(matches!(
            DebateFormat::from_toml(content),
            Err(DebateError::InvalidTime { .. })
        ));
    }

    #[test]
    fn test_shipped_files_parse() {
        let config = Config::from_toml(include_str!("../../../debatebell.toml")).unwrap();
        assert_eq!(config.overtime_bells.rule(), OvertimeBells::new(30, 20));

        let debate =
            DebateFormat::from_toml(include_str!("../../../formats/british-parliamentary.toml"))
                .unwrap();
        assert_eq!(debate.number_of_speeches(), 8);

        let constructive = &debate.speech(0).unwrap().format;
        assert_eq!(constructive.length(), 420);
        assert_eq!(
            constructive.period_at(90).description.as_deref(),
            Some("Points of information allowed")
        );
        assert_eq!(
            constructive.period_at(400).description.as_deref(),
            Some("Protected time")
        );
    }

    #[test]
    fn test_default_debate_format() {
        let debate = default_debate_format();
        assert_eq!(debate.number_of_speeches(), 8);
        assert_eq!(debate.speech(0).unwrap().name, "1st Proposition");
        assert_eq!(debate.speech(7).unwrap().format.length(), 240);

        let substantive = &debate.speech(0).unwrap().format;
        assert_eq!(substantive.bells().len(), 3);
        assert_eq!(
            substantive.period_at(480).description.as_deref(),
            Some("Overtime")
        );
    }
}
