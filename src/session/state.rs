use regex::Regex;

/// Selection as reported by the controller in its status body
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportedSelection {
    pub active: bool,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub dirty: bool,
}

/// Last polled state of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub num_leds: usize,
    pub global_brightness: u8,
    /// Informational, the session does not follow it
    pub selection: Option<ReportedSelection>,
}

/// Brightness assumed when the controller does not report one
const DEFAULT_BRIGHTNESS: u8 = 128;

#[derive(Deserialize)]
struct StateBody {
    num_leds: Option<f64>,
    bright: Option<f64>,
    selection: Option<ReportedSelection>,
}

lazy_static::lazy_static! {
    static ref NUM_LEDS_FIELD: Regex =
        Regex::new(r#""?num_leds"?\s*[:=]\s*(-?[0-9]+)"#).unwrap();
    static ref BRIGHT_FIELD: Regex =
        Regex::new(r#""?bright"?\s*[:=]\s*(-?[0-9]+(?:\.[0-9]+)?)"#).unwrap();
}

fn brightness(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn led_count(value: f64) -> Option<usize> {
    if value.is_finite() && value >= 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

impl DeviceState {
    /// Parse a status body
    ///
    /// Bodies are read as JSON with every field optional. Anything else is scanned for
    /// `num_leds` and `bright` key-value pairs. A body without a usable LED count yields `None`.
    pub fn parse(body: &str) -> Option<Self> {
        if let Ok(state) = serde_json::from_str::<StateBody>(body) {
            return Some(Self {
                num_leds: led_count(state.num_leds?)?,
                global_brightness: state.bright.map(brightness).unwrap_or(DEFAULT_BRIGHTNESS),
                selection: state.selection,
            });
        }

        let num_leds = NUM_LEDS_FIELD
            .captures(body)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .and_then(led_count)?;

        let global_brightness = BRIGHT_FIELD
            .captures(body)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .map(brightness)
            .unwrap_or(DEFAULT_BRIGHTNESS);

        Some(Self {
            num_leds,
            global_brightness,
            selection: None,
        })
    }
}
