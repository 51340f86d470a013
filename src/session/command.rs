use super::{SelectionRange, SessionError};

/// Default number of flashes of an identify blink
pub const BLINK_TIMES: u32 = 2;
/// Default half-period of an identify blink, in milliseconds
pub const BLINK_MS: u32 = 180;

/// A command of the controller protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    State,
    Select {
        range: SelectionRange,
        blink: bool,
    },
    PreviewColor {
        /// Six hex digits, no marker
        hex: String,
        local_brightness: Option<u8>,
    },
    LocalBrightness(u8),
    GlobalBrightness(u8),
    Save,
    Cancel,
    Blink {
        range: SelectionRange,
        times: u32,
        ms: u32,
    },
    Load,
    Reboot,
}

impl Command {
    pub fn preview_hex(hex: &str, local_brightness: Option<u8>) -> Self {
        let hex = hex.trim();

        Self::PreviewColor {
            hex: hex.strip_prefix('#').unwrap_or(hex).to_owned(),
            local_brightness,
        }
    }

    pub fn blink(range: SelectionRange, times: u32, ms: u32) -> Self {
        Self::Blink {
            range,
            times: times.max(1),
            ms: ms.max(20),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Command::State => "/state",
            Command::Select { .. } => "/select",
            Command::PreviewColor { .. } => "/set",
            Command::LocalBrightness(_) => "/lbright",
            Command::GlobalBrightness(_) => "/brightness",
            Command::Save => "/save",
            Command::Cancel => "/cancel",
            Command::Blink { .. } => "/blink",
            Command::Load => "/load",
            Command::Reboot => "/reboot",
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Command::Select { range, blink } => {
                let mut query = vec![
                    ("start", range.start().to_string()),
                    ("end", range.end().to_string()),
                ];

                if *blink {
                    query.push(("blink", "1".to_owned()));
                }

                query
            }
            Command::PreviewColor {
                hex,
                local_brightness,
            } => {
                let mut query = vec![("hex", hex.clone())];

                if let Some(local_brightness) = local_brightness {
                    query.push(("lbright", local_brightness.to_string()));
                }

                query
            }
            Command::LocalBrightness(value) | Command::GlobalBrightness(value) => {
                vec![("value", value.to_string())]
            }
            Command::Blink { range, times, ms } => vec![
                ("start", range.start().to_string()),
                ("end", range.end().to_string()),
                ("times", times.to_string()),
                ("ms", ms.to_string()),
            ],
            Command::State | Command::Save | Command::Cancel | Command::Load | Command::Reboot => {
                Vec::new()
            }
        }
    }

    /// Map a response code to the outcome of this command
    pub fn classify(&self, code: u16) -> Result<(), SessionError> {
        match (self, code) {
            (_, 200..=299) => Ok(()),
            (Command::PreviewColor { .. }, 400) => Err(SessionError::BadColor),
            (Command::PreviewColor { .. }, 409) | (Command::LocalBrightness(_), 409) => {
                Err(SessionError::NoSelection)
            }
            (_, code) => Err(SessionError::DeviceRejected(code)),
        }
    }
}
