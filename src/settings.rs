//! Global editor preferences, persisted inside the note index.
use std::{fmt, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

use crate::{MkError, Result};

/// Allowed editor font sizes
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 8..=48;

/// Editor preferences shared by every note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Save automatically when leaving the editor
    pub save_on_file_exit: bool,

    /// Editor font size in points, within [`FONT_SIZE_RANGE`]
    pub font_size: u32,

    /// Number lines relative to the cursor line
    #[serde(default)]
    pub relative_line_numbers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_on_file_exit: true,
            font_size: 20,
            relative_line_numbers: false,
        }
    }
}

impl Settings {
    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_font_size(i64::from(self.font_size)).map(|_| ())
    }

    pub fn set_font_size(&mut self, size: i64) -> Result<()> {
        self.font_size = check_font_size(size)?;
        Ok(())
    }

    /// Sets a preference from its key and textual value, as typed on the
    /// command line (`font_size=14`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key.trim() {
            "font_size" => {
                let size = value.parse::<i64>().map_err(|_| MkError::InvalidSetting {
                    message: format!("font_size must be an integer, got '{}'", value),
                })?;
                self.set_font_size(size)
            }
            "save_on_file_exit" => {
                self.save_on_file_exit = parse_bool(key, value)?;
                Ok(())
            }
            "relative_line_numbers" => {
                self.relative_line_numbers = parse_bool(key, value)?;
                Ok(())
            }
            other => Err(MkError::InvalidSetting {
                message: format!("unknown setting '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "save_on_file_exit = {}", self.save_on_file_exit)?;
        writeln!(f, "font_size = {}", self.font_size)?;
        write!(f, "relative_line_numbers = {}", self.relative_line_numbers)
    }
}

fn check_font_size(size: i64) -> Result<u32> {
    match u32::try_from(size) {
        Ok(size) if FONT_SIZE_RANGE.contains(&size) => Ok(size),
        _ => Err(MkError::InvalidSetting {
            message: format!(
                "font_size {} is outside {}..={}",
                size,
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end()
            ),
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(MkError::InvalidSetting {
            message: format!("{} expects true or false, got '{}'", key, value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn font_size_bounds() {
        let mut settings = Settings::default();
        assert!(settings.set_font_size(8).is_ok());
        assert!(settings.set_font_size(48).is_ok());
        assert!(matches!(
            settings.set_font_size(5),
            Err(MkError::InvalidSetting { .. })
        ));
        assert!(matches!(
            settings.set_font_size(-12),
            Err(MkError::InvalidSetting { .. })
        ));
        assert_eq!(settings.font_size, 48);
    }

    #[test]
    fn set_by_key() {
        let mut settings = Settings::default();
        settings.set("font_size", "14").unwrap();
        settings.set("relative_line_numbers", "yes").unwrap();
        settings.set("save_on_file_exit", "false").unwrap();
        assert_eq!(settings.font_size, 14);
        assert!(settings.relative_line_numbers);
        assert!(!settings.save_on_file_exit);

        assert!(settings.set("theme", "dark").is_err());
        assert!(settings.set("font_size", "big").is_err());
        assert!(settings.set("save_on_file_exit", "maybe").is_err());
    }

    #[test]
    fn missing_relative_line_numbers_defaults_off() {
        let settings: Settings =
            serde_json::from_str(r#"{"save_on_file_exit": false, "font_size": 12}"#).unwrap();
        assert!(!settings.relative_line_numbers);
        assert_eq!(settings.font_size, 12);
    }
}
