// ============================================================================
// APPLICATION SETTINGS – key=value config file
// ============================================================================

use std::path::PathBuf;

use crate::geometry::BASE_CELL_SIZE;
use crate::scheme::SchemeEntry;
use crate::steps::MAX_COPIES;

pub const SETTINGS_FILE_NAME: &str = "brickbead_settings.cfg";
pub const DEFAULT_SCHEME_URL: &str = "patterns/scheme1.json";
pub const DEFAULT_SHIFT: i32 = 4;

const MIN_CELL_SIZE: f64 = 4.0;
const MAX_CELL_SIZE: f64 = 400.0;

/// Application settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Extra replicated copies applied when a scheme is loaded.
    pub copies: u32,
    /// Column offset between consecutive copies.
    pub shift: i32,
    /// Draw faint slots for unpainted lattice positions.
    pub show_empty_slots: bool,
    pub base_cell_size: f64,
    pub schemes: Vec<SchemeEntry>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            copies: 0,
            shift: DEFAULT_SHIFT,
            show_empty_slots: false,
            base_cell_size: BASE_CELL_SIZE,
            schemes: vec![SchemeEntry::new("Scheme 1", DEFAULT_SCHEME_URL)],
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/BrickBead/brickbead_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\BrickBead\brickbead_settings.cfg
    /// On macOS:   ~/Library/Application Support/BrickBead/brickbead_settings.cfg
    pub fn settings_path() -> PathBuf {
        crate::logger::config_dir()
            .join(crate::logger::APP_DIR)
            .join(SETTINGS_FILE_NAME)
    }

    pub fn to_config_string(&self) -> String {
        let mut content = format!(
            "copies={}\n\
             shift={}\n\
             show_empty_slots={}\n\
             base_cell_size={}\n",
            self.copies, self.shift, self.show_empty_slots, self.base_cell_size,
        );
        for scheme in &self.schemes {
            content.push_str("scheme=");
            content.push_str(&scheme.to_config_value());
            content.push('\n');
        }
        content
    }

    /// Parse a settings file body. Unknown keys and bad values are skipped.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        let mut schemes = Vec::new();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "copies" => {
                    if let Ok(n) = val.parse::<u32>() {
                        s.copies = n.min(MAX_COPIES);
                    }
                }
                "shift" => {
                    s.shift = val.parse().unwrap_or(DEFAULT_SHIFT);
                }
                "show_empty_slots" => {
                    s.show_empty_slots = val == "true";
                }
                "base_cell_size" => {
                    if let Ok(v) = val.parse::<f64>()
                        && v.is_finite()
                    {
                        s.base_cell_size = v.clamp(MIN_CELL_SIZE, MAX_CELL_SIZE);
                    }
                }
                "scheme" => {
                    if let Some(entry) = SchemeEntry::from_config_value(val) {
                        schemes.push(entry);
                    }
                }
                _ => {}
            }
        }
        if !schemes.is_empty() {
            s.schemes = schemes;
        }
        s
    }

    /// Save settings to disk. Failures are logged.
    pub fn save(&self) {
        let path = Self::settings_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log_err!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (defaults if the file is missing or corrupt).
    pub fn load() -> Self {
        let path = Self::settings_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_one_scheme() {
        let s = AppSettings::default();
        assert_eq!(s.schemes.len(), 1);
        assert_eq!(s.schemes[0].url, DEFAULT_SCHEME_URL);
        assert_eq!(s.shift, 4);
    }

    #[test]
    fn config_round_trip() {
        let s = AppSettings {
            copies: 3,
            shift: -2,
            show_empty_slots: true,
            base_cell_size: 24.0,
            schemes: vec![
                SchemeEntry::new("A", "https://example.org/a.json"),
                SchemeEntry::new("B", "patterns/b.json"),
            ],
        };
        assert_eq!(AppSettings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_are_clamped_or_skipped() {
        let s = AppSettings::parse("copies=999\nshift=x\nbase_cell_size=NaN\nnonsense\nscheme=broken\n");
        assert_eq!(s.copies, MAX_COPIES);
        assert_eq!(s.shift, DEFAULT_SHIFT);
        assert_eq!(s.base_cell_size, BASE_CELL_SIZE);
        assert_eq!(s.schemes, AppSettings::default().schemes);
    }
}
