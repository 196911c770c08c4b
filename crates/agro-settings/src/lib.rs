//! # agro-settings
//!
//! Configuration for the Agro server, loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`AgroSettings::default()`]
//! 2. **Settings file**: `~/.agro/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `AGRO_*` and `GEMINI_API_KEY` (highest priority)
//!
//! Settings are loaded once by the binary and passed down explicitly; there is
//! no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
