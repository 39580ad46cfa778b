// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Tunables of one accelerator instance, loadable from a JSON configuration file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::vc1::regs::ve_mode;
use crate::vc1::regs::RegisterLayout;
use crate::vc1::regs::VeMode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VpuConfig {
    /// How long a triggered run may stay unanswered before it is forced to fault.
    pub watchdog_timeout_ms: u64,
    /// Enable the motion compensation reference cache.
    pub mcri_cache: bool,
    /// Use 128-bit DDR bursts.
    pub ddr_mode_bw_128: bool,
    /// Write the reconstruction in 2 MB tiles.
    pub rec_wr_mode_2mb: bool,
    /// Log the picture header registers before every trigger.
    pub debug_register_dump: bool,
}

impl Default for VpuConfig {
    fn default() -> Self {
        VpuConfig {
            watchdog_timeout_ms: 2000,
            mcri_cache: true,
            ddr_mode_bw_128: true,
            rec_wr_mode_2mb: true,
            debug_register_dump: false,
        }
    }
}

impl VpuConfig {
    /// Parse a configuration from JSON text. Missing fields keep their default.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::ConfigParse)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// VE_MODE value selecting the decode engine `dec`.
    pub fn ve_mode(&self, dec: u32) -> u32 {
        let mut reg = VeMode::new();
        reg.set_dec(dec as u8);
        if self.ddr_mode_bw_128 {
            reg.set_ddr_mode_bw(ve_mode::DDR_MODE_BW_128);
        }
        reg.set_rec_wr_mode_2mb(self.rec_wr_mode_2mb);
        reg.bits()
    }
}

/// Read and parse the configuration file at `path`.
pub fn load_config_file(path: &Path) -> anyhow::Result<VpuConfig> {
    let text = fs::read_to_string(path)
        .map_err(Error::ConfigRead)
        .with_context(|| format!("failed to load {}", path.display()))?;
    VpuConfig::from_json(&text).with_context(|| format!("invalid configuration in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(VpuConfig::from_json("{}").unwrap(), VpuConfig::default());
    }

    #[test]
    fn partial_override() {
        let config =
            VpuConfig::from_json(r#"{"watchdog_timeout_ms": 50, "mcri_cache": false}"#).unwrap();
        assert_eq!(config.watchdog_timeout(), Duration::from_millis(50));
        assert!(!config.mcri_cache);
        assert!(config.rec_wr_mode_2mb);
    }

    #[test]
    fn unknown_field_rejected() {
        match VpuConfig::from_json(r#"{"watchdog": 1}"#) {
            Err(Error::ConfigParse(_)) => {}
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn ve_mode_bits() {
        let config = VpuConfig::default();
        assert_eq!(config.ve_mode(ve_mode::DEC_VC1), 0x2 | (0x3 << 16) | (1 << 20));
        let narrow = VpuConfig {
            ddr_mode_bw_128: false,
            rec_wr_mode_2mb: false,
            ..Default::default()
        };
        assert_eq!(narrow.ve_mode(ve_mode::DEC_VC1), 0x2);
        assert_eq!(narrow.ve_mode(ve_mode::DISABLED), 0x7);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"debug_register_dump": true}}"#).unwrap();
        let config = load_config_file(file.path()).unwrap();
        assert!(config.debug_register_dump);
        assert_eq!(config.watchdog_timeout_ms, 2000);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ConfigRead(_))
        ));
    }
}
