//! Hardware Models
//!
//! Numeric device codes announced in NodeInfo packets, with the firmware's
//! name for each. Codes missing from the table are still valid on the wire;
//! they simply have no name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Model announced when nothing better is known
pub const DEFAULT_HW_MODEL: u32 = 43;

/// Known hardware model codes and names
pub const HARDWARE_MODELS: &[(u32, &str)] = &[
    (0, "UNSET"),
    (1, "TLORA_V2"),
    (2, "TLORA_V1"),
    (3, "TLORA_V2_1_1P6"),
    (4, "TBEAM"),
    (5, "HELTEC_V2_0"),
    (6, "TBEAM_V0P7"),
    (7, "T_ECHO"),
    (8, "TLORA_V1_1P3"),
    (9, "RAK4631"),
    (10, "HELTEC_V2_1"),
    (11, "HELTEC_V1"),
    (12, "LILYGO_TBEAM_S3_CORE"),
    (13, "RAK11200"),
    (14, "NANO_G1"),
    (15, "TLORA_V2_1_1P8"),
    (16, "TLORA_T3_S3"),
    (17, "NANO_G1_EXPLORER"),
    (18, "NANO_G2_ULTRA"),
    (19, "LORA_TYPE"),
    (20, "WIPHONE"),
    (21, "WIO_WM1110"),
    (22, "RAK2560"),
    (23, "HELTEC_HRU_3601"),
    (24, "HELTEC_WIRELESS_BRIDGE"),
    (25, "STATION_G1"),
    (26, "RAK11310"),
    (27, "SENSELORA_RP2040"),
    (28, "SENSELORA_S3"),
    (29, "CANARYONE"),
    (30, "RP2040_LORA"),
    (31, "STATION_G2"),
    (32, "LORA_RELAY_V1"),
    (33, "NRF52840DK"),
    (34, "PPR"),
    (35, "GENIEBLOCKS"),
    (36, "NRF52_UNKNOWN"),
    (37, "PORTDUINO"),
    (38, "ANDROID_SIM"),
    (39, "DIY_V1"),
    (40, "NRF52840_PCA10059"),
    (41, "DR_DEV"),
    (42, "M5STACK"),
    (43, "HELTEC_V3"),
    (44, "HELTEC_WSL_V3"),
    (45, "BETAFPV_2400_TX"),
    (46, "BETAFPV_900_NANO_TX"),
    (47, "RPI_PICO"),
    (48, "HELTEC_WIRELESS_TRACKER"),
    (49, "HELTEC_WIRELESS_PAPER"),
    (50, "T_DECK"),
    (51, "T_WATCH_S3"),
    (52, "PICOMPUTER_S3"),
    (53, "HELTEC_HT62"),
    (54, "EBYTE_ESP32_S3"),
    (55, "ESP32_S3_PICO"),
    (56, "CHATTER_2"),
    (57, "HELTEC_WIRELESS_PAPER_V1_0"),
    (58, "HELTEC_WIRELESS_TRACKER_V1_0"),
    (59, "UNPHONE"),
    (60, "TD_LORAC"),
    (61, "CDEBYTE_EORA_S3"),
    (62, "TWC_MESH_V4"),
    (63, "NRF52_PROMICRO_DIY"),
    (64, "RADIOMASTER_900_BANDIT_NANO"),
    (65, "HELTEC_CAPSULE_SENSOR_V3"),
    (66, "HELTEC_VISION_MASTER_T190"),
    (67, "HELTEC_VISION_MASTER_E213"),
    (68, "HELTEC_VISION_MASTER_E290"),
    (69, "HELTEC_MESH_NODE_T114"),
    (70, "SENSECAP_INDICATOR"),
    (71, "TRACKER_T1000_E"),
    (72, "RAK3172"),
    (73, "WIO_E5"),
    (74, "RADIOMASTER_900_BANDIT"),
    (75, "ME25LS01_4Y10TD"),
    (76, "RP2040_FEATHER_RFM95"),
    (77, "M5STACK_COREBASIC"),
    (78, "M5STACK_CORE2"),
    (79, "RPI_PICO2"),
    (80, "M5STACK_CORES3"),
    (81, "SEEED_XIAO_S3"),
    (82, "MS24SF1"),
    (83, "TLORA_C6"),
    (255, "PRIVATE_HW"),
];

/// Hardware model code as carried in `User.hw_model`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareModel(pub u32);

impl HardwareModel {
    pub fn code(self) -> u32 {
        self.0
    }

    /// Firmware name, if the code is in the table
    pub fn name(self) -> Option<&'static str> {
        HARDWARE_MODELS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }

    /// Look a model up by name (case-insensitive) or by number
    pub fn parse(input: &str) -> CoreResult<Self> {
        let input = input.trim();
        if let Ok(code) = input.parse::<u32>() {
            return Ok(Self(code));
        }
        HARDWARE_MODELS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(input))
            .map(|(code, _)| Self(*code))
            .ok_or_else(|| CoreError::UnknownHardwareModel(input.to_string()))
    }
}

impl Default for HardwareModel {
    fn default() -> Self {
        Self(DEFAULT_HW_MODEL)
    }
}

impl FromStr for HardwareModel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HardwareModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Name for a raw code, or the number as text when unknown
pub fn hw_model_label(code: u32) -> String {
    HardwareModel(code).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_heltec_v3() {
        assert_eq!(HardwareModel::default().name(), Some("HELTEC_V3"));
    }

    #[test]
    fn test_parse_by_name_any_case() {
        assert_eq!(HardwareModel::parse("heltec_v3").unwrap(), HardwareModel(43));
        assert_eq!(HardwareModel::parse("T_DECK").unwrap(), HardwareModel(50));
        assert_eq!(HardwareModel::parse(" Tbeam ").unwrap(), HardwareModel(4));
    }

    #[test]
    fn test_parse_by_number() {
        assert_eq!(HardwareModel::parse("9").unwrap(), HardwareModel(9));
        assert_eq!(HardwareModel::parse("200").unwrap(), HardwareModel(200));
    }

    #[test]
    fn test_parse_unknown_name() {
        assert!(matches!(
            HardwareModel::parse("TOASTER"),
            Err(CoreError::UnknownHardwareModel(_))
        ));
    }

    #[test]
    fn test_label() {
        assert_eq!(hw_model_label(9), "RAK4631");
        assert_eq!(hw_model_label(200), "200");
    }
}
