//! Typed Node Field Edits
//!
//! Administrative edits name a column and a textual value. Each column maps
//! to one variant with a typed payload; `null`, `none` or an empty value
//! clears an optional field.

use std::fmt;
use std::str::FromStr;

use meshjack_core::HardwareModel;

use crate::errors::{StoreError, StoreResult};
use crate::records::NodeRecord;

/// One editable node field with its new value
#[derive(Debug, Clone, PartialEq)]
pub enum NodeField {
    ShortName(Option<String>),
    LongName(Option<String>),
    HwModel(Option<u32>),
    Pubkey(Option<String>),
    Lat(Option<f64>),
    Lon(Option<f64>),
    Alt(Option<i32>),
    BatteryLevel(Option<u32>),
    Voltage(Option<f64>),
    ChannelUtilization(Option<f64>),
    AirUtilTx(Option<f64>),
    UptimeSeconds(Option<u32>),
    Temperature(Option<f64>),
    RelativeHumidity(Option<f64>),
    BarometricPressure(Option<f64>),
    GasResistance(Option<f64>),
    Iaq(Option<u32>),
    Rssi(Option<i32>),
    Snr(Option<f64>),
    LastSeen(Option<u64>),
    Freeze(bool),
}

/// Column names accepted by [`NodeField::parse`]
pub const NODE_FIELD_NAMES: &[&str] = &[
    "short_name",
    "long_name",
    "hw_model",
    "pubkey",
    "lat",
    "lon",
    "alt",
    "battery_level",
    "voltage",
    "channel_utilization",
    "air_util_tx",
    "uptime_seconds",
    "temperature",
    "relative_humidity",
    "barometric_pressure",
    "gas_resistance",
    "iaq",
    "rssi",
    "snr",
    "last_seen",
    "freeze",
];

fn is_null(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none")
}

fn optional<T: FromStr>(field: &str, value: &str) -> StoreResult<Option<T>> {
    if is_null(value) {
        return Ok(None);
    }
    value
        .trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| StoreError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn text(value: &str) -> Option<String> {
    if is_null(value) {
        None
    } else {
        Some(value.to_string())
    }
}

fn flag(field: &str, value: &str) -> StoreResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(StoreError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

impl NodeField {
    /// Parse a column name and textual value into a typed edit
    pub fn parse(column: &str, value: &str) -> StoreResult<Self> {
        let column = column.trim().to_ascii_lowercase();
        let field = match column.as_str() {
            "short_name" => NodeField::ShortName(text(value)),
            "long_name" => NodeField::LongName(text(value)),
            "hw_model" => NodeField::HwModel(if is_null(value) {
                None
            } else {
                Some(HardwareModel::parse(value)?.code())
            }),
            "pubkey" => NodeField::Pubkey(text(value).map(|v| v.to_ascii_lowercase())),
            "lat" => NodeField::Lat(optional(&column, value)?),
            "lon" => NodeField::Lon(optional(&column, value)?),
            "alt" => NodeField::Alt(optional(&column, value)?),
            "battery_level" => NodeField::BatteryLevel(optional(&column, value)?),
            "voltage" => NodeField::Voltage(optional(&column, value)?),
            "channel_utilization" => NodeField::ChannelUtilization(optional(&column, value)?),
            "air_util_tx" => NodeField::AirUtilTx(optional(&column, value)?),
            "uptime_seconds" => NodeField::UptimeSeconds(optional(&column, value)?),
            "temperature" => NodeField::Temperature(optional(&column, value)?),
            "relative_humidity" => NodeField::RelativeHumidity(optional(&column, value)?),
            "barometric_pressure" => NodeField::BarometricPressure(optional(&column, value)?),
            "gas_resistance" => NodeField::GasResistance(optional(&column, value)?),
            "iaq" => NodeField::Iaq(optional(&column, value)?),
            "rssi" => NodeField::Rssi(optional(&column, value)?),
            "snr" => NodeField::Snr(optional(&column, value)?),
            "last_seen" => NodeField::LastSeen(optional(&column, value)?),
            "freeze" => NodeField::Freeze(flag(&column, value)?),
            _ => return Err(StoreError::UnknownField(column)),
        };
        Ok(field)
    }

    /// Column name of this field
    pub fn name(&self) -> &'static str {
        match self {
            NodeField::ShortName(_) => "short_name",
            NodeField::LongName(_) => "long_name",
            NodeField::HwModel(_) => "hw_model",
            NodeField::Pubkey(_) => "pubkey",
            NodeField::Lat(_) => "lat",
            NodeField::Lon(_) => "lon",
            NodeField::Alt(_) => "alt",
            NodeField::BatteryLevel(_) => "battery_level",
            NodeField::Voltage(_) => "voltage",
            NodeField::ChannelUtilization(_) => "channel_utilization",
            NodeField::AirUtilTx(_) => "air_util_tx",
            NodeField::UptimeSeconds(_) => "uptime_seconds",
            NodeField::Temperature(_) => "temperature",
            NodeField::RelativeHumidity(_) => "relative_humidity",
            NodeField::BarometricPressure(_) => "barometric_pressure",
            NodeField::GasResistance(_) => "gas_resistance",
            NodeField::Iaq(_) => "iaq",
            NodeField::Rssi(_) => "rssi",
            NodeField::Snr(_) => "snr",
            NodeField::LastSeen(_) => "last_seen",
            NodeField::Freeze(_) => "freeze",
        }
    }

    /// Write the value into a record (ignores the freeze flag)
    pub fn apply(&self, record: &mut NodeRecord) {
        match self.clone() {
            NodeField::ShortName(v) => record.short_name = v,
            NodeField::LongName(v) => record.long_name = v,
            NodeField::HwModel(v) => record.hw_model = v,
            NodeField::Pubkey(v) => record.pubkey = v,
            NodeField::Lat(v) => record.lat = v,
            NodeField::Lon(v) => record.lon = v,
            NodeField::Alt(v) => record.alt = v,
            NodeField::BatteryLevel(v) => record.battery_level = v,
            NodeField::Voltage(v) => record.voltage = v,
            NodeField::ChannelUtilization(v) => record.channel_utilization = v,
            NodeField::AirUtilTx(v) => record.air_util_tx = v,
            NodeField::UptimeSeconds(v) => record.uptime_seconds = v,
            NodeField::Temperature(v) => record.temperature = v,
            NodeField::RelativeHumidity(v) => record.relative_humidity = v,
            NodeField::BarometricPressure(v) => record.barometric_pressure = v,
            NodeField::GasResistance(v) => record.gas_resistance = v,
            NodeField::Iaq(v) => record.iaq = v,
            NodeField::Rssi(v) => record.rssi = v,
            NodeField::Snr(v) => record.snr = v,
            NodeField::LastSeen(v) => record.last_seen = v,
            NodeField::Freeze(v) => record.freeze = v,
        }
    }
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshjack_core::NodeNumber;

    #[test]
    fn test_every_name_parses() {
        for name in NODE_FIELD_NAMES {
            let value = if *name == "freeze" { "true" } else { "1" };
            let field = NodeField::parse(name, value).unwrap();
            assert_eq!(field.name(), *name);
        }
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(NodeField::parse("lat", "-33.4489").unwrap(), NodeField::Lat(Some(-33.4489)));
        assert_eq!(NodeField::parse("hw_model", "t_deck").unwrap(), NodeField::HwModel(Some(50)));
        assert_eq!(NodeField::parse("freeze", "yes").unwrap(), NodeField::Freeze(true));
        assert_eq!(NodeField::parse("long_name", "null").unwrap(), NodeField::LongName(None));
        assert_eq!(NodeField::parse("ALT", "").unwrap(), NodeField::Alt(None));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(NodeField::parse("color", "red"), Err(StoreError::UnknownField(_))));
        assert!(matches!(
            NodeField::parse("battery_level", "lots"),
            Err(StoreError::InvalidValue { .. })
        ));
        assert!(matches!(NodeField::parse("freeze", "maybe"), Err(StoreError::InvalidValue { .. })));
        assert!(matches!(NodeField::parse("hw_model", "toaster"), Err(StoreError::Core(_))));
    }

    #[test]
    fn test_apply() {
        let mut record = NodeRecord::new(NodeNumber(7));
        NodeField::ShortName(Some("AB".into())).apply(&mut record);
        NodeField::Freeze(true).apply(&mut record);
        assert_eq!(record.short_name.as_deref(), Some("AB"));
        assert!(record.freeze);
    }
}
