//! Plain-text tables for store listings

use std::fmt::Write;

use meshjack_core::hw_model_label;
use meshjack_store::{ChannelRecord, NodeRecord, PacketActivity};

const EMPTY: &str = "-";

fn cell<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| EMPTY.to_string())
}

fn coordinate(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.5}", v))
        .unwrap_or_else(|| EMPTY.to_string())
}

/// Render rows under a header, each column padded to its widest cell
fn render(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let mut out = String::new();
    let mut line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect();
        let _ = writeln!(out, "{}", padded.join("  ").trim_end());
    };

    line(header.to_vec());
    line(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().iter().map(String::as_str).collect());
    for row in rows {
        line(row.iter().map(String::as_str).collect());
    }
    out
}

pub fn format_nodes(nodes: &[NodeRecord]) -> String {
    let rows: Vec<Vec<String>> = nodes
        .iter()
        .map(|node| {
            vec![
                node.node_id.clone(),
                cell(&node.short_name),
                cell(&node.long_name),
                node.hw_model.map(hw_model_label).unwrap_or_else(|| EMPTY.to_string()),
                coordinate(node.lat),
                coordinate(node.lon),
                cell(&node.alt),
                cell(&node.battery_level),
                cell(&node.last_seen),
                if node.freeze { "yes".into() } else { EMPTY.into() },
            ]
        })
        .collect();
    render(
        &["NODE", "SHORT", "LONG", "HW", "LAT", "LON", "ALT", "BATT", "LAST SEEN", "FROZEN"],
        &rows,
    )
}

/// Every field of one node, one per line
pub fn format_node(node: &NodeRecord) -> String {
    let fields = [
        ("node_id", node.node_id.clone()),
        ("node_number", node.node_number.value().to_string()),
        ("node_mac", node.node_mac.clone()),
        ("short_name", cell(&node.short_name)),
        ("long_name", cell(&node.long_name)),
        (
            "hw_model",
            node.hw_model.map(hw_model_label).unwrap_or_else(|| EMPTY.to_string()),
        ),
        ("pubkey", cell(&node.pubkey)),
        ("lat", cell(&node.lat)),
        ("lon", cell(&node.lon)),
        ("alt", cell(&node.alt)),
        ("battery_level", cell(&node.battery_level)),
        ("voltage", cell(&node.voltage)),
        ("channel_utilization", cell(&node.channel_utilization)),
        ("air_util_tx", cell(&node.air_util_tx)),
        ("uptime_seconds", cell(&node.uptime_seconds)),
        ("temperature", cell(&node.temperature)),
        ("relative_humidity", cell(&node.relative_humidity)),
        ("barometric_pressure", cell(&node.barometric_pressure)),
        ("gas_resistance", cell(&node.gas_resistance)),
        ("iaq", cell(&node.iaq)),
        ("rssi", cell(&node.rssi)),
        ("snr", cell(&node.snr)),
        ("last_seen", cell(&node.last_seen)),
        ("freeze", node.freeze.to_string()),
    ];
    let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, value) in fields {
        let _ = writeln!(out, "{:<width$}  {}", name, value, width = width);
    }
    out
}

pub fn format_channels(channels: &[ChannelRecord]) -> String {
    let rows: Vec<Vec<String>> = channels
        .iter()
        .map(|channel| {
            vec![
                channel.channel_num.to_string(),
                cell(&channel.channel_id),
                cell(&channel.key),
                channel.members.len().to_string(),
            ]
        })
        .collect();
    render(&["HASH", "NAME", "KEY", "MEMBERS"], &rows)
}

pub fn format_packets(packets: &[PacketActivity]) -> String {
    let rows: Vec<Vec<String>> = packets
        .iter()
        .map(|packet| {
            vec![
                packet.timestamp.to_string(),
                cell(&packet.packet_id),
                packet.from_node_id.clone(),
                packet.to_node_id.clone(),
                cell(&packet.gateway_node_id),
                packet.packet_type.clone(),
                cell(&packet.payload_size),
                cell(&packet.rx_rssi),
                cell(&packet.rx_snr),
                match packet.success {
                    Some(true) => "acked".into(),
                    Some(false) => "pending".into(),
                    None => EMPTY.into(),
                },
            ]
        })
        .collect();
    render(
        &["TIME", "ID", "FROM", "TO", "GATEWAY", "TYPE", "SIZE", "RSSI", "SNR", "ACK"],
        &rows,
    )
}
