//! 报文解码
//!
//! 输入为分帧后的一整行，输出 `Reading` 或 `DecodeError`，无副作用。
//!
//! 报文形态按 `PACKET_RULES` 顺序匹配，先匹配者生效：
//!
//! | 顺序 | 形态 | 条件 | 结果 |
//! |---|---|---|---|
//! | 1 | CsvV2 | 字段数 >= 5 | `IMEI,LAT,LNG,SPEED,BATTERY` |
//! | 2 | CsvLegacy | 字段数 3..=4 | `IMEI,LAT,LNG[,SPEED]` |
//! | 3 | Nmea | `$GP` / `$GN` 等语句前缀 | UnsupportedProtocol |
//! | 4 | HexBinary | >= 16 位纯十六进制 | UnsupportedProtocol |
//! | - | 其他 | | Malformed |

use crate::error::DecodeError;
use domain::{ProtocolTag, Reading};

/// 可识别的报文形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketShape {
    CsvV2,
    CsvLegacy,
    Nmea,
    HexBinary,
}

/// 形态匹配规则
pub struct PacketRule {
    pub shape: PacketShape,
    matches: fn(&str, &[&str]) -> bool,
}

impl PacketRule {
    pub fn matches(&self, line: &str, fields: &[&str]) -> bool {
        (self.matches)(line, fields)
    }
}

/// NMEA 语句的 talker 前缀
const NMEA_TALKERS: &[&str] = &["$GP", "$GN", "$GL", "$GA", "$GB", "$BD"];

/// 被视为二进制协议十六进制转储的最短长度
const MIN_HEX_FRAME_LEN: usize = 16;

/// 有序规则表：长形态优先
pub const PACKET_RULES: &[PacketRule] = &[
    PacketRule {
        shape: PacketShape::CsvV2,
        matches: |_, fields| fields.len() >= 5,
    },
    PacketRule {
        shape: PacketShape::CsvLegacy,
        matches: |_, fields| (3..=4).contains(&fields.len()),
    },
    PacketRule {
        shape: PacketShape::Nmea,
        matches: |line, _| NMEA_TALKERS.iter().any(|talker| line.starts_with(talker)),
    },
    PacketRule {
        shape: PacketShape::HexBinary,
        matches: |line, _| {
            line.len() >= MIN_HEX_FRAME_LEN && line.bytes().all(|b| b.is_ascii_hexdigit())
        },
    },
];

/// 按规则表判定报文形态
pub fn classify(line: &str, fields: &[&str]) -> Option<PacketShape> {
    PACKET_RULES
        .iter()
        .find(|rule| rule.matches(line, fields))
        .map(|rule| rule.shape)
}

/// 解码一行报文
pub fn decode(packet: &[u8]) -> Result<Reading, DecodeError> {
    let line = std::str::from_utf8(packet)
        .map_err(|_| DecodeError::Malformed)?
        .trim();
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    match classify(line, &fields) {
        Some(PacketShape::CsvV2) => build_reading(&fields, ProtocolTag::CsvV2),
        Some(PacketShape::CsvLegacy) => build_reading(&fields, ProtocolTag::CsvLegacy),
        Some(PacketShape::Nmea | PacketShape::HexBinary) => Err(DecodeError::UnsupportedProtocol),
        None => Err(DecodeError::Malformed),
    }
}

fn build_reading(fields: &[&str], protocol_tag: ProtocolTag) -> Result<Reading, DecodeError> {
    let device_id = fields[0];
    if device_id.is_empty() {
        return Err(DecodeError::Malformed);
    }
    let latitude = parse_coordinate(fields[1], 90.0)?;
    let longitude = parse_coordinate(fields[2], 180.0)?;
    // 速度缺失或无法解析按 0 处理
    let speed = fields
        .get(3)
        .and_then(|field| parse_finite(field))
        .filter(|speed| *speed >= 0.0)
        .unwrap_or(0.0);
    let battery_level = match protocol_tag {
        ProtocolTag::CsvV2 => fields.get(4).and_then(|field| parse_finite(field)),
        ProtocolTag::CsvLegacy => None,
    };

    Ok(Reading {
        device_id: device_id.to_string(),
        latitude,
        longitude,
        speed,
        battery_level,
        protocol_tag,
    })
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_coordinate(field: &str, bound: f64) -> Result<f64, DecodeError> {
    parse_finite(field)
        .filter(|value| value.abs() <= bound)
        .ok_or(DecodeError::InvalidCoordinates)
}
