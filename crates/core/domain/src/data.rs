/// 报文匹配到的解码规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolTag {
    /// `IMEI,LAT,LNG,SPEED,BATTERY`
    CsvV2,
    /// `IMEI,LAT,LNG` 或 `IMEI,LAT,LNG,SPEED`
    CsvLegacy,
}

impl ProtocolTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvV2 => "csv-v2",
            Self::CsvLegacy => "csv-legacy",
        }
    }
}

impl std::fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解码后的单条定位读数（尚未与车辆登记表核对）。
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// 设备上报的标识（IMEI）
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// 速度，缺省为 0
    pub speed: f64,
    /// 电量，未上报时为 None
    pub battery_level: Option<f64>,
    pub protocol_tag: ProtocolTag,
}

/// 车辆在线状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Online,
    Offline,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// 从存储值解析；未知值视为离线。
    pub fn parse(value: &str) -> Self {
        match value {
            "online" => Self::Online,
            _ => Self::Offline,
        }
    }
}
