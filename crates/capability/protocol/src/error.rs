//! 协议错误类型定义

use std::time::Duration;

/// 报文解码失败原因（单条报文级别，连接继续）
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 无法识别的格式
    #[error("malformed packet")]
    Malformed,

    /// 已识别但尚未支持的协议（NMEA 语句、十六进制二进制帧）
    #[error("unsupported protocol")]
    UnsupportedProtocol,

    /// 经纬度无法解析、非有限值或越界
    #[error("invalid coordinates")]
    InvalidCoordinates,
}

impl DecodeError {
    /// 日志与指标使用的原因标识
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnsupportedProtocol => "unsupported-protocol",
            Self::InvalidCoordinates => "invalid-coordinates",
        }
    }
}

/// 单个连接的终止原因（只影响该连接）
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// 套接字错误
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// 空闲读超时
    #[error("idle timeout after {0:?}")]
    Timeout(Duration),

    /// 应答写超时（对端不读）
    #[error("write timeout after {0:?}")]
    WriteTimeout(Duration),
}

/// 监听器级错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 端口绑定失败（唯一的致命错误）
    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置解析错误
    #[error("config parse error: {0}")]
    ConfigParse(String),
}
