//! # GPS 设备接入协议
//!
//! 设备通过 TCP 长连接上报定位，每条报文一行，服务端逐条回写一行应答。
//!
//! ## 处理链路
//!
//! ```text
//! TcpServer (accept + 准入)
//!       │
//!       ▼
//! serve_connection (每连接一个任务)
//!       │
//!       ├── LineFramer  字节流 → 报文行
//!       │
//!       ▼
//! PacketHandler (解码 → 登记查询 → 状态归并)
//!       │
//!       ▼
//! Ack  ACK / ERROR / ERROR_UNREGISTERED
//! ```
//!
//! ## 报文格式
//!
//! ```text
//! IMEI,LAT,LNG,SPEED,BATTERY   csv-v2
//! IMEI,LAT,LNG[,SPEED]         csv-legacy
//! ```

mod connection;
mod decoder;
mod error;
mod framing;
mod tcp_server;
mod types;

pub use connection::{ConnectionSettings, Disconnect, serve_connection};
pub use decoder::{PACKET_RULES, PacketRule, PacketShape, classify, decode};
pub use error::{ConnectionError, DecodeError, ProtocolError};
pub use framing::{Frame, LineFramer};
pub use tcp_server::{TcpServer, TcpServerConfig};
pub use types::*;
