//! 协议相关类型定义

use async_trait::async_trait;

/// 服务端应答，每条报文恰好一行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// 已完整处理
    Ok,
    /// 解码或写入失败
    Error,
    /// 设备未登记
    Unregistered,
}

impl Ack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ACK",
            Self::Error => "ERROR",
            Self::Unregistered => "ERROR_UNREGISTERED",
        }
    }

    /// 带换行的线路格式
    pub fn line(&self) -> &'static str {
        match self {
            Self::Ok => "ACK\n",
            Self::Error => "ERROR\n",
            Self::Unregistered => "ERROR_UNREGISTERED\n",
        }
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条报文处理器
///
/// 连接处理器对每个完整报文调用一次，并把返回的应答写回设备。
/// 实现方负责吞掉所有错误：设备只会看到三种应答之一。
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle(&self, packet: &[u8]) -> Ack;
}
