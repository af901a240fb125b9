//! 追踪初始化、连接 ID 与采集计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 采集指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub packets_acked: u64,
    pub rejected_malformed: u64,
    pub rejected_unsupported: u64,
    pub rejected_invalid_coordinates: u64,
    pub rejected_oversized: u64,
    pub unregistered: u64,
    pub lookup_failures: u64,
    pub storage_failures: u64,
    pub reconcile_latency_ms_total: u64,
    pub reconcile_latency_ms_count: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub connections_rejected: u64,
    pub idle_timeouts: u64,
}

/// 采集指标（进程内原子计数）。
#[derive(Default)]
pub struct IngestMetrics {
    packets_received: AtomicU64,
    packets_acked: AtomicU64,
    rejected_malformed: AtomicU64,
    rejected_unsupported: AtomicU64,
    rejected_invalid_coordinates: AtomicU64,
    rejected_oversized: AtomicU64,
    unregistered: AtomicU64,
    lookup_failures: AtomicU64,
    storage_failures: AtomicU64,
    reconcile_latency_ms_total: AtomicU64,
    reconcile_latency_ms_count: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    connections_rejected: AtomicU64,
    idle_timeouts: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_acked: self.packets_acked.load(Ordering::Relaxed),
            rejected_malformed: self.rejected_malformed.load(Ordering::Relaxed),
            rejected_unsupported: self.rejected_unsupported.load(Ordering::Relaxed),
            rejected_invalid_coordinates: self
                .rejected_invalid_coordinates
                .load(Ordering::Relaxed),
            rejected_oversized: self.rejected_oversized.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            reconcile_latency_ms_total: self.reconcile_latency_ms_total.load(Ordering::Relaxed),
            reconcile_latency_ms_count: self.reconcile_latency_ms_count.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<IngestMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static IngestMetrics {
    METRICS.get_or_init(IngestMetrics::new)
}

/// 初始化 tracing（默认 info，RUST_LOG 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的连接 ID，用于关联同一连接上的全部日志。
pub fn new_connection_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录收到的完整报文。
pub fn record_packet_received() {
    metrics().packets_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功归并并应答 ACK 的报文。
pub fn record_packet_acked() {
    metrics().packets_acked.fetch_add(1, Ordering::Relaxed);
}

/// 记录无法识别的报文。
pub fn record_rejected_malformed() {
    metrics().rejected_malformed.fetch_add(1, Ordering::Relaxed);
}

/// 记录已识别但不支持的协议报文。
pub fn record_rejected_unsupported() {
    metrics().rejected_unsupported.fetch_add(1, Ordering::Relaxed);
}

/// 记录经纬度非法的报文。
pub fn record_rejected_invalid_coordinates() {
    metrics()
        .rejected_invalid_coordinates
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录超长行。
pub fn record_rejected_oversized() {
    metrics().rejected_oversized.fetch_add(1, Ordering::Relaxed);
}

/// 记录未登记设备。
pub fn record_unregistered() {
    metrics().unregistered.fetch_add(1, Ordering::Relaxed);
}

/// 记录登记查询失败。
pub fn record_lookup_failure() {
    metrics().lookup_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录归并写入失败。
pub fn record_storage_failure() {
    metrics().storage_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录归并写入耗时（毫秒）。
pub fn record_reconcile_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .reconcile_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .reconcile_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录新建连接。
pub fn record_connection_opened() {
    metrics().connections_opened.fetch_add(1, Ordering::Relaxed);
}

/// 记录关闭连接。
pub fn record_connection_closed() {
    metrics().connections_closed.fetch_add(1, Ordering::Relaxed);
}

/// 记录因容量上限被拒绝的连接。
pub fn record_connection_rejected() {
    metrics()
        .connections_rejected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录空闲超时关闭的连接。
pub fn record_idle_timeout() {
    metrics().idle_timeouts.fetch_add(1, Ordering::Relaxed);
}
