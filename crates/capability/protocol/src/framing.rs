//! 按行分帧
//!
//! 把字节流切成以 `\n` 结尾的报文，跨多次读取缓存半行。
//! 空白行是心跳，不产生报文；超过上限的行整体丢弃，只上报一次 `Oversized`。

/// 分帧结果
///
/// 空白行是心跳，不构成报文，也不产生应答。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// 一个完整报文（不含行尾的 `\r\n`）
    Line(Vec<u8>),
    /// 超长行，已丢弃
    Oversized,
}

/// 行分帧器
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_bytes: usize,
    /// 正在丢弃一条已上报过的超长行，直到下一个换行
    discarding: bool,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
            discarding: false,
        }
    }

    /// 追加一次读取到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// 已缓存但尚未成帧的字节数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// 取出下一个完整报文；没有完整行时返回 None
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') else {
                // 行尾的 `\r` 可能先于 `\n` 到达，不计入长度
                let limit = if self.buffer.last() == Some(&b'\r') {
                    self.max_line_bytes + 1
                } else {
                    self.max_line_bytes
                };
                if self.buffer.len() > limit {
                    self.buffer.clear();
                    if !self.discarding {
                        self.discarding = true;
                        return Some(Frame::Oversized);
                    }
                }
                return None;
            };

            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if let Some(frame) = self.complete_line(line) {
                return Some(frame);
            }
        }
    }

    /// 对端关闭时取出最后一段没有换行结尾的数据
    pub fn finish(&mut self) -> Option<Frame> {
        let line = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        self.complete_line(line)
    }

    fn complete_line(&self, mut line: Vec<u8>) -> Option<Frame> {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            return None;
        }
        if line.len() > self.max_line_bytes {
            return Some(Frame::Oversized);
        }
        Some(Frame::Line(line))
    }
}
