//! 活动连接
//!
//! 握手成功后，控制环通过 [`Connection`] 与对端交换命令/反馈。
//! 连接在 `Active` 期间由控制环独占，其他组件不得并发读写。
//!
//! [`UdpConnection`] 是默认实现；trait 边界的存在使测试可以用
//! 脚本化连接驱动控制环，与教学硬件无关。

use std::io;
use std::net::UdpSocket;

use thiserror::Error;
use tracing::trace;

use crate::packet::{CommandPacket, FeedbackPacket};

/// 连接层错误
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// 对端断开（底层链路判定）
    #[error("peer disconnected")]
    PeerDisconnected,

    /// IO 错误
    #[error("connection io error: {0}")]
    Io(#[from] io::Error),

    /// 报文编解码失败
    #[error("packet codec error: {0}")]
    Codec(String),
}

/// 命令/反馈交换接口
///
/// 控制环独占持有；`close()` 幂等。
pub trait Connection {
    /// 非阻塞轮询一条入站命令
    ///
    /// `Ok(None)` 表示本周期没有新命令（零阶保持继续生效）。
    /// 多条积压时返回最新一条 —— 新鲜度严格优先于连续性。
    fn try_recv_command(&mut self) -> Result<Option<CommandPacket>, ConnectionError>;

    /// 发送本周期反馈
    fn send_feedback(&mut self, feedback: &FeedbackPacket) -> Result<(), ConnectionError>;

    /// 关闭连接（幂等）
    fn close(&mut self);
}

/// UDP 实现
///
/// 套接字在握手阶段创建并 `connect` 到对端；进入控制环前切换
/// 为非阻塞模式。连接型 UDP 套接字收到 ICMP 端口不可达时由
/// `recv` 返回 `ConnectionRefused`，映射为对端断开。
pub struct UdpConnection {
    socket: Option<UdpSocket>,
    recv_buf: Box<[u8; 2048]>,
}

impl UdpConnection {
    /// 包装一个已 `connect` 到对端的套接字
    ///
    /// 正常路径由握手层调用；自管传输的宿主也可以直接构造。
    pub fn new(socket: UdpSocket) -> Result<Self, ConnectionError> {
        socket.set_nonblocking(true)?;
        Ok(UdpConnection { socket: Some(socket), recv_buf: Box::new([0u8; 2048]) })
    }

    fn socket(&self) -> Result<&UdpSocket, ConnectionError> {
        self.socket.as_ref().ok_or(ConnectionError::PeerDisconnected)
    }
}

impl Connection for UdpConnection {
    fn try_recv_command(&mut self) -> Result<Option<CommandPacket>, ConnectionError> {
        let socket = self.socket.as_ref().ok_or(ConnectionError::PeerDisconnected)?;
        let mut latest = None;
        loop {
            match socket.recv(&mut self.recv_buf[..]) {
                Ok(len) => {
                    let packet: CommandPacket = bincode::deserialize(&self.recv_buf[..len])
                        .map_err(|e| ConnectionError::Codec(e.to_string()))?;
                    trace!(period_index = packet.period_index, "inbound command packet");
                    // 只保留最新一条；旧积压被覆盖
                    latest = Some(packet);
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(latest),
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    return Err(ConnectionError::PeerDisconnected);
                },
                Err(e) => return Err(ConnectionError::Io(e)),
            }
        }
    }

    fn send_feedback(&mut self, feedback: &FeedbackPacket) -> Result<(), ConnectionError> {
        let bytes = bincode::serialize(feedback)
            .map_err(|e| ConnectionError::Codec(e.to_string()))?;
        match self.socket()?.send(&bytes) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                Err(ConnectionError::PeerDisconnected)
            },
            Err(e) => Err(ConnectionError::Io(e)),
        }
    }

    fn close(&mut self) {
        // Option::take 保证幂等：第二次调用是空操作
        if self.socket.take().is_some() {
            trace!("udp connection closed");
        }
    }
}

impl Drop for UdpConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for UdpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpConnection").field("socket", &self.socket).finish_non_exhaustive()
    }
}
