//! 会话握手
//!
//! 与机械臂控制器建立有时限的连接：宣告控制周期与接收倍率，
//! 阻塞等待对端就绪，超时即失败关闭。
//!
//! 有界等待是强制的 —— 持有运动授权的机器人绝不能无限期等待
//! 一个可能不存在的远端；握手从未完成的连接也绝不会获得运动
//! 授权（超时路径保证套接字在返回前被拆除）。

use std::io;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info};

use overlay_core::SessionConfig;

use crate::connection::{ConnectionError, UdpConnection};
use crate::packet::{Hello, HelloReply};

/// 握手错误
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// 对端在 `handshake_timeout` 内未就绪
    #[error("handshake timed out")]
    Timeout,

    /// 对端明确拒绝本次会话
    #[error("peer rejected session: {0}")]
    PeerRejected(String),

    /// IO 错误
    #[error("handshake io error: {0}")]
    Io(#[from] io::Error),

    /// 应答编解码失败
    #[error("handshake codec error: {0}")]
    Codec(String),
}

/// 建立到 `config.peer_addr` 的活动连接
///
/// 发送 [`Hello`] 宣告 `cycle_period` 与 `receive_multiplier`，
/// 在至多 `handshake_timeout` 内等待 [`HelloReply::Ready`]。
///
/// 超时返回 [`HandshakeError::Timeout`]，部分打开的套接字在
/// 返回前随作用域拆除，不泄漏句柄。
pub fn connect(config: &SessionConfig) -> Result<UdpConnection, HandshakeError> {
    let socket = UdpSocket::bind(local_bind_addr(config))?;
    socket.connect(config.peer_addr)?;

    info!(
        peer = %config.peer_addr,
        cycle_period_ms = config.cycle_period.as_millis() as u64,
        receive_multiplier = config.receive_multiplier,
        "creating overlay connection"
    );

    let hello = Hello {
        cycle_period_us: config.cycle_period.as_micros() as u64,
        receive_multiplier: config.receive_multiplier,
    };
    let hello_bytes =
        bincode::serialize(&hello).map_err(|e| HandshakeError::Codec(e.to_string()))?;
    socket.send(&hello_bytes)?;

    let deadline = Instant::now() + config.handshake_timeout;
    let mut buf = [0u8; 512];

    loop {
        let now = Instant::now();
        if now >= deadline {
            error!(timeout = ?config.handshake_timeout, "handshake timed out");
            return Err(HandshakeError::Timeout);
        }
        // 剩余预算作为本次读超时；截止后不再等待
        socket.set_read_timeout(Some(deadline - now))?;

        match socket.recv(&mut buf) {
            Ok(len) => {
                let reply: HelloReply = bincode::deserialize(&buf[..len])
                    .map_err(|e| HandshakeError::Codec(e.to_string()))?;
                match reply {
                    HelloReply::Ready => {
                        info!("overlay connection established");
                        return UdpConnection::new(socket).map_err(|e| match e {
                            ConnectionError::Io(io) => HandshakeError::Io(io),
                            other => HandshakeError::Codec(other.to_string()),
                        });
                    },
                    HelloReply::Reject { reason } => {
                        error!(reason = %reason, "peer rejected session");
                        return Err(HandshakeError::PeerRejected(reason));
                    },
                }
            },
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                // 读超时到达即整体超时（read timeout == 剩余预算）
                error!(timeout = ?config.handshake_timeout, "handshake timed out");
                return Err(HandshakeError::Timeout);
            },
            // 对端端口未开时的 ICMP 拒绝：退避后重发 Hello，等待对端上线
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                std::thread::sleep(Duration::from_millis(10));
                let _ = socket.send(&hello_bytes);
            },
            Err(e) => return Err(HandshakeError::Io(e)),
        }
    }
}

fn local_bind_addr(config: &SessionConfig) -> &'static str {
    if config.peer_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" }
}
