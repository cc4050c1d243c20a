//! 握手与 UDP 连接集成测试（localhost 回环）

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use overlay_core::SessionConfig;
use overlay_session::connection::{Connection, UdpConnection};
use overlay_session::handshake::{self, HandshakeError};
use overlay_session::packet::{CommandPacket, ExternalCommand, Hello, HelloReply};

fn config_for(peer: std::net::SocketAddr, timeout: Duration) -> SessionConfig {
    SessionConfig { handshake_timeout: timeout, ..SessionConfig::new(peer) }
}

#[cfg(target_os = "linux")]
fn open_fd_count() -> usize {
    std::fs::read_dir("/proc/self/fd").map(|d| d.count()).unwrap_or(0)
}

/// 静默对端：在 handshake_timeout + ε 内返回 Timeout，且不泄漏套接字
#[test]
fn test_silent_peer_times_out_and_leaks_nothing() {
    // 对端绑定但从不应答
    let silent_peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = config_for(silent_peer.local_addr().unwrap(), Duration::from_millis(200));

    #[cfg(target_os = "linux")]
    let fds_before = open_fd_count();

    let start = Instant::now();
    let result = handshake::connect(&config);
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(HandshakeError::Timeout)));
    assert!(elapsed >= Duration::from_millis(200));
    // ε：调度抖动余量
    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");

    #[cfg(target_os = "linux")]
    assert_eq!(open_fd_count(), fds_before, "handshake leaked a socket");
}

/// 对端拒绝：原因原样上报
#[test]
fn test_peer_reject_surfaced() {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let peer_addr = peer.local_addr().unwrap();

    let responder = std::thread::spawn(move || {
        let mut buf = [0u8; 512];
        let (len, from) = peer.recv_from(&mut buf).unwrap();
        let hello: Hello = bincode::deserialize(&buf[..len]).unwrap();
        assert_eq!(hello.cycle_period_us, 5_000);
        let reply = bincode::serialize(&HelloReply::Reject { reason: "busy".to_string() }).unwrap();
        peer.send_to(&reply, from).unwrap();
    });

    let config = config_for(peer_addr, Duration::from_secs(2));
    let result = handshake::connect(&config);
    responder.join().unwrap();

    match result {
        Err(HandshakeError::PeerRejected(reason)) => assert_eq!(reason, "busy"),
        other => panic!("expected PeerRejected, got {other:?}"),
    }
}

/// 对端就绪：握手宣告的时序参数到达对端，连接可用
#[test]
fn test_ready_peer_establishes_connection() {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let peer_addr = peer.local_addr().unwrap();

    let responder = std::thread::spawn(move || {
        let mut buf = [0u8; 512];
        let (len, from) = peer.recv_from(&mut buf).unwrap();
        let hello: Hello = bincode::deserialize(&buf[..len]).unwrap();
        assert_eq!(hello.receive_multiplier, 3);
        let reply = bincode::serialize(&HelloReply::Ready).unwrap();
        peer.send_to(&reply, from).unwrap();
    });

    let mut config = config_for(peer_addr, Duration::from_secs(2));
    config.receive_multiplier = 3;
    let connection = handshake::connect(&config);
    responder.join().unwrap();
    assert!(connection.is_ok());
}

/// 积压命令只保留最新一条（新鲜度优先于连续性）
#[test]
fn test_backlog_drained_to_latest_command() {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let local = UdpSocket::bind("127.0.0.1:0").unwrap();
    local.connect(peer.local_addr().unwrap()).unwrap();
    peer.connect(local.local_addr().unwrap()).unwrap();

    let mut connection = UdpConnection::new(local).unwrap();

    for period_index in 0..3u64 {
        let packet = CommandPacket {
            period_index,
            command: ExternalCommand::Joints(overlay_core::JointArray::uniform(
                period_index as f64,
            )),
            command_mode: overlay_core::CommandMode::Position,
        };
        peer.send(&bincode::serialize(&packet).unwrap()).unwrap();
    }
    // 等待回环报文全部入队
    std::thread::sleep(Duration::from_millis(50));

    let received = connection.try_recv_command().unwrap().expect("expected a command");
    assert_eq!(received.period_index, 2);
    // 队列已清空
    assert!(connection.try_recv_command().unwrap().is_none());

    // close 幂等
    connection.close();
    connection.close();
}
