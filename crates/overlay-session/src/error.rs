//! 会话层错误类型定义

use overlay_core::ConfigError;
use thiserror::Error;

use crate::handshake::HandshakeError;

/// 会话错误
///
/// 本 crate 没有任何对宿主进程致命的错误：每条错误路径都返回
/// 类型化结果，并保证连接资源在终态上报前已释放。
#[derive(Error, Debug)]
pub enum SessionError {
    /// 配置校验失败（任何网络资源打开之前）
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 握手失败（新会话重试由调用方决定，内核从不自动重试）
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
}
