//! 会话配置
//!
//! 每个会话从调用方提供的配置构造一次，会话中途不再重新校验。
//! 宿主侧通常从 TOML 文件反序列化本结构。

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// 默认控制周期：5ms（力矩模式下控制器要求至少每 5ms 一条命令）
pub const DEFAULT_CYCLE_PERIOD: Duration = Duration::from_millis(5);

/// 默认握手超时：10s
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// 默认命令过期容限：25ms
///
/// 该容限由机械臂控制器在外部强制执行；此处只是镜像其数值
/// 用于提前校验，不重新推导。
pub const DEFAULT_STALENESS_TOLERANCE: Duration = Duration::from_millis(25);

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 外部命令源的网络端点
    pub peer_addr: SocketAddr,

    /// 固定控制周期
    #[serde(default = "default_cycle_period", with = "duration_millis")]
    pub cycle_period: Duration,

    /// 接收倍率：每收到一条外部命令对应的本地控制周期数
    ///
    /// 用于建模比控制环慢的命令源；必须 >= 1。
    #[serde(default = "default_receive_multiplier")]
    pub receive_multiplier: u32,

    /// 握手超时
    #[serde(default = "default_handshake_timeout", with = "duration_millis")]
    pub handshake_timeout: Duration,

    /// 机械臂控制器的命令过期容限（外部强加的约束）
    #[serde(default = "default_staleness_tolerance", with = "duration_millis")]
    pub staleness_tolerance: Duration,
}

fn default_cycle_period() -> Duration {
    DEFAULT_CYCLE_PERIOD
}

fn default_receive_multiplier() -> u32 {
    1
}

fn default_handshake_timeout() -> Duration {
    DEFAULT_HANDSHAKE_TIMEOUT
}

fn default_staleness_tolerance() -> Duration {
    DEFAULT_STALENESS_TOLERANCE
}

/// Duration <-> 毫秒整数（TOML 配置文件中以毫秒书写）
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

impl SessionConfig {
    /// 使用默认时序参数构造
    pub fn new(peer_addr: SocketAddr) -> Self {
        SessionConfig {
            peer_addr,
            cycle_period: DEFAULT_CYCLE_PERIOD,
            receive_multiplier: 1,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            staleness_tolerance: DEFAULT_STALENESS_TOLERANCE,
        }
    }

    /// 外部命令之间的有效间隔（新鲜度预算）
    pub fn staleness_budget(&self) -> Duration {
        self.cycle_period * self.receive_multiplier
    }

    /// 校验时序约束
    ///
    /// `cycle_period * receive_multiplier` 不得超过控制器的命令
    /// 过期容限，否则控制器会在会话中途自行中止 —— 这里提前
    /// 拒绝，而不是等对端报错。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_period.is_zero() {
            return Err(ConfigError::InvalidCyclePeriod);
        }
        if self.receive_multiplier < 1 {
            return Err(ConfigError::InvalidReceiveMultiplier(self.receive_multiplier));
        }
        let budget = self.staleness_budget();
        if budget > self.staleness_tolerance {
            return Err(ConfigError::StalenessBudgetExceeded {
                budget,
                tolerance: self.staleness_tolerance,
            });
        }
        Ok(())
    }
}
