//! 宿主配置文件（TOML）
//!
//! 核心不提供任何 CLI/配置面；本模块把 TOML 文件映射为已校验的
//! `SessionConfig` + `ControlMode`，再交给会话内核。参数来源可以
//! 是任何配置通道，这里只是其中一种。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use overlay_core::{CommandMode, ControlMode, SessionConfig};

/// 配置文件根结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// 外部命令流载荷类型
    pub command_mode: CommandMode,

    /// 会话时序与对端
    pub session: SessionConfig,

    /// 控制模式描述符
    pub mode: ControlMode,
}

impl HostConfig {
    /// 从文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.as_ref().display()))?;
        let config: HostConfig = toml::from_str(&content).context("parsing config file")?;
        config.session.validate().context("invalid session timing")?;
        config.mode.validate(config.command_mode).context("invalid control mode")?;
        Ok(config)
    }
}

/// 带注释的默认配置模板（`init-config` 子命令写出）
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Overlay session host configuration
#
# command_mode: what the external command stream carries.
#   "torque"   - external superimposed joint torques (impedance damping must be 0)
#   "position" - external joint position targets
command_mode = "torque"

[session]
# Network endpoint of the external command source
peer_addr = "192.170.10.1:30200"
# Fixed control cycle, milliseconds (torque mode needs a command at least every 5 ms)
cycle_period = 5
# Local control cycles per externally received command (>= 1)
receive_multiplier = 1
# Handshake timeout, milliseconds
handshake_timeout = 10000
# Manipulator-side command staleness tolerance, milliseconds (mirrored, not derived)
staleness_tolerance = 25

[mode]
kind = "joint-impedance"
stiffness = [400.0, 400.0, 400.0, 400.0, 400.0, 400.0, 400.0]
# Zero damping: required while command_mode = "torque"
damping = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]

# Cartesian impedance example:
# [mode]
# kind = "cartesian-impedance"
# nullspace = { stiffness = 0.0, damping = 0.7 }
# axes = [
#     { stiffness = 1000.0, damping = 0.7 },  # X
#     { stiffness = 1000.0, damping = 0.7 },  # Y
#     { stiffness = 1000.0, damping = 0.7 },  # Z
#     { stiffness = 100.0, damping = 0.7 },   # A
#     { stiffness = 100.0, damping = 0.7 },   # B
#     { stiffness = 100.0, damping = 0.7 },   # C
# ]
"#;
