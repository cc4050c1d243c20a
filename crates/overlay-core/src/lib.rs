//! # Overlay Core
//!
//! 实时叠加控制会话的纯数据层：
//! - 关节/笛卡尔基础类型（[`JointArray`], [`CartVec`]）
//! - 控制模式描述符（[`ControlMode`]）及其校验
//! - 会话配置（[`SessionConfig`]）
//!
//! 本 crate 不依赖任何网络或定时设施，所有校验都可以在
//! 隔离环境中做单元测试。

pub mod config;
pub mod error;
pub mod mode;
pub mod types;

pub use config::SessionConfig;
pub use error::ConfigError;
pub use mode::{AxisGains, CommandMode, ControlMode, NullspaceGains};
pub use types::{CartAxis, CartVec, JOINT_COUNT, JointArray};
