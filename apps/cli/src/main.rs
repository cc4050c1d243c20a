//! # Overlay CLI
//!
//! 叠加控制会话的宿主命令行工具。
//!
//! ```bash
//! # 生成带注释的默认配置
//! overlay-cli init-config session.toml
//!
//! # 只校验配置，不打开任何网络资源
//! overlay-cli check --config session.toml
//!
//! # 运行会话（Ctrl+C 协作式停止）
//! overlay-cli run --config session.toml
//! ```
//!
//! 会话内核本身没有 CLI 面；本工具只负责把配置文件喂给内核，
//! 并用内置的原地保持执行器演示完整会话路径（无厂商硬件）。

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config_file;

use config_file::{DEFAULT_CONFIG_TEMPLATE, HostConfig};
use overlay_session::executor::HoldInPlaceExecutor;
use overlay_session::loop_runner::StopHandle;
use overlay_session::session::OverlaySession;

/// Overlay CLI - 实时叠加控制会话宿主
#[derive(Parser, Debug)]
#[command(name = "overlay-cli")]
#[command(about = "Host CLI for real-time arm overlay control sessions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行一次完整会话（握手 + 控制环），Ctrl+C 停止
    Run {
        /// TOML 配置文件路径
        #[arg(long)]
        config: PathBuf,

        /// 可选运行时长（秒）；到时自动停止
        #[arg(long)]
        duration: Option<f64>,
    },

    /// 校验配置文件（不打开任何网络资源）
    Check {
        /// TOML 配置文件路径
        #[arg(long)]
        config: PathBuf,
    },

    /// 写出带注释的默认配置模板
    InitConfig {
        /// 目标文件路径
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, duration } => run_session(&config, duration),
        Commands::Check { config } => {
            let host = HostConfig::load(&config)?;
            println!(
                "ok: peer={} cycle={}ms multiplier={} mode={:?}",
                host.session.peer_addr,
                host.session.cycle_period.as_millis(),
                host.session.receive_multiplier,
                host.command_mode,
            );
            Ok(())
        },
        Commands::InitConfig { path } => {
            if path.exists() {
                bail!("{} already exists, refusing to overwrite", path.display());
            }
            std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {}", path.display());
            Ok(())
        },
    }
}

fn run_session(config_path: &PathBuf, duration: Option<f64>) -> Result<()> {
    let host = HostConfig::load(config_path)?;
    let session = OverlaySession::new(host.session, host.mode, host.command_mode)
        .context("session configuration rejected")?;

    let stop = StopHandle::new();

    // Ctrl+C -> 协作式停止（只阻止下一个周期，不打断进行中的周期）
    let ctrlc_stop = stop.clone();
    ctrlc::set_handler(move || {
        info!("ctrl-c received, stopping after current cycle");
        ctrlc_stop.stop();
    })
    .context("installing ctrl-c handler")?;

    if let Some(secs) = duration {
        let timed_stop = stop.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs_f64(secs));
            timed_stop.stop();
        });
    }

    let mut executor = HoldInPlaceExecutor::default();
    let outcome = session.run(&mut executor, stop.token())?;
    println!("session ended: {outcome:?}");
    Ok(())
}
