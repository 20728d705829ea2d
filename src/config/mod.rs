// src/config/mod.rs
pub mod monitor;

pub use monitor::{
    MonitorConfig, RendererConfig, DEFAULT_MONITOR_CONFIG_PATH, ENV_MONITOR_CONFIG_PATH,
};
