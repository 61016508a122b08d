use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// 场地模型文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub model_file: String,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            model_file: "config/plant.toml".to_string(),
        }
    }
}

impl PlantConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model_file.trim().is_empty() {
            return Err(anyhow::anyhow!("场地模型文件路径不能为空"));
        }
        Ok(())
    }
}

/// 模拟车辆（loopback）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// 每单位路线代价对应的模拟行驶时间（毫秒）
    pub millis_per_cost_unit: f64,
    /// 每完成一个分段消耗的电量百分比
    pub energy_drain_per_leg: u8,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            millis_per_cost_unit: 0.5,
            energy_drain_per_leg: 5,
        }
    }
}

impl LoopbackConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.millis_per_cost_unit.is_finite() || self.millis_per_cost_unit < 0.0 {
            return Err(anyhow::anyhow!(
                "模拟行驶速度无效: {}",
                self.millis_per_cost_unit
            ));
        }
        if self.energy_drain_per_leg > 100 {
            return Err(anyhow::anyhow!("每分段耗电量不能超过100"));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
    /// 是否启动 Prometheus 指标导出
    pub metrics_enabled: bool,
    pub metrics_listen_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_listen_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的日志级别: {}，支持的级别: {:?}",
                self.log_level,
                valid_levels
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的日志格式: {}，支持的格式: {:?}",
                self.log_format,
                valid_formats
            ));
        }

        if self.metrics_enabled && self.metrics_listen_address.parse::<SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "无效的指标监听地址: {}",
                self.metrics_listen_address
            ));
        }

        Ok(())
    }
}
