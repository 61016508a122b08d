use std::net::SocketAddr;

use anyhow::{Context, Result};
use fleet_core::config::ObservabilityConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// 按配置安装全局 Prometheus 指标记录器并启动 HTTP 导出端点
///
/// 未启用时什么都不做，调度器中的指标宏保持空操作。必须在 tokio 运行时内调用。
pub fn init_metrics_exporter(config: &ObservabilityConfig) -> Result<()> {
    if !config.metrics_enabled {
        return Ok(());
    }

    let address: SocketAddr = config
        .metrics_listen_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {}", config.metrics_listen_address))?;

    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .context("安装Prometheus指标导出器失败")?;

    info!("Prometheus指标导出已启动: http://{address}/metrics");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_exporter_is_noop() {
        let config = ObservabilityConfig::default();
        assert!(init_metrics_exporter(&config).is_ok());
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let config = ObservabilityConfig {
            metrics_enabled: true,
            metrics_listen_address: "not-an-address".to_string(),
            ..ObservabilityConfig::default()
        };
        assert!(init_metrics_exporter(&config).is_err());
    }
}
