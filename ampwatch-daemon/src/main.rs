mod cli;
mod logging;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use ampwatch_core::config::AmpwatchConfig;
use ampwatch_core::error::{AmpwatchError, ConfigError};
use ampwatch_core::pipeline::Pipeline;
use ampwatch_notify_pipeline::{PipelineConfig, SmtpTransport, WatchPipelineBuilder};

use crate::cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    let mut config = load_config(&args).await?;
    apply_cli_overrides(&mut config, &args);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if args.validate {
        println!("configuration ok: {}", args.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %args.config.display(), "ampwatch-daemon starting");

    // 파이프라인 조립
    let pipeline_config = PipelineConfig::from_core(&config);
    let transport = Arc::new(SmtpTransport::from_config(&pipeline_config));
    let (mut pipeline, notification_rx) = WatchPipelineBuilder::new()
        .config(pipeline_config)
        .transport(transport)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build watch pipeline: {}", e))?;

    // 알림 이벤트를 운영 로그로 남기는 태스크
    let mut notification_rx = notification_rx
        .ok_or_else(|| anyhow::anyhow!("pipeline builder did not return a notification channel"))?;
    let event_logger = tokio::spawn(async move {
        while let Some(event) = notification_rx.recv().await {
            if event.delivered {
                tracing::info!(event = %event, "notification delivered");
            } else {
                tracing::warn!(event = %event, "notification delivery failed");
            }
        }
    });

    pipeline
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start watch pipeline: {}", e))?;

    tracing::info!("ampwatch-daemon running — watching for quarantine events");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    if let Err(e) = pipeline.stop().await {
        tracing::error!(error = %e, "failed to stop watch pipeline");
    }
    event_logger.abort();

    tracing::info!("ampwatch-daemon shut down");
    Ok(())
}

/// 설정 파일을 로드합니다.
///
/// 기본 경로의 파일이 없으면 내장 기본값으로 동작합니다.
/// 사용자가 명시한 경로의 파일이 없으면 에러입니다.
async fn load_config(args: &DaemonCli) -> Result<AmpwatchConfig> {
    match AmpwatchConfig::load(&args.config).await {
        Ok(config) => Ok(config),
        Err(AmpwatchError::Config(ConfigError::FileNotFound { path })) => {
            let default_path = std::path::PathBuf::from("/etc/ampwatch/ampwatch.toml");
            if args.config == default_path {
                eprintln!("config file {} not found, using built-in defaults", path);
                let mut config = AmpwatchConfig::default();
                config.apply_env_overrides();
                Ok(config)
            } else {
                Err(anyhow::anyhow!("config file not found: {}", path))
            }
        }
        Err(e) => Err(anyhow::anyhow!("failed to load configuration: {}", e)),
    }
}

/// CLI 인자를 설정에 반영합니다 (파일/환경변수보다 우선).
fn apply_cli_overrides(config: &mut AmpwatchConfig, args: &DaemonCli) {
    if let Some(level) = &args.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(path) = &args.log_path {
        config.watcher.log_path = path.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> DaemonCli {
        DaemonCli::parse_from(["ampwatch-daemon"])
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = AmpwatchConfig::default();
        let args = DaemonCli::parse_from([
            "ampwatch-daemon",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--log-path",
            "/tmp/mail.log",
        ]);

        apply_cli_overrides(&mut config, &args);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.watcher.log_path, "/tmp/mail.log");
    }

    #[test]
    fn cli_defaults() {
        let args = default_args();
        assert_eq!(
            args.config,
            std::path::PathBuf::from("/etc/ampwatch/ampwatch.toml")
        );
        assert!(!args.validate);
        assert!(args.log_level.is_none());
    }

    #[tokio::test]
    async fn explicit_missing_config_is_an_error() {
        let args = DaemonCli::parse_from([
            "ampwatch-daemon",
            "--config",
            "/nonexistent/custom/ampwatch.toml",
        ]);
        assert!(load_config(&args).await.is_err());
    }

    #[tokio::test]
    async fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ampwatch.toml");
        tokio::fs::write(
            &path,
            r#"
[general]
log_level = "debug"

[watcher]
log_path = "/var/log/esa/mail.current"
poll_interval_ms = 250

[smtp]
relay_host = "relay.corp.example"
relay_port = 2525
"#,
        )
        .await
        .unwrap();

        let args = DaemonCli::parse_from([
            "ampwatch-daemon",
            "--config",
            path.to_str().unwrap(),
        ]);
        let config = load_config(&args).await.unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.watcher.log_path, "/var/log/esa/mail.current");
        assert_eq!(config.watcher.poll_interval_ms, 250);
        assert_eq!(config.smtp.relay_host, "relay.corp.example");
        assert_eq!(config.smtp.relay_port, 2525);
        // 지정하지 않은 값은 기본값
        assert_eq!(config.smtp.from_addr, "amp-notify@localhost");
    }
}
