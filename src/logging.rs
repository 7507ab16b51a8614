use crate::config::AppConfig;
use crate::ledger::LEDGER_TARGET;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directive for the configured level, with the ledger audit stream
/// switched off when disabled
fn filter_directive(config: &AppConfig) -> String {
    if config.enable_ledger_audit {
        config.log_level.clone()
    } else {
        format!("{},{}=off", config.log_level, LEDGER_TARGET)
    }
}

pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true) // LEDGER entries are found by target
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(audit: bool) -> AppConfig {
        let mut config = AppConfig::from_yaml(
            "log_level: info\nlog_dir: ./logs\nlog_file: t.log\nuse_json: false\nrotation: never\n",
        )
        .unwrap();
        config.enable_ledger_audit = audit;
        config
    }

    #[test]
    fn test_audit_stream_toggle() {
        assert_eq!(filter_directive(&config(true)), "info");
        assert_eq!(filter_directive(&config(false)), "info,LEDGER=off");
    }
}
