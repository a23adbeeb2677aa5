use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "lumen_engine=debug,wgpu=warn"). When it is `None`, `RUST_LOG` is used,
/// then `default_level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    /// Caps the chatty wgpu/naga targets at `warn` unless a filter names them.
    pub quiet_backend: bool,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            quiet_backend: true,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

const BACKEND_TARGETS: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// Builds the effective filter string from the config and the `RUST_LOG` value.
fn resolve_filter(config: &LoggingConfig, env: Option<String>) -> String {
    let mut filter = config
        .env_filter
        .clone()
        .or(env)
        .unwrap_or_else(|| config.default_level.to_string().to_lowercase());

    if config.quiet_backend {
        for target in BACKEND_TARGETS {
            if !filter.contains(target) {
                filter.push_str(&format!(",{target}=warn"));
            }
        }
    }
    filter
}

/// Initializes the global logger once.
///
/// Subsequent calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(&config, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        // Another logger may already be installed (e.g. by a test harness).
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized with filter '{filter}'");
    });
}
