/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "marduk_imgui=debug"). When absent, `RUST_LOG` is consulted, and when that
/// is unset too `default_level` applies to everything.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub default_level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            default_level: log::LevelFilter::Info,
        }
    }
}

impl LoggingConfig {
    /// Configuration with an explicit filter string, ignoring `RUST_LOG`.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self { env_filter: Some(filter.into()), ..Self::default() }
    }
}

/// Installs `env_logger` as the global logger.
///
/// Returns `false` when a logger was already installed (by an earlier call or
/// by the embedding host); the existing logger is left in place.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut builder = env_logger::Builder::new();

    match config.env_filter {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => match std::env::var("RUST_LOG") {
            Ok(filter) => {
                builder.parse_filters(&filter);
            }
            Err(_) => {
                builder.filter_level(config.default_level);
            }
        },
    }

    builder.write_style(config.write_style);

    let installed = builder.try_init().is_ok();
    if installed {
        log::debug!("logging initialized");
    }
    installed
}
