use std::sync::Once;

use log::LevelFilter;

/// Log target used for messages forwarded from the guest module.
pub const GUEST_TARGET: &str = "guest";

/// How the host wires up `env_logger` for the bridge.
///
/// `env_filter` takes `env_logger` directives ("wasmgl_bridge=debug") and
/// falls back to `RUST_LOG`, then to `level`. `guest` caps the `guest`
/// target on top of whichever filter wins, so a chatty module can be
/// silenced without losing bridge output.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub level: LevelFilter,
    pub guest: Option<LevelFilter>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            level: LevelFilter::Info,
            guest: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    pub fn with_guest_level(mut self, level: LevelFilter) -> Self {
        self.guest = Some(level);
        self
    }

    /// Filter directives to install, given the value of `RUST_LOG`.
    fn directives(&self, env: Option<&str>) -> String {
        let base = match (self.env_filter.as_deref(), env) {
            (Some(filter), _) => filter.to_owned(),
            (None, Some(filter)) if !filter.trim().is_empty() => filter.to_owned(),
            _ => self.level.to_string().to_lowercase(),
        };
        match self.guest {
            Some(level) => format!("{base},{GUEST_TARGET}={}", level.to_string().to_lowercase()),
            None => base,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger on first call; later calls do nothing.
///
/// Returns `false` when the embedder already installed its own logger, in
/// which case bridge and guest records go there instead.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        let env = std::env::var("RUST_LOG").ok();
        let directives = config.directives(env.as_deref());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&directives).write_style(config.write_style);

        installed = builder.try_init().is_ok();
        if installed {
            log::debug!("logging: {directives}");
        }
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── directives ──

    #[test]
    fn falls_back_to_level() {
        let config = LoggingConfig { level: LevelFilter::Warn, ..LoggingConfig::default() };
        assert_eq!(config.directives(None), "warn");
        assert_eq!(config.directives(Some("  ")), "warn");
    }

    #[test]
    fn explicit_filter_beats_environment() {
        let config = LoggingConfig {
            env_filter: Some("wasmgl_bridge=trace".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(config.directives(Some("error")), "wasmgl_bridge=trace");
        assert_eq!(LoggingConfig::default().directives(Some("error")), "error");
    }

    #[test]
    fn guest_level_is_appended() {
        let config = LoggingConfig::default().with_guest_level(LevelFilter::Off);
        assert_eq!(config.directives(Some("debug")), "debug,guest=off");
    }
}
