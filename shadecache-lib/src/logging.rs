// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Logging
//!
//! Libraries in this workspace only emit through `log`.  Binaries call [`init_logging`] once, early
//! in `main`.

use std::sync::Once;

/// `filter` follows `env_logger` syntax, e.g. `"info"` or `"shadecache_gl=debug,naga=warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Debug output for this workspace's crates, warnings for everything else.
    pub fn verbose() -> Self {
        Self {
            filter: Some(
                "warn,shadecache_lib=debug,shadecache_gl=debug,shadecache_assets=debug".to_owned(),
            ),
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger.  Later calls are ignored.
///
/// An explicit filter wins over `RUST_LOG`, which wins over the `info` default.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized");
    });
}
