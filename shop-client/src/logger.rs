//! Logging Infrastructure
//!
//! Console output (pretty or JSON) plus, when a log directory is given:
//! - Daily rotating application logs (the last 14 days are kept)
//! - Daily audit logs of admin actions (never pruned)

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Target of audit events; routed to their own file
pub const AUDIT_TARGET: &str = "audit";

/// Application log files kept on disk
const APP_LOG_RETENTION: usize = 14;

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// Initialize logging with optional daily rotating files
///
/// # Arguments
/// * `level` - Default level when `RUST_LOG` is unset (e.g. "info", "debug")
/// * `json_format` - JSON console output instead of the pretty format
/// * `log_dir` - Directory for `app/` and `audit/` log files
///
/// Fails if a global subscriber is already installed.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if json_format {
        layers.push(console.json().with_current_span(true).boxed());
    } else {
        layers.push(console.boxed());
    }

    if let Some(dir) = log_dir {
        let app_log_dir = dir.join("app");
        let audit_log_dir = dir.join("audit");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&audit_log_dir)?;

        let app_log = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("app")
            .filename_suffix("log")
            .max_log_files(APP_LOG_RETENTION)
            .build(&app_log_dir)?;
        let audit_log = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("audit")
            .filename_suffix("log")
            .build(&audit_log_dir)?;

        // Everything except audit events
        let app_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::sync::Mutex::new(app_log))
            .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                meta.target() != AUDIT_TARGET
            }));

        // Audit events only
        let audit_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::sync::Mutex::new(audit_log))
            .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                meta.target() == AUDIT_TARGET
            }));

        layers.push(app_layer.boxed());
        layers.push(audit_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;
    Ok(())
}

/// Console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Audit log helper - records admin actions
///
/// # Examples
/// ```no_run
/// shop_client::audit_log!("admin", "login", "session");
/// shop_client::audit_log!("admin", "delete", "product:42", "Blue Mug");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($user:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            user = $user,
            action = $action,
            resource = $resource,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
    ($user:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            user = $user,
            action = $action,
            resource = $resource,
            details = $details,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}
