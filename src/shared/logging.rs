use crate::shared::config::{LogFormat, LoggingConfig};
use chrono::{SecondsFormat, Utc};
use env_logger::{Builder, Env};
use log::error;
use serde_json::json;
use std::any::Any;
use std::io::Write;
use std::panic::{self, Location};

/// Install the global logger.
///
/// The configured level is the default; `RUST_LOG` still wins when set.
pub fn init(config: &LoggingConfig) {
    let mut builder = Builder::new();
    builder.filter_level(config.level);
    builder.parse_env(Env::default());

    if config.format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = json!({
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "level": record.level().as_str(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

/// Report panics through the logger instead of raw stderr, so JSON output
/// stays one object per line and the location is kept.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        error!("{}", describe_panic(info.payload(), info.location()));
    }));
}

pub(crate) fn describe_panic(
    payload: &(dyn Any + Send),
    location: Option<&Location<'_>>,
) -> String {
    let message = panic_message(payload);
    match location {
        Some(location) => format!(
            "panicked at {}:{}:{}: {}",
            location.file(),
            location.line(),
            location.column(),
            message
        ),
        None => format!("panicked: {}", message),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic payload")
    }
}
