use std::io::{self, Stdout};

use tracing_subscriber::{registry::LookupSpan, Layer};

use crate::logging::{formatter, LoggingConfig};

/// Консольный слой (stdout).
pub fn layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> Stdout = io::stdout;
    formatter::build_layer(config, writer, config.with_ansi)
}

#[cfg(test)]
mod tests {
    use tracing::info;
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::LogFormat;

    /// Тест проверяет, что слой строится и принимает события во всех форматах.
    #[test]
    fn test_layer_every_format() {
        for format in [LogFormat::Json, LogFormat::Pretty, LogFormat::Compact] {
            let cfg = LoggingConfig {
                with_ansi: false,
                ..LoggingConfig::default().with_format(format)
            };
            let subscriber = Registry::default().with(layer::<Registry>(&cfg));

            tracing::subscriber::with_default(subscriber, || {
                info!(%format, "console layer smoke test");
            });
        }
    }
}
