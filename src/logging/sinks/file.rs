use std::fs;

use fanout_error::{FanoutResult, LoggingError};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{registry::LookupSpan, Layer};

use crate::logging::{formatter, FileSinkConfig, LoggingConfig};

/// Файловый слой с ежедневной ротацией и неблокирующей записью.
///
/// Guard должен жить до конца работы процесса, иначе буфер не сбрасывается.
pub fn layer<S>(
    config: &LoggingConfig,
    file: &FileSinkConfig,
) -> FanoutResult<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fs::create_dir_all(&file.dir).map_err(|source| LoggingError::CreateDir {
        dir: file.dir.clone(),
        source,
    })?;

    let appender = rolling::daily(&file.dir, &file.prefix);
    let (writer, guard) = non_blocking(appender);

    Ok((formatter::build_layer(config, writer, false), guard))
}
