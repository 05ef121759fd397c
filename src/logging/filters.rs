use tracing_subscriber::EnvFilter;

use super::LoggingConfig;

/// Строит фильтр: `RUST_LOG`, если задана и корректна, иначе директива из
/// конфигурации, иначе `info`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        return env_filter;
    }

    let directive = config.build_filter_directive();
    match EnvFilter::try_new(&directive) {
        Ok(filter) => filter,
        Err(e) => {
            // Подписчик ещё не установлен, поэтому stderr.
            eprintln!("Invalid log filter directive '{directive}': {e}; falling back to 'info'");
            EnvFilter::new("info")
        }
    }
}
