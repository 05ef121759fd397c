use tracing_appender::non_blocking::WorkerGuard;

/// Handle системы логирования.
///
/// Держит guard неблокирующего файлового writer'а: при уничтожении handle
/// буфер сбрасывается на диск. Хранить до завершения процесса.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    /// Включён ли файловый sink.
    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Явное завершение: сбрасывает файловый буфер.
    pub fn shutdown(mut self) {
        if let Some(guard) = self.file_guard.take() {
            tracing::debug!("Flushing file log sink");
            drop(guard);
        }
    }
}
