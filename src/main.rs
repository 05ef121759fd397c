//! Процесс-демонстрация диспетчера.
//!
//! Читает со stdin строки вида `<type> <payload>`, ставит их во входную
//! очередь и раздаёт подписчикам-наблюдателям (`--watch`), которые пишут
//! полученные сообщения в лог.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use fanout::{
    config::Settings,
    logging::{self, LogFormat},
    Dispatcher, Envelope, Subscription,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Аргументы командной строки.
#[derive(Parser, Debug)]
#[command(name = "fanout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "In-process message dispatcher fed from stdin", long_about = None)]
struct Cli {
    /// Файл настроек (toml, yaml или json)
    #[arg(short, long, env = "FANOUT_CONFIG")]
    config: Option<PathBuf>,
    /// Типы сообщений, для которых создаётся наблюдатель
    #[arg(short, long = "watch", value_delimiter = ',')]
    watch: Vec<String>,
    /// Формат логов (перекрывает настройки)
    #[arg(long)]
    log_format: Option<LogFormat>,
    /// Включить debug-логи
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    let log_handle =
        logging::init_logging(settings.logging.clone()).context("failed to initialize logging")?;

    let config = match settings.dispatcher_config() {
        Ok(config) => config,
        Err(err) => {
            logging::log_error(&err);
            return Err(err.into());
        }
    };
    let dispatcher = Dispatcher::<Envelope>::new(config);

    if cli.watch.is_empty() {
        warn!("No --watch types given, every message will be unrouted");
    }
    let mut watchers = Vec::with_capacity(cli.watch.len());
    for msg_type in &cli.watch {
        let (subscriber, subscription) = dispatcher.new_subscriber([msg_type.as_str()]);
        dispatcher.register([&subscriber]);
        watchers.push(tokio::spawn(watch(subscription)));
    }

    dispatcher.start()?;

    tokio::select! {
        sent = feed_stdin(&dispatcher) => {
            let sent = sent?;
            // stop() не вычитывает очередь: ждём, пока цикл заберёт последнее
            // сообщение, затем он доставит его до выхода.
            while dispatcher.metrics().received() < sent {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    dispatcher.stop()?;
    dispatcher.wait_stopped().await;
    let stats = dispatcher.stats();
    info!(?stats, "Dispatcher stopped");

    // Реестр держит последние хэндлы подписчиков: после его уничтожения
    // наблюдатели дочитывают буферы и завершаются.
    drop(dispatcher);
    join_watchers(watchers).await;

    log_handle.shutdown();
    Ok(())
}

/// Ставит в очередь каждую непустую строку stdin, возвращает их количество.
async fn feed_stdin(dispatcher: &Dispatcher) -> Result<u64> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sent = 0u64;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (msg_type, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        dispatcher
            .put_message(Envelope::new(msg_type, payload.trim_start().to_owned()))
            .await?;
        sent += 1;
    }

    info!(sent, "stdin closed");
    Ok(sent)
}

async fn watch(mut subscription: Subscription) {
    let id = subscription.subscriber_id();
    while let Ok(msg) = subscription.recv().await {
        info!(
            subscriber = %id,
            msg_type = %msg.msg_type,
            payload = %String::from_utf8_lossy(&msg.payload),
            "message received"
        );
    }
}

async fn join_watchers(watchers: Vec<JoinHandle<()>>) {
    for watcher in watchers {
        if let Err(e) = watcher.await {
            warn!(error = %e, "watcher task failed");
        }
    }
}
