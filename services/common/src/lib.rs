use std::{
    env, fs, io,
    net::SocketAddr,
    panic,
    path::{Path, PathBuf},
    str::FromStr,
    thread,
    time::{Duration, SystemTime},
};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const DEFAULT_LOG_DIR: &str = "/var/log/omnisent";

/// Keeps the non-blocking file writer alive; dropping it flushes pending lines.
pub struct TracingGuards {
    _file_guard: Option<WorkerGuard>,
}

/// File logging knobs, read from `LOG_DIR`, `LOG_RETENTION_DAYS` and
/// `LOG_CLEANUP_INTERVAL_MINUTES`.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub root: PathBuf,
    pub retention_days: u64,
    pub cleanup_interval_minutes: u64,
}

impl LogSettings {
    pub fn from_env(service_name: &str) -> Self {
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
        Self {
            root: PathBuf::from(log_dir).join(service_name),
            retention_days: env_or("LOG_RETENTION_DAYS", 14u64),
            cleanup_interval_minutes: env_or("LOG_CLEANUP_INTERVAL_MINUTES", 360u64),
        }
    }
}

pub fn init_tracing(service_name: &str) -> TracingGuards {
    let settings = LogSettings::from_env(service_name);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let file_writer = fs::create_dir_all(&settings.root).ok().and_then(|_| {
        // The rolling appender panics when the directory is not writable.
        panic::catch_unwind(|| {
            tracing_appender::rolling::daily(&settings.root, format!("{service_name}.log"))
        })
        .ok()
    });

    let file_guard = match file_writer {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = Registry::default()
                .with(filter)
                .with(stdout_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer));
            let _ = tracing::subscriber::set_global_default(subscriber);
            spawn_log_cleanup(&settings);
            Some(guard)
        }
        None => {
            let subscriber = Registry::default().with(filter).with(stdout_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
            None
        }
    };

    TracingGuards {
        _file_guard: file_guard,
    }
}

pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Boolean env flag accepting `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => parse_flag(&value).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn spawn_log_cleanup(settings: &LogSettings) {
    if settings.retention_days == 0 || settings.cleanup_interval_minutes == 0 {
        return;
    }

    let root = settings.root.clone();
    let retention = Duration::from_secs(settings.retention_days * 24 * 60 * 60);
    let interval = Duration::from_secs(settings.cleanup_interval_minutes * 60);

    thread::spawn(move || loop {
        if let Some(cutoff) = SystemTime::now().checked_sub(retention) {
            remove_logs_older_than(&root, cutoff);
        }
        thread::sleep(interval);
    });
}

fn remove_logs_older_than(root: &Path, cutoff: SystemTime) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            remove_logs_older_than(&path, cutoff);
            continue;
        }
        let modified = fs::metadata(&path).and_then(|metadata| metadata.modified());
        if matches!(modified, Ok(modified) if modified < cutoff) {
            let _ = fs::remove_file(&path);
        }
    }
}

pub async fn bind_listener(port: u16) -> io::Result<TcpListener> {
    // Bind on all interfaces for container compatibility.
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    tracing::info!("shutdown signal received");
}
