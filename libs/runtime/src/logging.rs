use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    Layer, Registry,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------

/// Unknown level names fall back to INFO; "off"/"none" disable output.
fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_crate_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Which records a section receives: a named section takes its own crate
/// prefix, the default section takes everything no named section claims.
#[derive(Clone)]
enum Scope {
    Prefix(String),
    Rest(Arc<Vec<String>>),
}

impl Scope {
    fn covers(&self, target: &str) -> bool {
        match self {
            Scope::Prefix(p) => matches_crate_prefix(target, p),
            Scope::Rest(claimed) => !claimed.iter().any(|p| matches_crate_prefix(target, p)),
        }
    }
}

// -------- rotating writer for files --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for RotWriter {
    type Writer = RotWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// -------- path resolution helpers --------

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Create a rotating writer, ensuring the parent directory exists.
fn create_rotating_writer(log_path: &Path, section: &Section) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    // Age-based cleanup wins over a backup count
    let limit = match section.max_age_days {
        Some(days) => FileLimit::Age(chrono::Duration::days(i64::from(days))),
        None => FileLimit::MaxFiles(section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS)),
    };

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(usize::try_from(max_bytes).unwrap_or(usize::MAX)),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

// -------- layer construction --------

fn console_layer(scope: Scope, level: LevelFilter, ansi: bool) -> BoxedLayer {
    fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(filter_fn(move |meta| {
            *meta.level() <= level && scope.covers(meta.target())
        }))
        .boxed()
}

fn file_layer(scope: Scope, level: LevelFilter, writer: RotWriter) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            *meta.level() <= level && scope.covers(meta.target())
        }))
        .boxed()
}

/// Console and file layers of one section. A section with an unusable log
/// file keeps its console output; the failure is reported on stderr since
/// no subscriber exists yet.
fn section_layers(
    scope: Scope,
    section: &Section,
    base_dir: &Path,
    ansi: bool,
) -> Vec<BoxedLayer> {
    let mut layers = Vec::new();

    let console_level = parse_level(&section.console_level);
    if console_level != LevelFilter::OFF {
        layers.push(console_layer(scope.clone(), console_level, ansi));
    }

    let file_level = parse_level(&section.file_level);
    if !section.file.trim().is_empty() && file_level != LevelFilter::OFF {
        let log_path = resolve_log_path(&section.file, base_dir);
        match create_rotating_writer(&log_path, section) {
            Ok(writer) => layers.push(file_layer(scope, file_level, writer)),
            Err(e) => eprintln!(
                "Failed to initialize log file '{}': {}",
                log_path.display(),
                e
            ),
        }
    }

    layers
}

fn build_layers(cfg: &LoggingConfig, base_dir: &Path, ansi: bool) -> Vec<BoxedLayer> {
    let claimed: Arc<Vec<String>> = Arc::new(
        cfg.keys()
            .filter(|k| k.as_str() != "default")
            .cloned()
            .collect(),
    );

    let mut layers = Vec::new();
    if let Some(default_section) = cfg.get("default") {
        layers.extend(section_layers(
            Scope::Rest(claimed.clone()),
            default_section,
            base_dir,
            ansi,
        ));
    }
    for prefix in claimed.iter() {
        if let Some(section) = cfg.get(prefix) {
            layers.extend(section_layers(
                Scope::Prefix(prefix.clone()),
                section,
                base_dir,
                ansi,
            ));
        }
    }
    layers
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
///
/// An empty config logs everything at INFO to the console. Calling this more
/// than once keeps the first subscriber.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    let ansi = std::io::stdout().is_terminal();
    let layers = if cfg.is_empty() {
        vec![console_layer(
            Scope::Rest(Arc::new(Vec::new())),
            LevelFilter::INFO,
            ansi,
        )]
    } else {
        build_layers(cfg, base_dir, ansi)
    };

    let subscriber = Registry::default().with(layers);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("global subscriber already installed; keeping it");
    }
}

// =================== tests ===================
