use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use label_printer::{
    BackoffPolicy, LabelGeometry, LayoutOptions, PrinterConfig, QueueConfig, SubmitLimits,
};

/// Station configuration - every setting of a label station
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | LABEL_WIDTH_MM | 50 | label stock width |
/// | LABEL_HEIGHT_MM | 26 | label stock height |
/// | PRINTER_DPI | 203 | printer resolution |
/// | SHEET_WIDTH_MM / SHEET_HEIGHT_MM | unset | output sheet the label is mounted on |
/// | PRINTER_CONNECTION | tcp://127.0.0.1:9100 | `tcp://host:port` or `spool:/dir` |
/// | PRINTER_MODEL | zpl-203 | printer model identifier |
/// | PRINTER_TIMEOUT_MS | 5000 | connect and write timeout |
/// | PRINT_ORIGIN_X_MM / PRINT_ORIGIN_Y_MM | 9.5 / 0 | label home offset |
/// | QUEUE_FAILURE_THRESHOLD | 10 | consecutive transient failures tolerated |
/// | QUEUE_BACKOFF_MS | 1000 | delay after the first failure |
/// | QUEUE_BACKOFF_MULTIPLIER | 1.0 | 1.0 = fixed delay |
/// | QUEUE_BACKOFF_MAX_MS | 60000 | delay cap |
/// | MAX_COPIES | 9 | copies allowed per request |
/// | BADGE_TEXT | Inventory | text in the badge pill |
/// | BADGE_LOGO_PATH | unset | logo image drawn instead of the pill |
/// | LOG_LEVEL | info | log level |
/// | LOG_DIR | unset | directory for daily log files |
///
/// # Example
///
/// ```ignore
/// PRINTER_CONNECTION=spool:/tmp/labels label-station print --id A6500-01 --name "Sony A6500"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub label_width_mm: f32,
    pub label_height_mm: f32,
    pub dpi: u32,
    pub sheet_mm: Option<(f32, f32)>,

    pub printer_connection: String,
    pub printer_model: String,
    pub printer_timeout_ms: u64,
    pub origin_mm: (f32, f32),

    pub failure_threshold: u32,
    pub backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub backoff_max_ms: u64,

    pub max_copies: u32,
    pub badge_text: String,
    pub badge_logo_path: Option<PathBuf>,

    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let sheet_w: Option<f32> = env_opt("SHEET_WIDTH_MM").and_then(|v| v.parse().ok());
        let sheet_h: Option<f32> = env_opt("SHEET_HEIGHT_MM").and_then(|v| v.parse().ok());

        Self {
            label_width_mm: env_or("LABEL_WIDTH_MM", 50.0),
            label_height_mm: env_or("LABEL_HEIGHT_MM", 26.0),
            dpi: env_or("PRINTER_DPI", 203),
            sheet_mm: sheet_w.zip(sheet_h),

            printer_connection: std::env::var("PRINTER_CONNECTION")
                .unwrap_or_else(|_| "tcp://127.0.0.1:9100".into()),
            printer_model: std::env::var("PRINTER_MODEL").unwrap_or_else(|_| "zpl-203".into()),
            printer_timeout_ms: env_or("PRINTER_TIMEOUT_MS", 5000),
            origin_mm: (
                env_or("PRINT_ORIGIN_X_MM", 9.5),
                env_or("PRINT_ORIGIN_Y_MM", 0.0),
            ),

            failure_threshold: env_or("QUEUE_FAILURE_THRESHOLD", 10),
            backoff_ms: env_or("QUEUE_BACKOFF_MS", 1000),
            backoff_multiplier: env_or("QUEUE_BACKOFF_MULTIPLIER", 1.0),
            backoff_max_ms: env_or("QUEUE_BACKOFF_MAX_MS", 60_000),

            max_copies: env_or("MAX_COPIES", 9),
            badge_text: std::env::var("BADGE_TEXT").unwrap_or_else(|_| "Inventory".into()),
            badge_logo_path: env_opt("BADGE_LOGO_PATH").map(PathBuf::from),

            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),
        }
    }

    pub fn geometry(&self) -> LabelGeometry {
        let geometry = LabelGeometry::new(self.label_width_mm, self.label_height_mm, self.dpi);
        match self.sheet_mm {
            Some((w, h)) => geometry.with_sheet(w, h),
            None => geometry,
        }
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            badge_text: self.badge_text.clone(),
            badge_logo: self.badge_logo_path.clone(),
        }
    }

    pub fn printer_config(&self) -> PrinterConfig {
        PrinterConfig {
            connection: self.printer_connection.clone(),
            model: self.printer_model.clone(),
            origin_mm: self.origin_mm,
            timeout: Duration::from_millis(self.printer_timeout_ms),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            failure_threshold: self.failure_threshold,
            backoff: BackoffPolicy {
                base: Duration::from_millis(self.backoff_ms),
                multiplier: self.backoff_multiplier,
                max: Duration::from_millis(self.backoff_max_ms.max(self.backoff_ms)),
            },
        }
    }

    pub fn submit_limits(&self) -> SubmitLimits {
        SubmitLimits {
            max_copies: self.max_copies,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
