//! Printer adapters for rendered labels
//!
//! Supports:
//! - Network printers (raw ZPL over TCP port 9100)
//! - Spool directories (one `.zpl` file per job, for dry runs)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::types::LabelImage;
use crate::zpl::encode_label;

const DEFAULT_PORT: u16 = 9100;

/// Capability the dispatch queue prints through.
///
/// Failures are classified by [`PrintError::kind`]; the queue never inspects
/// anything else about them.
#[async_trait]
pub trait PrinterAdapter: Send + Sync {
    /// Print one label
    async fn print(&self, image: &LabelImage) -> PrintResult<()>;

    /// Check if the printer is reachable
    async fn is_online(&self) -> bool {
        true
    }
}

/// Device settings supplied by deployment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterConfig {
    /// `tcp://host:port` or `spool:/path/to/dir`
    pub connection: String,
    /// Model identifier, e.g. `zpl-203`
    pub model: String,
    /// Label home offset in millimeters
    pub origin_mm: (f32, f32),
    pub timeout: Duration,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            connection: format!("tcp://127.0.0.1:{}", DEFAULT_PORT),
            model: "zpl-203".to_string(),
            origin_mm: (9.5, 0.0),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Build the adapter described by `config` for a printer running at `dpi`
pub fn connect_printer(config: &PrinterConfig, dpi: u32) -> PrintResult<Arc<dyn PrinterAdapter>> {
    if !config.model.to_ascii_lowercase().starts_with("zpl") {
        return Err(PrintError::InvalidConfig(format!(
            "Unsupported printer model: {}",
            config.model
        )));
    }
    let origin = (
        mm_to_dots(config.origin_mm.0, dpi),
        mm_to_dots(config.origin_mm.1, dpi),
    );

    let conn = config.connection.trim();
    if let Some(addr) = conn.strip_prefix("tcp://") {
        let addr = if addr.contains(':') {
            addr.to_string()
        } else {
            format!("{}:{}", addr, DEFAULT_PORT)
        };
        let printer = NetworkPrinter::from_addr(&addr)?
            .with_timeout(config.timeout)
            .with_origin(origin.0, origin.1);
        info!(addr = %printer.addr(), model = %config.model, "Using network printer");
        Ok(Arc::new(printer))
    } else if let Some(dir) = conn.strip_prefix("spool:") {
        if dir.is_empty() {
            return Err(PrintError::InvalidConfig("Empty spool directory".to_string()));
        }
        let printer = SpoolPrinter::new(dir).with_origin(origin.0, origin.1);
        info!(dir = %printer.dir().display(), model = %config.model, "Using spool printer");
        Ok(Arc::new(printer))
    } else {
        Err(PrintError::InvalidConfig(format!(
            "Unknown printer connection: {}",
            conn
        )))
    }
}

fn mm_to_dots(mm: f32, dpi: u32) -> u32 {
    (mm.max(0.0) / 25.4 * dpi as f32).round() as u32
}

/// Network printer (TCP port 9100)
///
/// ZPL printers accept raw format data on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
    origin: (u32, u32),
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
            origin: (0, 0),
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set label home offset in dots
    pub fn with_origin(mut self, x: u32, y: u32) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl PrinterAdapter for NetworkPrinter {
    #[instrument(skip(self, image), fields(addr = %self.addr))]
    async fn print(&self, image: &LabelImage) -> PrintResult<()> {
        let data = encode_label(image, self.origin.0, self.origin.1);

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        info!(bytes = data.len(), "Connected, sending label");

        tokio::time::timeout(self.timeout, stream.write_all(&data))
            .await
            .map_err(|_| PrintError::Timeout(format!("Write timeout: {}", self.addr)))??;
        stream.flush().await?;

        info!("Label sent");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

/// Writes each job as a ZPL file into a directory
#[derive(Debug)]
pub struct SpoolPrinter {
    dir: PathBuf,
    origin: (u32, u32),
    seq: AtomicU64,
}

impl SpoolPrinter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            origin: (0, 0),
            seq: AtomicU64::new(0),
        }
    }

    /// Set label home offset in dots
    pub fn with_origin(mut self, x: u32, y: u32) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PrinterAdapter for SpoolPrinter {
    #[instrument(skip(self, image), fields(dir = %self.dir.display()))]
    async fn print(&self, image: &LabelImage) -> PrintResult<()> {
        let data = encode_label(image, self.origin.0, self.origin.1);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.dir.join(format!(
            "label-{}-{:04}.zpl",
            Utc::now().format("%Y%m%d%H%M%S"),
            seq
        ));

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &data).await?;

        info!(path = %path.display(), bytes = data.len(), "Label spooled");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        tokio::fs::metadata(&self.dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}
