//! Chart building: from filtered records to an artifact on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, DEFAULT_CHART_RETENTION};
use crate::error::ChartError;
use crate::range::{DateRange, FilteredSeries};
use crate::templates::SvgChartRenderer;

/// Series names, in the order they are added to every chart.
pub const SERIES_NAMES: [&str; 4] = ["Open", "High", "Low", "Close"];

pub const X_LABEL_ROTATION_DEG: f64 = 45.0;

const ARTIFACT_SUFFIX: &str = "_stock_data_chart.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    Line,
    #[default]
    Bar,
}

impl ChartKind {
    /// `line` selects a line chart; anything else is a bar chart.
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim() == "line" {
            ChartKind::Line
        } else {
            ChartKind::Bar
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        }
    }
}

/// Everything a renderer needs: labels plus four parallel price sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x_label_rotation: f64,
    pub labels: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

impl ChartSpec {
    pub fn from_series(
        symbol: &str,
        range: &DateRange,
        kind: ChartKind,
        series: &FilteredSeries,
    ) -> Result<Self, ChartError> {
        let n = series.len();
        let mut spec = ChartSpec {
            title: format!(
                "{} Stock Data from {} to {}",
                symbol,
                range.start().format("%Y-%m-%d"),
                range.end().format("%Y-%m-%d")
            ),
            kind,
            x_label_rotation: X_LABEL_ROTATION_DEG,
            labels: Vec::with_capacity(n),
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
        };

        for (timestamp, bar) in series.iter() {
            spec.labels.push(timestamp.to_string());
            spec.open.push(parse_price(timestamp, "open", &bar.open)?);
            spec.high.push(parse_price(timestamp, "high", &bar.high)?);
            spec.low.push(parse_price(timestamp, "low", &bar.low)?);
            spec.close.push(parse_price(timestamp, "close", &bar.close)?);
        }

        // FilteredSeries is never empty; this only guards against that changing.
        if spec.labels.is_empty() || spec.open.is_empty() {
            return Err(ChartError::EmptyRange);
        }
        Ok(spec)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Named series in fixed order: Open, High, Low, Close.
    pub fn series(&self) -> [(&'static str, &[f64]); 4] {
        [
            (SERIES_NAMES[0], self.open.as_slice()),
            (SERIES_NAMES[1], self.high.as_slice()),
            (SERIES_NAMES[2], self.low.as_slice()),
            (SERIES_NAMES[3], self.close.as_slice()),
        ]
    }
}

fn parse_price(timestamp: &str, field: &'static str, raw: &str) -> Result<f64, ChartError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ChartError::MalformedPrice {
            timestamp: timestamp.to_string(),
            field,
            value: raw.to_string(),
        })
}

/// Turns a [`ChartSpec`] into an image file.
pub trait ChartRenderer: Send + Sync {
    fn render_to_file(&self, spec: &ChartSpec, path: &Path) -> Result<(), ChartError>;
}

/// How artifact files are named inside the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactNaming {
    /// One file per symbol; a new request overwrites the previous chart.
    /// Concurrent requests for the same symbol race, last writer wins.
    #[default]
    PerSymbol,
    /// Symbol plus a random request id. Older files for the symbol are pruned
    /// down to the builder's retention after each build.
    PerRequest,
}

impl ArtifactNaming {
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "per-request" | "per_request" | "unique" => ArtifactNaming::PerRequest,
            _ => ArtifactNaming::PerSymbol,
        }
    }

    pub fn file_name(&self, symbol: &str) -> String {
        let symbol = sanitize_symbol(symbol);
        match self {
            ArtifactNaming::PerSymbol => format!("{}{}", symbol, ARTIFACT_SUFFIX),
            ArtifactNaming::PerRequest => {
                format!("{}_{}{}", symbol, Uuid::new_v4().simple(), ARTIFACT_SUFFIX)
            }
        }
    }
}

/// True for `<symbol>_<32 hex digits>_stock_data_chart.svg`.
fn is_request_artifact(file_name: &str, symbol: &str) -> bool {
    file_name
        .strip_prefix(symbol)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(ARTIFACT_SUFFIX))
        .map(|id| id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Keep a symbol usable as a file name component inside the output directory.
pub fn sanitize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub file_name: String,
    /// Where the artifact is served from.
    pub url: String,
}

pub struct ChartBuilder {
    output_dir: PathBuf,
    base_path: String,
    naming: ArtifactNaming,
    keep: usize,
    renderer: Box<dyn ChartRenderer>,
}

impl ChartBuilder {
    pub fn new(output_dir: impl Into<PathBuf>, base_path: impl Into<String>, naming: ArtifactNaming) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_path: base_path.into(),
            naming,
            keep: DEFAULT_CHART_RETENTION,
            renderer: Box::new(SvgChartRenderer::default()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.charts_dir,
            config.charts_base_path.clone(),
            config.chart_naming,
        )
        .with_retention(config.chart_retention)
    }

    /// Per-request charts kept per symbol, counting the one just built.
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.keep = keep.max(1);
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn build(
        &self,
        symbol: &str,
        range: &DateRange,
        kind: ChartKind,
        series: &FilteredSeries,
    ) -> Result<ChartArtifact, ChartError> {
        let spec = ChartSpec::from_series(symbol, range, kind, series)?;

        fs::create_dir_all(&self.output_dir)?;
        let file_name = self.naming.file_name(symbol);
        let path = self.output_dir.join(&file_name);

        self.renderer.render_to_file(&spec, &path)?;
        info!(
            "Rendered {} {} chart with {} points to {}",
            symbol,
            kind.as_str(),
            spec.len(),
            path.display()
        );

        if self.naming == ArtifactNaming::PerRequest {
            match self.prune(symbol, &file_name) {
                Ok(0) => {}
                Ok(removed) => info!("Pruned {} old {} chart(s)", removed, symbol),
                Err(e) => warn!("Failed to prune old {} charts: {}", symbol, e),
            }
        }

        Ok(ChartArtifact {
            url: format!("{}/{}", self.base_path.trim_end_matches('/'), file_name),
            path,
            file_name,
        })
    }

    fn prune(&self, symbol: &str, current: &str) -> io::Result<usize> {
        let symbol = sanitize_symbol(symbol);
        let mut older: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == current || !is_request_artifact(name, &symbol) {
                continue;
            }
            older.push((entry.metadata()?.modified()?, entry.path()));
        }

        // Newest first; the current chart takes one of the slots.
        older.sort_by(|a, b| b.0.cmp(&a.0));
        let mut removed = 0;
        for (_, path) in older.into_iter().skip(self.keep - 1) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // A concurrent build already pruned it.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}
