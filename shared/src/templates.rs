use std::fs;
use std::path::Path;

use askama::Template;

use crate::chart::{ChartKind, ChartRenderer, ChartSpec};
use crate::error::ChartError;

/// Series colours, in Open/High/Low/Close order.
const PALETTE: [&str; 4] = ["#F44336", "#3F51B5", "#009688", "#FFC107"];
const Y_TICKS: usize = 5;
/// Above this many points only every n-th x label is drawn.
const MAX_X_LABELS: usize = 40;

pub struct Point {
    pub x: f64,
    pub y: f64,
    pub value: String,
    pub label: String,
}

pub struct BarRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub value: String,
    pub label: String,
}

pub struct SeriesView {
    pub name: &'static str,
    pub color: &'static str,
    pub legend_y: f64,
    pub legend_text_y: f64,
    pub points: Vec<Point>,
    pub polyline: String,
    pub bars: Vec<BarRect>,
}

pub struct Tick {
    pub pos: f64,
    pub text: String,
}

#[derive(Template)]
#[template(path = "chart.svg.jinja", escape = "html")]
pub struct SvgChartTemplate {
    pub width: f64,
    pub height: f64,
    pub title: String,
    pub title_x: f64,
    pub line: bool,
    pub plot_left: f64,
    pub plot_right: f64,
    pub plot_top: f64,
    pub plot_bottom: f64,
    pub tick_label_x: f64,
    pub x_label_y: f64,
    pub legend_x: f64,
    pub legend_text_x: f64,
    pub rotation: f64,
    pub y_ticks: Vec<Tick>,
    pub x_labels: Vec<Tick>,
    pub series: Vec<SeriesView>,
}

/// Plain SVG output through an askama template.
#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    pub width: f64,
    pub height: f64,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Value range for the y axis. Bars grow from zero, lines use the data span.
fn y_domain(spec: &ChartSpec) -> (f64, f64) {
    let values = spec.series().into_iter().flat_map(|(_, v)| v.iter().copied());
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if spec.kind == ChartKind::Bar {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    if spec.kind == ChartKind::Bar && lo == 0.0 {
        (lo, hi + pad)
    } else {
        (lo - pad, hi + pad)
    }
}

impl SvgChartRenderer {
    pub fn layout(&self, spec: &ChartSpec) -> SvgChartTemplate {
        let plot_left = 80.0;
        let plot_right = self.width - 130.0;
        let plot_top = 60.0;
        let plot_bottom = self.height - 120.0;
        let plot_w = plot_right - plot_left;
        let plot_h = plot_bottom - plot_top;

        let (y_min, y_max) = y_domain(spec);
        let y_of = |v: f64| plot_bottom - (v - y_min) / (y_max - y_min) * plot_h;

        let n = spec.len().max(1);
        let slot = plot_w / n as f64;
        let center = |i: usize| plot_left + (i as f64 + 0.5) * slot;

        let y_ticks = (0..=Y_TICKS)
            .map(|i| {
                let v = y_min + (y_max - y_min) * i as f64 / Y_TICKS as f64;
                Tick {
                    pos: round2(y_of(v)),
                    text: format!("{:.2}", v),
                }
            })
            .collect();

        let step = spec.len().div_ceil(MAX_X_LABELS).max(1);
        let x_labels = spec
            .labels
            .iter()
            .enumerate()
            .filter(|(i, _)| i % step == 0)
            .map(|(i, label)| Tick {
                pos: round2(center(i)),
                text: label.clone(),
            })
            .collect();

        let group_w = slot * 0.8;
        let bar_w = group_w / spec.series().len() as f64;
        let baseline = y_of(0.0_f64.clamp(y_min, y_max));

        let series = spec
            .series()
            .into_iter()
            .enumerate()
            .map(|(j, (name, values))| {
                let points: Vec<Point> = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Point {
                        x: round2(center(i)),
                        y: round2(y_of(*v)),
                        value: format!("{:.2}", v),
                        label: spec.labels[i].clone(),
                    })
                    .collect();
                let polyline = points
                    .iter()
                    .map(|p| format!("{},{}", p.x, p.y))
                    .collect::<Vec<_>>()
                    .join(" ");
                let bars = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let top = y_of(*v).min(baseline);
                        BarRect {
                            x: round2(plot_left + i as f64 * slot + slot * 0.1 + j as f64 * bar_w),
                            y: round2(top),
                            width: round2(bar_w),
                            height: round2((y_of(*v) - baseline).abs()),
                            value: format!("{:.2}", v),
                            label: spec.labels[i].clone(),
                        }
                    })
                    .collect();
                let legend_y = plot_top + 10.0 + j as f64 * 24.0;
                SeriesView {
                    name,
                    color: PALETTE[j % PALETTE.len()],
                    legend_y,
                    legend_text_y: legend_y + 10.0,
                    points,
                    polyline,
                    bars,
                }
            })
            .collect();

        SvgChartTemplate {
            width: self.width,
            height: self.height,
            title: spec.title.clone(),
            title_x: self.width / 2.0,
            line: spec.kind == ChartKind::Line,
            plot_left,
            plot_right,
            plot_top,
            plot_bottom,
            tick_label_x: plot_left - 8.0,
            x_label_y: plot_bottom + 14.0,
            legend_x: plot_right + 20.0,
            legend_text_x: plot_right + 38.0,
            rotation: spec.x_label_rotation,
            y_ticks,
            x_labels,
            series,
        }
    }

    pub fn render(&self, spec: &ChartSpec) -> Result<String, ChartError> {
        Ok(self.layout(spec).render()?)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render_to_file(&self, spec: &ChartSpec, path: &Path) -> Result<(), ChartError> {
        let svg = self.render(spec)?;
        fs::write(path, svg)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: ChartKind) -> ChartSpec {
        ChartSpec {
            title: "ACME Stock Data from 2024-01-01 to 2024-01-03".into(),
            kind,
            x_label_rotation: 45.0,
            labels: vec!["2024-01-01".into(), "2024-01-02".into(), "2024-01-03".into()],
            open: vec![10.0, 11.0, 12.0],
            high: vec![11.0, 12.0, 13.0],
            low: vec![9.0, 10.0, 11.0],
            close: vec![10.5, 11.5, 12.5],
        }
    }

    #[test]
    fn test_line_chart_has_four_polylines_in_order() {
        let svg = SvgChartRenderer::default().render(&spec(ChartKind::Line)).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 4);
        assert!(!svg.contains("<rect class=\"bar\""));

        let positions: Vec<usize> = ["Open", "High", "Low", "Close"]
            .iter()
            .map(|name| svg.find(&format!(">{}</text>", name)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bar_chart_has_one_rect_per_value() {
        let svg = SvgChartRenderer::default().render(&spec(ChartKind::Bar)).unwrap();
        assert_eq!(svg.matches("<rect class=\"bar\"").count(), 12);
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn test_labels_are_rotated() {
        let svg = SvgChartRenderer::default().render(&spec(ChartKind::Line)).unwrap();
        assert!(svg.contains("rotate(45"));
        assert!(svg.contains(">2024-01-02</text>"));
    }

    #[test]
    fn test_title_is_escaped() {
        let mut s = spec(ChartKind::Line);
        s.title = "A<B & C".into();
        let svg = SvgChartRenderer::default().render(&s).unwrap();
        assert!(svg.contains("A&lt;B &amp; C"));
    }

    #[test]
    fn test_bar_domain_starts_at_zero() {
        let (lo, hi) = y_domain(&spec(ChartKind::Bar));
        assert_eq!(lo, 0.0);
        assert!(hi > 13.0);

        let (lo, _) = y_domain(&spec(ChartKind::Line));
        assert!(lo > 8.0 && lo < 9.0);
    }

    #[test]
    fn test_dense_series_thins_x_labels() {
        let mut s = spec(ChartKind::Line);
        let n = 100;
        s.labels = (0..n).map(|i| format!("L{i}")).collect();
        s.open = vec![1.0; n];
        s.high = vec![2.0; n];
        s.low = vec![0.5; n];
        s.close = vec![1.5; n];
        let layout = SvgChartRenderer::default().layout(&s);
        assert!(layout.x_labels.len() <= MAX_X_LABELS);
        assert_eq!(layout.x_labels[0].text, "L0");
        assert_eq!(layout.series.len(), 4);
        assert_eq!(layout.series[0].points.len(), n);
    }
}
