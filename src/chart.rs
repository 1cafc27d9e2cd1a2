use plotters::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to draw chart: {0}")]
    Draw(String),
}

/// Polarity scores indexed by recency: index 0 is the newest post, older
/// posts have increasingly negative indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolaritySeries {
    points: Vec<(i64, f64)>,
}

impl PolaritySeries {
    /// `scores` must be ordered newest first.
    pub fn from_scores(scores: impl IntoIterator<Item = f64>) -> Self {
        Self {
            points: scores
                .into_iter()
                .enumerate()
                .map(|(i, score)| (-(i as i64), score))
                .collect(),
        }
    }

    pub fn points(&self) -> &[(i64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let total: f64 = self.points.iter().map(|(_, p)| p).sum();
        Some(total / self.points.len() as f64)
    }
}

/// Qualitative reading of a mean polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarityLabel {
    VeryPositive,
    Positive,
    PositivelyNeutral,
    NegativelyNeutral,
    Negative,
    VeryNegative,
}

impl PolarityLabel {
    pub fn from_mean(mean: f64) -> Self {
        if mean >= 0.75 {
            PolarityLabel::VeryPositive
        } else if mean >= 0.5 {
            PolarityLabel::Positive
        } else if mean >= 0.0 {
            PolarityLabel::PositivelyNeutral
        } else if mean >= -0.5 {
            PolarityLabel::NegativelyNeutral
        } else if mean >= -0.75 {
            PolarityLabel::Negative
        } else {
            PolarityLabel::VeryNegative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolarityLabel::VeryPositive => "Very Positive",
            PolarityLabel::Positive => "Positive",
            PolarityLabel::PositivelyNeutral => "Positively Neutral",
            PolarityLabel::NegativelyNeutral => "Negatively Neutral",
            PolarityLabel::Negative => "Negative",
            PolarityLabel::VeryNegative => "Very Negative",
        }
    }
}

impl fmt::Display for PolarityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Green for a non-negative mean, red otherwise; intensity is `|mean|`.
pub fn polarity_color(mean: f64) -> (u8, u8, u8) {
    let intensity = (mean.abs().min(1.0) * 255.0).round() as u8;
    if mean >= 0.0 {
        (0, intensity, 0)
    } else {
        (intensity, 0, 0)
    }
}

pub trait ChartRenderer: Send + Sync {
    /// Writes the chart for `target` into `out_dir`, replacing any earlier
    /// one, and returns its path.
    fn render(
        &self,
        series: &PolaritySeries,
        target: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, ChartError>;
}

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 800;
/// Reference levels drawn across the plot: strongly/likely negative,
/// neutral, likely/strongly positive.
const LEVELS: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];

/// Renders the polarity series as a PNG line chart, coloured by the mean.
#[derive(Debug, Clone, Default)]
pub struct PngChartRenderer;

impl PngChartRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn chart_path(target: &str, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.png", target))
    }

    fn draw(&self, series: &PolaritySeries, path: &Path) -> Result<(), ChartError> {
        let (r, g, b) = polarity_color(series.mean().unwrap_or(0.0));
        // x spans [-(n-1), 0]; a lone point sits on the right edge
        let oldest = -(series.len().saturating_sub(1).max(1) as i64);

        let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(40)
            .build_cartesian_2d(oldest..0i64, -1.0f64..1.0f64)
            .map_err(draw_error)?;

        for level in LEVELS {
            chart
                .draw_series(LineSeries::new(
                    vec![(oldest, level), (0, level)],
                    BLACK.mix(0.3).stroke_width(1),
                ))
                .map_err(draw_error)?;
        }
        if !series.is_empty() {
            chart
                .draw_series(LineSeries::new(
                    series.points().iter().copied(),
                    RGBColor(r, g, b).stroke_width(2),
                ))
                .map_err(draw_error)?;
        }

        root.present().map_err(draw_error)?;
        Ok(())
    }
}

fn draw_error(e: impl fmt::Display) -> ChartError {
    ChartError::Draw(e.to_string())
}

impl ChartRenderer for PngChartRenderer {
    fn render(
        &self,
        series: &PolaritySeries,
        target: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, ChartError> {
        fs::create_dir_all(out_dir)?;
        let path = Self::chart_path(target, out_dir);
        self.draw(series, &path)?;
        debug!(
            "Drew {} point(s) for @{}, generally a {} user",
            series.len(),
            target,
            PolarityLabel::from_mean(series.mean().unwrap_or(0.0))
        );
        Ok(path)
    }
}
