use crate::chart::{ChartError, ChartRenderer, PolarityLabel, PolaritySeries};
use crate::models::{Post, PostId};
use crate::sentiment::SentimentScorer;
use crate::twitter::{SocialClient, TwitterError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to render chart for @{target}: {source}")]
    Render {
        target: String,
        #[source]
        source: ChartError,
    },
}

/// Outcome of analyzing one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub target: String,
    pub path: PathBuf,
    pub post_count: usize,
    pub mean_polarity: Option<f64>,
    pub label: PolarityLabel,
    /// Timeline pages that failed to load.
    pub fetch_errors: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub pages: u32,
    pub page_size: u32,
    pub out_dir: PathBuf,
}

/// Posts collected for a target plus the page failures met on the way.
#[derive(Debug, Default)]
pub struct CollectedTimeline {
    pub posts: Vec<Post>,
    pub errors: Vec<TwitterError>,
}

/// Fetch → score → render for one target.
pub struct AnalysisPipeline {
    client: Arc<dyn SocialClient>,
    scorer: Arc<dyn SentimentScorer>,
    renderer: Arc<dyn ChartRenderer>,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    pub fn new(
        client: Arc<dyn SocialClient>,
        scorer: Arc<dyn SentimentScorer>,
        renderer: Arc<dyn ChartRenderer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            scorer,
            renderer,
            settings,
        }
    }

    /// Pages through the target's timeline. A failed page is logged and
    /// skipped; a short page means the history is exhausted.
    pub async fn collect_posts(&self, target: &str) -> CollectedTimeline {
        let mut collected = CollectedTimeline::default();
        let mut max_id: Option<PostId> = None;

        for page in 1..=self.settings.pages {
            match self
                .client
                .fetch_timeline(target, page, self.settings.page_size, max_id)
                .await
            {
                Ok(posts) => {
                    info!("Retrieved next {} posts of \"{}\" user", posts.len(), target);
                    // Pin later pages to the snapshot seen on the first page
                    if max_id.is_none() {
                        max_id = posts.first().map(|p| p.id);
                    }
                    let exhausted = posts.len() < self.settings.page_size as usize;
                    collected.posts.extend(posts);
                    if exhausted {
                        break;
                    }
                }
                Err(e) => {
                    error!(
                        "Failed to retrieve page {} of posts of \"{}\" user: {}",
                        page, target, e
                    );
                    collected.errors.push(e);
                }
            }
        }

        info!(
            "Totally {} posts were retrieved for \"{}\" user",
            collected.posts.len(),
            target
        );
        collected
    }

    pub async fn analyze(&self, target: &str) -> Result<ChartArtifact, PipelineError> {
        info!("Analyzing posts of \"{}\" user", target);
        let timeline = self.collect_posts(target).await;

        if timeline.posts.is_empty() && !timeline.errors.is_empty() {
            warn!(
                "No posts of \"{}\" could be retrieved, rendering an empty chart",
                target
            );
        }

        let series = PolaritySeries::from_scores(
            timeline.posts.iter().map(|post| self.scorer.score(&post.text)),
        );
        let mean_polarity = series.mean();
        let label = PolarityLabel::from_mean(mean_polarity.unwrap_or(0.0));
        match mean_polarity {
            Some(mean) => info!(
                "Average polarity of \"{}\" posts is {:.4} and they are considered {}",
                target, mean, label
            ),
            None => info!("No posts to score for \"{}\"", target),
        }

        let path = self
            .renderer
            .render(&series, target, &self.settings.out_dir)
            .map_err(|source| PipelineError::Render {
                target: target.to_string(),
                source,
            })?;
        info!(
            "Chart for analysis of \"{}\" posts is saved to \"{}\"",
            target,
            path.display()
        );

        Ok(ChartArtifact {
            target: target.to_string(),
            path,
            post_count: series.len(),
            mean_polarity,
            label,
            fetch_errors: timeline.errors.len(),
        })
    }
}

/// Creates the chart folder if it does not exist yet.
pub fn ensure_chart_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        info!("Folder \"{}\" for analyses charts already exists", dir.display());
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    info!("Created \"{}\" to save analyses charts to", dir.display());
    Ok(())
}
