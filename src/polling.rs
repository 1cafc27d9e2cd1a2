use crate::classifier::classify;
use crate::config::AppSettings;
use crate::cursor::{CursorError, CursorStore};
use crate::ledger::NotificationLedger;
use crate::models::{Intent, Mention, PostId};
use crate::pipeline::{AnalysisPipeline, ChartArtifact, PipelineError};
use crate::twitter::{SocialClient, TwitterError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, warn};

/// Problems met during one cycle. All are logged and none stops the loop.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Failed to fetch mentions: {0}")]
    Fetch(#[source] TwitterError),
    #[error("Failed to fetch {failed_pages} timeline page(s) of @{target}")]
    Timeline { target: String, failed_pages: usize },
    #[error("Failed to analyze posts: {0}")]
    Analysis(#[source] PipelineError),
    #[error("Failed to reply to mention {mention_id}: {source}")]
    Reply {
        mention_id: PostId,
        #[source]
        source: TwitterError,
    },
    #[error("Failed to save last mention id: {0}")]
    Persist(#[source] CursorError),
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub fetched: usize,
    pub intents: Vec<(PostId, Intent)>,
    pub analyses: Vec<ChartArtifact>,
    pub replies_sent: usize,
    pub errors: Vec<CycleError>,
}

/// State carried from one cycle to the next. Owned by the loop driver only.
#[derive(Debug, Default)]
pub struct PollState {
    pub cursor: Option<PostId>,
    pub ledger: NotificationLedger,
}

impl PollState {
    pub fn new(cursor: Option<PostId>) -> Self {
        Self {
            cursor,
            ledger: NotificationLedger::new(),
        }
    }

    /// Moves the cursor to the newest fetched id. Never moves it backward.
    pub fn advance_cursor(&mut self, mentions: &[Mention]) {
        if let Some(newest) = mentions.iter().map(|m| m.id).max() {
            self.cursor = Some(self.cursor.map_or(newest, |current| current.max(newest)));
        }
    }
}

pub fn analysis_reply_text(requester: &str, target: &str) -> String {
    format!("Hi @{} here is the analysis of @{} posts", requester, target)
}

pub fn already_analyzed_reply_text(requester: &str, target: &str) -> String {
    format!(
        "Hi @{}, I've already analyzed @{} posts, find it in my timeline",
        requester, target
    )
}

pub fn no_self_analysis_reply_text(requester: &str) -> String {
    format!(
        "Hi @{}, sorry, but I'm not going to analyze my own posts",
        requester
    )
}

pub fn no_multi_analysis_reply_text(requester: &str) -> String {
    format!(
        "Hi @{}, sorry, but I'm not going to analyze multiple users at a time",
        requester
    )
}

pub struct PollingService {
    client: Arc<dyn SocialClient>,
    pipeline: AnalysisPipeline,
    cursor_store: Arc<dyn CursorStore>,
    self_handle: String,
    poll_interval: Duration,
    run_budget: Duration,
    mention_batch_size: u32,
}

impl PollingService {
    pub fn new(
        client: Arc<dyn SocialClient>,
        pipeline: AnalysisPipeline,
        cursor_store: Arc<dyn CursorStore>,
        self_handle: String,
        config: &AppSettings,
    ) -> Self {
        Self {
            client,
            pipeline,
            cursor_store,
            self_handle,
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            run_budget: Duration::from_secs(config.run_seconds),
            mention_batch_size: config.mention_batch_size,
        }
    }

    /// Loads the stored cursor and polls until the run budget is spent.
    pub async fn start_polling(&self) -> PollState {
        let cursor = match self.cursor_store.load() {
            Ok(cursor) => cursor,
            Err(e) => {
                error!("Failed to load last mention id, starting from now: {}", e);
                None
            }
        };
        self.run(PollState::new(cursor)).await
    }

    /// The budget is checked only between cycles; a started cycle always
    /// runs to completion.
    pub async fn run(&self, mut state: PollState) -> PollState {
        let mut waited = Duration::ZERO;

        loop {
            if waited >= self.run_budget {
                info!("Bot is shutting down now");
                break;
            }
            info!("{}", "-".repeat(40));

            let report = self.run_cycle(&mut state).await;
            debug!(
                "Cycle handled {} mention(s): {} analysis(es), {} reply(ies) sent",
                report.intents.len(),
                report.analyses.len(),
                report.replies_sent
            );
            if !report.errors.is_empty() {
                warn!(
                    "Cycle finished with {} error(s) after {} mention(s)",
                    report.errors.len(),
                    report.fetched
                );
            }

            info!(
                "Preparing to wait for {} seconds",
                self.poll_interval.as_secs()
            );
            time::sleep(self.poll_interval).await;
            waited += self.poll_interval;
            info!(
                "Totally waited for {}/{} ({:.2}%)",
                waited.as_secs(),
                self.run_budget.as_secs(),
                waited.as_secs_f64() / self.run_budget.as_secs_f64() * 100.0
            );
        }

        state
    }

    pub async fn run_cycle(&self, state: &mut PollState) -> CycleReport {
        let mut report = CycleReport::default();
        let query = format!("@{}", self.self_handle);

        match state.cursor {
            Some(since_id) => info!(
                "Retrieving last {} mentions of user \"{}\" done after {}...",
                self.mention_batch_size, self.self_handle, since_id
            ),
            None => info!(
                "Retrieving last {} mentions of user \"{}\"",
                self.mention_batch_size, self.self_handle
            ),
        }

        let mentions = match self
            .client
            .fetch_mentions(&query, state.cursor, self.mention_batch_size)
            .await
        {
            Ok(mentions) => mentions,
            Err(e) => {
                error!("Failed to retrieve mentions of \"{}\": {}", self.self_handle, e);
                report.errors.push(CycleError::Fetch(e));
                Vec::new()
            }
        };

        report.fetched = mentions.len();
        if mentions.is_empty() {
            info!("No mentions of \"{}\" were retrieved at this time", self.self_handle);
        } else {
            info!(
                "Retrieved {} mentions of user \"{}\"",
                mentions.len(),
                self.self_handle
            );
        }

        // Advanced before processing so a failing mention is not retried
        state.advance_cursor(&mentions);

        for mention in &mentions {
            let intent = self.handle_mention(mention, state, &mut report).await;
            report.intents.push((mention.id, intent));
        }

        if let Some(cursor) = state.cursor {
            if let Err(e) = self.cursor_store.save(cursor) {
                error!("Failed to save last mention id {}: {}", cursor, e);
                report.errors.push(CycleError::Persist(e));
            }
        }

        report
    }

    async fn handle_mention(
        &self,
        mention: &Mention,
        state: &mut PollState,
        report: &mut CycleReport,
    ) -> Intent {
        let requester = mention.author.as_str();
        info!("Processing post \"{}\" done by {}", mention.text, requester);

        let intent = classify(mention, &self.self_handle);
        match &intent {
            Intent::SelfMention => {
                info!(
                    "Post \"{}\" is done by the bot itself, so no need to react to it",
                    mention.text
                );
            }
            Intent::SelfAnalysisRequest => {
                info!(
                    "Post \"{}\" is done by \"{}\" but asks bot to analyze itself",
                    mention.text, requester
                );
                if state.ledger.should_notify_self_analysis(requester) {
                    let text = no_self_analysis_reply_text(requester);
                    self.send_reply(&text, None, mention.id, report).await;
                }
            }
            Intent::MultiTargetRequest => {
                info!(
                    "Post \"{}\" is done by \"{}\" but asks bot to analyze multiple users",
                    mention.text, requester
                );
                if state.ledger.should_notify_multi_analysis(requester) {
                    let text = no_multi_analysis_reply_text(requester);
                    self.send_reply(&text, None, mention.id, report).await;
                }
            }
            Intent::NoTarget => {
                info!(
                    "Post \"{}\" has a mention of bot but no other users, skipping it",
                    mention.text
                );
            }
            Intent::AnalysisRequest { target } => {
                if state.ledger.should_run_analysis(target) {
                    self.run_analysis(requester, target, mention.id, report).await;
                } else if state.ledger.should_notify_already_analyzed(requester, target) {
                    let text = already_analyzed_reply_text(requester, target);
                    self.send_reply(&text, None, mention.id, report).await;
                } else {
                    debug!(
                        "\"{}\" was already told about the analysis of \"{}\"",
                        requester, target
                    );
                }
            }
        }

        intent
    }

    async fn run_analysis(
        &self,
        requester: &str,
        target: &str,
        mention_id: PostId,
        report: &mut CycleReport,
    ) {
        let chart = match self.pipeline.analyze(target).await {
            Ok(artifact) => {
                debug!(
                    "@{} is considered {} over {} post(s), mean {:?}",
                    artifact.target, artifact.label, artifact.post_count, artifact.mean_polarity
                );
                if artifact.fetch_errors > 0 {
                    report.errors.push(CycleError::Timeline {
                        target: target.to_string(),
                        failed_pages: artifact.fetch_errors,
                    });
                }
                let path = artifact.path.clone();
                report.analyses.push(artifact);
                Some(path)
            }
            Err(e) => {
                error!("Analysis of \"{}\" produced no chart: {}", target, e);
                report.errors.push(CycleError::Analysis(e));
                None
            }
        };

        let text = analysis_reply_text(requester, target);
        self.send_reply(&text, chart.as_deref(), mention_id, report)
            .await;
    }

    async fn send_reply(
        &self,
        text: &str,
        media: Option<&Path>,
        in_reply_to_id: PostId,
        report: &mut CycleReport,
    ) {
        match self.client.reply(text, media, in_reply_to_id).await {
            Ok(()) => {
                info!("Successfully posted \"{}\"", text);
                report.replies_sent += 1;
            }
            Err(e) => {
                error!("Failed to post the following reply \"{}\": {}", text, e);
                report.errors.push(CycleError::Reply {
                    mention_id: in_reply_to_id,
                    source: e,
                });
            }
        }
    }
}
