//! Test modules for the bot, organized by the module they test, plus the
//! fakes they share.


use crate::chart::{ChartError, ChartRenderer, PolaritySeries, PngChartRenderer};
use crate::config::AppSettings;
use crate::cursor::{CursorError, CursorStore};
use crate::models::{Mention, Post, PostId};
use crate::pipeline::{AnalysisPipeline, PipelineSettings};
use crate::polling::PollingService;
use crate::sentiment::SentimentScorer;
use crate::twitter::{SocialClient, TwitterError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const TEST_BOT_HANDLE: &str = "bot";

pub(crate) fn mention(id: PostId, author: &str, handles: &[&str]) -> Mention {
    let text = handles
        .iter()
        .map(|h| format!("@{}", h))
        .chain(std::iter::once("analyze please".to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    Mention {
        id,
        text,
        author: author.to_string(),
        mentioned_handles: handles.iter().map(|h| h.to_string()).collect(),
    }
}

pub(crate) fn post(id: PostId, text: &str) -> Post {
    Post {
        id,
        text: text.to_string(),
    }
}

pub(crate) fn api_error() -> TwitterError {
    TwitterError::Api {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "over capacity".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SentReply {
    pub text: String,
    pub media: Option<PathBuf>,
    pub in_reply_to_id: PostId,
}

/// Scripted platform client. Queued responses are handed out in order;
/// an exhausted queue answers with an empty page.
#[derive(Default)]
pub(crate) struct FakeClient {
    pub mention_batches: Mutex<VecDeque<Result<Vec<Mention>, TwitterError>>>,
    pub timelines: Mutex<HashMap<String, VecDeque<Result<Vec<Post>, TwitterError>>>>,
    pub fail_replies: AtomicBool,
    pub mention_calls: Mutex<Vec<(String, Option<PostId>, u32)>>,
    pub timeline_calls: Mutex<Vec<(String, u32, u32, Option<PostId>)>>,
    pub replies: Mutex<Vec<SentReply>>,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_mentions(&self, batch: Vec<Mention>) {
        self.mention_batches.lock().unwrap().push_back(Ok(batch));
    }

    pub fn push_mentions_error(&self) {
        self.mention_batches.lock().unwrap().push_back(Err(api_error()));
    }

    pub fn push_timeline(&self, user: &str, page: Result<Vec<Post>, TwitterError>) {
        self.timelines
            .lock()
            .unwrap()
            .entry(user.to_string())
            .or_default()
            .push_back(page);
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn timeline_call_count(&self, user: &str) -> usize {
        self.timeline_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, ..)| u == user)
            .count()
    }
}

#[async_trait]
impl SocialClient for FakeClient {
    async fn whoami(&self) -> Result<String, TwitterError> {
        Ok(TEST_BOT_HANDLE.to_string())
    }

    async fn fetch_mentions(
        &self,
        query: &str,
        since_id: Option<PostId>,
        limit: u32,
    ) -> Result<Vec<Mention>, TwitterError> {
        self.mention_calls
            .lock()
            .unwrap()
            .push((query.to_string(), since_id, limit));
        self.mention_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_timeline(
        &self,
        user: &str,
        page: u32,
        page_size: u32,
        max_id: Option<PostId>,
    ) -> Result<Vec<Post>, TwitterError> {
        self.timeline_calls
            .lock()
            .unwrap()
            .push((user.to_string(), page, page_size, max_id));
        self.timelines
            .lock()
            .unwrap()
            .get_mut(user)
            .and_then(|pages| pages.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn reply(
        &self,
        text: &str,
        media: Option<&Path>,
        in_reply_to_id: PostId,
    ) -> Result<(), TwitterError> {
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(api_error());
        }
        self.replies.lock().unwrap().push(SentReply {
            text: text.to_string(),
            media: media.map(Path::to_path_buf),
            in_reply_to_id,
        });
        Ok(())
    }
}

/// Cursor store kept in memory, optionally failing every save.
#[derive(Default)]
pub(crate) struct MemoryCursorStore {
    pub initial: Option<PostId>,
    pub fail_saves: bool,
    pub saved: Mutex<Vec<PostId>>,
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> Result<Option<PostId>, CursorError> {
        Ok(self.initial)
    }

    fn save(&self, id: PostId) -> Result<(), CursorError> {
        if self.fail_saves {
            return Err(CursorError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cursor file is locked",
            )));
        }
        self.saved.lock().unwrap().push(id);
        Ok(())
    }
}

/// Reads the polarity straight from the post text, so tests control scores.
pub(crate) struct ParseScorer;

impl SentimentScorer for ParseScorer {
    fn score(&self, text: &str) -> f64 {
        text.trim().parse().unwrap_or(0.0)
    }
}

pub(crate) struct FailingRenderer;

impl ChartRenderer for FailingRenderer {
    fn render(
        &self,
        _series: &PolaritySeries,
        _target: &str,
        _out_dir: &Path,
    ) -> Result<PathBuf, ChartError> {
        Err(ChartError::Io(io::Error::new(
            io::ErrorKind::Other,
            "disk full",
        )))
    }
}

pub(crate) fn test_settings() -> AppSettings {
    let mut settings = AppSettings::default();
    settings.run_seconds = 180;
    settings.poll_interval_seconds = 60;
    settings.mention_batch_size = 100;
    settings.timeline_pages = 1;
    settings.timeline_page_size = 100;
    settings.log_level = "debug".to_string();
    settings
}

pub(crate) fn test_pipeline(
    client: Arc<FakeClient>,
    out_dir: &Path,
    renderer: Arc<dyn ChartRenderer>,
    pages: u32,
    page_size: u32,
) -> AnalysisPipeline {
    AnalysisPipeline::new(
        client,
        Arc::new(ParseScorer),
        renderer,
        PipelineSettings {
            pages,
            page_size,
            out_dir: out_dir.to_path_buf(),
        },
    )
}

pub(crate) fn test_service(
    client: Arc<FakeClient>,
    cursor_store: Arc<MemoryCursorStore>,
    out_dir: &Path,
    settings: &AppSettings,
) -> PollingService {
    let pipeline = test_pipeline(
        client.clone(),
        out_dir,
        Arc::new(PngChartRenderer::new()),
        settings.timeline_pages,
        settings.timeline_page_size,
    );
    PollingService::new(
        client,
        pipeline,
        cursor_store,
        TEST_BOT_HANDLE.to_string(),
        settings,
    )
}
