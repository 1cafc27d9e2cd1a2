use crate::config::{AppSettings, Credentials};
use crate::models::{
    ApiMediaUpload, ApiSearchResponse, ApiTimelineStatus, ApiUser, Mention, Post, PostId,
};
use crate::oauth;
use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

pub const VERIFY_CREDENTIALS_PATH: &str = "account/verify_credentials.json";
pub const SEARCH_PATH: &str = "search/tweets.json";
pub const USER_TIMELINE_PATH: &str = "statuses/user_timeline.json";
pub const STATUS_UPDATE_PATH: &str = "statuses/update.json";
pub const MEDIA_UPLOAD_PATH: &str = "media/upload.json";

#[derive(Error, Debug)]
pub enum TwitterError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(reqwest::Error),
    #[error("Failed to read media file: {0}")]
    Media(#[source] std::io::Error),
}

/// Everything the bot needs from the social platform.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Handle of the authenticated account.
    async fn whoami(&self) -> Result<String, TwitterError>;

    /// Mentions matching `query`, newest first, strictly newer than `since_id`.
    async fn fetch_mentions(
        &self,
        query: &str,
        since_id: Option<PostId>,
        limit: u32,
    ) -> Result<Vec<Mention>, TwitterError>;

    /// One page (1-based) of a user's most recent posts, newest first.
    async fn fetch_timeline(
        &self,
        user: &str,
        page: u32,
        page_size: u32,
        max_id: Option<PostId>,
    ) -> Result<Vec<Post>, TwitterError>;

    /// Posts `text` in reply to `in_reply_to_id`. An image that cannot be
    /// uploaded is dropped and the text is posted alone.
    async fn reply(
        &self,
        text: &str,
        media: Option<&Path>,
        in_reply_to_id: PostId,
    ) -> Result<(), TwitterError>;
}

fn with_trailing_slash(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}

#[derive(Debug)]
pub struct TwitterApiClient {
    client: Client,
    api_base_url: Url,
    upload_base_url: Url,
    credentials: Credentials,
}

impl TwitterApiClient {
    pub fn new(settings: &AppSettings, credentials: Credentials) -> Result<Self, TwitterError> {
        let api_base_url = with_trailing_slash(&settings.api_base_url)?;
        let upload_base_url = with_trailing_slash(&settings.upload_base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_base_url,
            upload_base_url,
            credentials,
        })
    }

    fn authorization(&self, method: &Method, url: &Url, params: &[(String, String)]) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        oauth::authorization_header(
            &self.credentials,
            method.as_str(),
            url.as_str(),
            params,
            &nonce,
            timestamp,
        )
    }

    /// Sends a signed request. GET params travel in the query string, POST
    /// params as a form body.
    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        params: Vec<(String, String)>,
    ) -> Result<T, TwitterError> {
        debug!("Sending {} request to: {}", method, url);
        let auth = self.authorization(&method, &url, &params);

        let request = self
            .client
            .request(method.clone(), url.clone())
            .header(header::AUTHORIZATION, auth);
        let request = if method == Method::GET {
            request.query(&params)
        } else {
            request.form(&params)
        };

        let response = request.send().await.map_err(TwitterError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!("API Error for {}: {} - {}", url, status, body);
            return Err(TwitterError::Api { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(TwitterError::Deserialization)
    }

    async fn upload_media(&self, media: &Path) -> Result<String, TwitterError> {
        let bytes = tokio::fs::read(media).await.map_err(TwitterError::Media)?;
        let url = self.upload_base_url.join(MEDIA_UPLOAD_PATH)?;
        let params = vec![("media_data".to_string(), base64::encode(&bytes))];
        let uploaded: ApiMediaUpload = self.send_signed(Method::POST, url, params).await?;
        debug!("Uploaded {} as media {}", media.display(), uploaded.media_id_string);
        Ok(uploaded.media_id_string)
    }
}

#[async_trait]
impl SocialClient for TwitterApiClient {
    #[instrument(skip(self))]
    async fn whoami(&self) -> Result<String, TwitterError> {
        let url = self.api_base_url.join(VERIFY_CREDENTIALS_PATH)?;
        let user: ApiUser = self.send_signed(Method::GET, url, Vec::new()).await?;
        Ok(user.screen_name)
    }

    #[instrument(skip(self))]
    async fn fetch_mentions(
        &self,
        query: &str,
        since_id: Option<PostId>,
        limit: u32,
    ) -> Result<Vec<Mention>, TwitterError> {
        let url = self.api_base_url.join(SEARCH_PATH)?;
        let mut params = vec![
            ("q".to_string(), query.to_string()),
            ("count".to_string(), limit.to_string()),
        ];
        if let Some(since_id) = since_id {
            params.push(("since_id".to_string(), since_id.to_string()));
        }

        let response: ApiSearchResponse = self.send_signed(Method::GET, url, params).await?;
        Ok(response.statuses.into_iter().map(Mention::from).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_timeline(
        &self,
        user: &str,
        page: u32,
        page_size: u32,
        max_id: Option<PostId>,
    ) -> Result<Vec<Post>, TwitterError> {
        let url = self.api_base_url.join(USER_TIMELINE_PATH)?;
        let mut params = vec![
            ("screen_name".to_string(), user.to_string()),
            ("page".to_string(), page.to_string()),
            ("count".to_string(), page_size.to_string()),
        ];
        if let Some(max_id) = max_id {
            params.push(("max_id".to_string(), max_id.to_string()));
        }

        let statuses: Vec<ApiTimelineStatus> = self.send_signed(Method::GET, url, params).await?;
        Ok(statuses.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self, text))]
    async fn reply(
        &self,
        text: &str,
        media: Option<&Path>,
        in_reply_to_id: PostId,
    ) -> Result<(), TwitterError> {
        let mut params = vec![
            ("status".to_string(), text.to_string()),
            ("in_reply_to_status_id".to_string(), in_reply_to_id.to_string()),
        ];
        // Media is best effort; the text reply is posted either way
        if let Some(media) = media {
            match self.upload_media(media).await {
                Ok(media_id) => params.push(("media_ids".to_string(), media_id)),
                Err(e) => warn!(
                    "Failed to upload {}, replying without it: {}",
                    media.display(),
                    e
                ),
            }
        }

        let url = self.api_base_url.join(STATUS_UPDATE_PATH)?;
        let _posted: serde_json::Value = self.send_signed(Method::POST, url, params).await?;
        Ok(())
    }
}
