use serde::{Deserialize, Serialize};

/// Platform identifiers grow monotonically with creation time.
pub type PostId = u64;

/// A post that references the bot's handle. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub id: PostId,
    pub text: String,
    pub author: String,
    /// Referenced handles, in the order they appear in the post.
    pub mentioned_handles: Vec<String>,
}

/// One post from a user's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Post {
    pub id: PostId,
    pub text: String,
}

/// What a mention is asking the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Posted by the bot itself; never reacted to.
    SelfMention,
    /// Every extra mention is the bot itself.
    SelfAnalysisRequest,
    MultiTargetRequest,
    NoTarget,
    AnalysisRequest { target: String },
}

// Wire structs for the REST API responses. Only the fields the bot reads.

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiUser {
    pub screen_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiUserMention {
    pub screen_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiEntities {
    #[serde(default)]
    pub user_mentions: Vec<ApiUserMention>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiStatus {
    pub id: PostId,
    #[serde(alias = "full_text")]
    pub text: String,
    pub user: ApiUser,
    pub entities: Option<ApiEntities>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSearchResponse {
    #[serde(default)]
    pub statuses: Vec<ApiStatus>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiTimelineStatus {
    pub id: PostId,
    #[serde(alias = "full_text")]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiMediaUpload {
    pub media_id_string: String,
}

impl From<ApiTimelineStatus> for Post {
    fn from(status: ApiTimelineStatus) -> Self {
        Post {
            id: status.id,
            text: status.text,
        }
    }
}
