//! crates/tricklist_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs carry their JSON shape (camelCase) because the same records
//! are persisted in the key-value scopes and returned on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

//=========================================================================================
// Identity
//=========================================================================================

/// How an identity signed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Email,
    Google,
}

/// The locally simulated signed-in user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub provider: AuthProvider,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Stamped when the identity becomes current. Stored as epoch milliseconds.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Builds the identity for an email/password sign-in.
    ///
    /// The id keeps only `[a-z0-9]` from the email, matching the ids the
    /// real backend hands out.
    pub fn from_email(email: &str, is_owner: bool) -> Self {
        let id_suffix: String = email
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();
        let name = email.split('@').next().unwrap_or(email).to_string();

        Self {
            id: format!("user_{}", id_suffix),
            name,
            email: email.to_string(),
            provider: AuthProvider::Email,
            is_owner,
            picture: None,
            expires_at: None,
        }
    }

    /// Whether the identity is still valid at `now`. Identities that were
    /// never stamped do not expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }
}

//=========================================================================================
// Feedback
//=========================================================================================

/// The kind of feedback submitted. Unrecognized kinds keep the string they
/// were submitted with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedbackKind {
    #[default]
    Suggestion,
    Bug,
    Praise,
    Other(String),
}

impl From<String> for FeedbackKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "suggestion" => FeedbackKind::Suggestion,
            "bug" => FeedbackKind::Bug,
            "praise" => FeedbackKind::Praise,
            _ => FeedbackKind::Other(raw),
        }
    }
}

impl From<FeedbackKind> for String {
    fn from(kind: FeedbackKind) -> Self {
        match kind {
            FeedbackKind::Suggestion => "suggestion".to_string(),
            FeedbackKind::Bug => "bug".to_string(),
            FeedbackKind::Praise => "praise".to_string(),
            FeedbackKind::Other(raw) => raw,
        }
    }
}

/// A single piece of user feedback. The list of these is append-only and capped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    #[serde(rename = "type", default)]
    pub kind: FeedbackKind,
    pub message: String,
    /// The submitter's email, or `"anonymous"` when nobody was signed in.
    pub user_email: String,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// Tricks
//=========================================================================================

/// Rank given to levels outside the known five. They sort after Elite.
pub const UNKNOWN_LEVEL_RANK: u16 = 999;

/// A trick's difficulty. The tricks file is hand-editable, so any other
/// string is kept as `Other` rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrickLevel {
    #[default]
    Beginner,
    Novice,
    Intermediate,
    Advanced,
    Elite,
    Other(String),
}

impl TrickLevel {
    /// Display rank, Beginner first.
    pub fn rank(&self) -> u16 {
        match self {
            TrickLevel::Beginner => 1,
            TrickLevel::Novice => 2,
            TrickLevel::Intermediate => 3,
            TrickLevel::Advanced => 4,
            TrickLevel::Elite => 5,
            TrickLevel::Other(_) => UNKNOWN_LEVEL_RANK,
        }
    }

    /// An empty level string counts as not given.
    pub fn is_blank(&self) -> bool {
        matches!(self, TrickLevel::Other(raw) if raw.is_empty())
    }
}

impl From<String> for TrickLevel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Beginner" => TrickLevel::Beginner,
            "Novice" => TrickLevel::Novice,
            "Intermediate" => TrickLevel::Intermediate,
            "Advanced" => TrickLevel::Advanced,
            "Elite" => TrickLevel::Elite,
            _ => TrickLevel::Other(raw),
        }
    }
}

impl From<TrickLevel> for String {
    fn from(level: TrickLevel) -> Self {
        match level {
            TrickLevel::Beginner => "Beginner".to_string(),
            TrickLevel::Novice => "Novice".to_string(),
            TrickLevel::Intermediate => "Intermediate".to_string(),
            TrickLevel::Advanced => "Advanced".to_string(),
            TrickLevel::Elite => "Elite".to_string(),
            TrickLevel::Other(raw) => raw,
        }
    }
}

fn zero() -> Number {
    Number::from(0u8)
}

/// A trick as stored in the shared tricks file.
///
/// `order_index` and `score` keep whatever JSON number they were given,
/// fractions included. Fields this struct does not model ride along in `extra`
/// so a rewrite of the file never drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trick {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub level: TrickLevel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tips: String,
    #[serde(default = "zero")]
    pub order_index: Number,
    #[serde(default = "zero")]
    pub score: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Incoming fields for a new trick. Missing fields take the store's defaults;
/// `id` is only honoured by imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickDraft {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub level: Option<TrickLevel>,
    pub description: Option<String>,
    pub tips: Option<String>,
    pub order_index: Option<Number>,
    pub score: Option<Number>,
}

/// A field-wise update. `None` leaves the stored value alone; the id is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickPatch {
    pub name: Option<String>,
    pub level: Option<TrickLevel>,
    pub description: Option<String>,
    pub tips: Option<String>,
    pub order_index: Option<Number>,
    pub score: Option<Number>,
}

impl Trick {
    /// A trick with only the required fields set.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: TrickLevel::default(),
            description: String::new(),
            tips: String::new(),
            order_index: zero(),
            score: zero(),
            extra: Map::new(),
        }
    }

    pub fn apply(&mut self, patch: TrickPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tips) = patch.tips {
            self.tips = tips;
        }
        if let Some(order_index) = patch.order_index {
            self.order_index = order_index;
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
    }

    fn order_key(&self) -> f64 {
        self.order_index.as_f64().unwrap_or(0.0)
    }
}

/// Orders tricks for display: by level rank, then by `order_index`.
/// Unknown levels go last.
pub fn sort_for_display(tricks: &mut [Trick]) {
    tricks.sort_by(|a, b| {
        a.level
            .rank()
            .cmp(&b.level.rank())
            .then_with(|| a.order_key().total_cmp(&b.order_key()))
    });
}
