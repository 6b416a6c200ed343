//! The task entity, its kinds, and create-request validation.
//!
//! A [`Task`] is only ever built by a store: either from a validated
//! [`NewTask`] at insert time ([`Task::new_pending`]) or from a persisted
//! row ([`Task::from_stored`]). Its kind, owner and inputs have no
//! setters; its status only changes through [`Task::start`],
//! [`Task::complete`] and [`Task::fail`].

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::state_machine::{TaskStatus, TransitionError};
use crate::types::{AssetRef, DbId, Timestamp};

/// Maximum length of a prompt, in characters.
pub const MAX_PROMPT_LEN: usize = 4000;

/// Maximum length of an asset reference.
pub const MAX_ASSET_REF_LEN: usize = 2048;

/// Maximum length of a provider selector.
pub const MAX_PROVIDER_LEN: usize = 64;

/// Maximum length of an owner id.
pub const MAX_OWNER_LEN: usize = 128;

/// Recorded when a failure arrives without any message.
pub const UNKNOWN_FAILURE: &str = "Task failed without a diagnostic message";

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What a task asks the provider to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    TextToImage,
    ImageToImage,
    BatchMatting,
    FaceSwap,
}

/// All kinds, in declaration order.
pub const ALL_KINDS: [TaskKind; 4] = [
    TaskKind::TextToImage,
    TaskKind::ImageToImage,
    TaskKind::BatchMatting,
    TaskKind::FaceSwap,
];

impl TaskKind {
    /// Stable string form used in storage, URLs and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::TextToImage => "TEXT_TO_IMAGE",
            TaskKind::ImageToImage => "IMAGE_TO_IMAGE",
            TaskKind::BatchMatting => "BATCH_MATTING",
            TaskKind::FaceSwap => "FACE_SWAP",
        }
    }

    /// Whether the kind transforms an existing image.
    pub fn requires_input_asset(self) -> bool {
        !matches!(self, TaskKind::TextToImage)
    }

    /// Whether the kind needs prompt text. Matting ignores the prompt.
    pub fn requires_prompt(self) -> bool {
        !matches!(self, TaskKind::BatchMatting)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    /// Accepts the wire name in any case, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        ALL_KINDS
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| CoreError::Validation(format!("Unknown task kind: '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Create request
// ---------------------------------------------------------------------------

/// Raw create request as received from the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTask {
    pub kind: String,
    pub prompt: Option<String>,
    pub input_asset: Option<String>,
    pub provider: Option<String>,
    #[serde(skip)]
    pub owner_id: String,
}

/// A validated task that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub owner_id: String,
    pub kind: TaskKind,
    pub prompt: Option<String>,
    pub input_asset: Option<AssetRef>,
    pub provider: Option<String>,
}

impl CreateTask {
    /// Validate the request and normalise it into a [`NewTask`].
    ///
    /// Rules:
    /// - `kind` must name a known [`TaskKind`].
    /// - `owner_id` must not be blank.
    /// - A prompt is required unless the kind is `BatchMatting`, where it
    ///   is dropped.
    /// - An input asset is required unless the kind is `TextToImage`, where
    ///   it is dropped.
    /// - Blank optional fields count as absent; a blank provider selector
    ///   means "use the default".
    pub fn validate(self) -> Result<NewTask, CoreError> {
        let kind: TaskKind = self.kind.parse()?;

        let owner_id = non_blank(Some(self.owner_id)).ok_or_else(|| {
            CoreError::Validation("Owner id must not be empty".to_string())
        })?;
        check_len("Owner id", &owner_id, MAX_OWNER_LEN)?;

        let prompt = if kind.requires_prompt() {
            let prompt = non_blank(self.prompt).ok_or_else(|| {
                CoreError::Validation(format!("A prompt is required for {kind} tasks"))
            })?;
            check_len("Prompt", &prompt, MAX_PROMPT_LEN)?;
            Some(prompt)
        } else {
            None
        };

        let input_asset = if kind.requires_input_asset() {
            let asset = non_blank(self.input_asset).ok_or_else(|| {
                CoreError::Validation(format!("An input asset is required for {kind} tasks"))
            })?;
            check_len("Input asset reference", &asset, MAX_ASSET_REF_LEN)?;
            Some(asset)
        } else {
            None
        };

        let provider = non_blank(self.provider);
        if let Some(provider) = &provider {
            check_len("Provider selector", provider, MAX_PROVIDER_LEN)?;
        }

        Ok(NewTask {
            owner_id,
            kind,
            prompt,
            input_asset,
            provider,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {max} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A generation request and its lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: DbId,
    owner_id: String,
    kind: TaskKind,
    prompt: Option<String>,
    input_asset: Option<AssetRef>,
    provider: Option<String>,
    status: TaskStatus,
    result_asset: Option<AssetRef>,
    error_detail: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

/// Field-by-field form of a persisted task, as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredTask {
    pub id: DbId,
    pub owner_id: String,
    pub kind: TaskKind,
    pub prompt: Option<String>,
    pub input_asset: Option<AssetRef>,
    pub provider: Option<String>,
    pub status: TaskStatus,
    pub result_asset: Option<AssetRef>,
    pub error_detail: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// Build the freshly inserted `Pending` record for `new`.
    pub fn new_pending(id: DbId, new: NewTask, now: Timestamp) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            kind: new.kind,
            prompt: new.prompt,
            input_asset: new.input_asset,
            provider: new.provider,
            status: TaskStatus::Pending,
            result_asset: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a task from storage, rejecting rows that break the
    /// result/error invariants.
    pub fn from_stored(stored: StoredTask) -> Result<Self, CoreError> {
        let has_result = stored.result_asset.as_deref().is_some_and(|r| !r.is_empty());
        let has_error = stored.error_detail.as_deref().is_some_and(|e| !e.is_empty());

        if has_result != (stored.status == TaskStatus::Completed) {
            return Err(CoreError::Internal(format!(
                "Task {} is {} but result asset presence is {has_result}",
                stored.id, stored.status
            )));
        }
        if has_error != (stored.status == TaskStatus::Failed) {
            return Err(CoreError::Internal(format!(
                "Task {} is {} but error detail presence is {has_error}",
                stored.id, stored.status
            )));
        }

        Ok(Self {
            id: stored.id,
            owner_id: stored.owner_id,
            kind: stored.kind,
            prompt: stored.prompt,
            input_asset: stored.input_asset,
            provider: stored.provider,
            status: stored.status,
            result_asset: stored.result_asset.filter(|_| has_result),
            error_detail: stored.error_detail.filter(|_| has_error),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    pub fn id(&self) -> DbId {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn input_asset(&self) -> Option<&str> {
        self.input_asset.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result_asset(&self) -> Option<&str> {
        self.result_asset.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// `Pending -> Processing`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.status = self.status.transition(TaskStatus::Processing)?;
        self.touch();
        Ok(())
    }

    /// `Processing -> Completed`, recording the result asset.
    pub fn complete(&mut self, result_asset: impl Into<AssetRef>) -> Result<(), TransitionError> {
        let result_asset = result_asset.into();
        if result_asset.trim().is_empty() {
            return Err(TransitionError::EmptyResult);
        }
        self.status = self.status.transition(TaskStatus::Completed)?;
        self.result_asset = Some(result_asset);
        self.error_detail = None;
        self.touch();
        Ok(())
    }

    /// `Processing -> Failed`, recording a free-text diagnostic.
    ///
    /// A blank detail is replaced by [`UNKNOWN_FAILURE`].
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), TransitionError> {
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            UNKNOWN_FAILURE.to_string()
        } else {
            detail
        };
        self.status = self.status.transition(TaskStatus::Failed)?;
        self.error_detail = Some(detail);
        self.result_asset = None;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        // Keep updated_at monotonic even if the wall clock steps back.
        self.updated_at = Utc::now().max(self.updated_at);
    }
}
