use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{DeadlineId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeadlineError {
    #[error("deadline title cannot be empty")]
    EmptyTitle,

    #[error("total quantity must be > 0, got {0}")]
    InvalidTotalQuantity(i64),

    #[error("deadline date {deadline_date} is before the creation day {created_on}")]
    DeadlineBeforeCreation {
        deadline_date: NaiveDate,
        created_on: NaiveDate,
    },

    #[error("status history cannot be empty")]
    EmptyStatusHistory,

    #[error("status change at {at} is earlier than the latest change at {latest}")]
    StatusOutOfOrder {
        at: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
}

//
// ─── FORMAT ────────────────────────────────────────────────────────────────────
//

/// Unit in which a deadline's quantity and progress are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Unit {
    Pages,
    Minutes,
}

/// The medium a deadline is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// Physical book, counted in pages.
    Pages,
    /// E-book, counted in pages.
    EbookPages,
    /// Audiobook, counted in minutes.
    AudioMinutes,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Pages, Format::EbookPages, Format::AudioMinutes];

    #[must_use]
    pub fn unit(self) -> Unit {
        match self {
            Format::Pages | Format::EbookPages => Unit::Pages,
            Format::AudioMinutes => Unit::Minutes,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Pages => "pages",
            Format::EbookPages => "ebook-pages",
            Format::AudioMinutes => "audio-minutes",
        }
    }

    /// Inverse of `as_str`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.as_str() == name)
    }
}

/// Whether the due date can slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flexibility {
    Flexible,
    Strict,
}

impl Flexibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Flexibility::Flexible => "flexible",
            Flexibility::Strict => "strict",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "flexible" => Some(Flexibility::Flexible),
            "strict" => Some(Flexibility::Strict),
            _ => None,
        }
    }
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    Pending,
    Reading,
    Paused,
    Complete,
    DidNotFinish,
    ToReview,
}

impl DeadlineStatus {
    pub const ALL: [DeadlineStatus; 6] = [
        DeadlineStatus::Pending,
        DeadlineStatus::Reading,
        DeadlineStatus::Paused,
        DeadlineStatus::Complete,
        DeadlineStatus::DidNotFinish,
        DeadlineStatus::ToReview,
    ];

    /// Active deadlines take part in pace, urgency and daily target aggregation.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, DeadlineStatus::Reading)
    }

    /// Archived deadlines are soft-deleted from the active views.
    #[must_use]
    pub fn is_archived(self) -> bool {
        matches!(self, DeadlineStatus::Complete | DeadlineStatus::DidNotFinish)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeadlineStatus::Pending => "pending",
            DeadlineStatus::Reading => "reading",
            DeadlineStatus::Paused => "paused",
            DeadlineStatus::Complete => "complete",
            DeadlineStatus::DidNotFinish => "did_not_finish",
            DeadlineStatus::ToReview => "to_review",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == name)
    }
}

/// One entry in a deadline's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: DeadlineStatus,
    pub created_at: DateTime<Utc>,
}

impl StatusChange {
    #[must_use]
    pub fn new(status: DeadlineStatus, created_at: DateTime<Utc>) -> Self {
        Self { status, created_at }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated deadline input, as captured from a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineDraft {
    pub user_id: UserId,
    pub title: String,
    pub format: Format,
    pub total_quantity: i64,
    pub deadline_date: NaiveDate,
    pub flexibility: Flexibility,
}

impl DeadlineDraft {
    /// Validate the draft into a `Deadline` whose history starts in `Reading`.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineError` if the title is blank, the quantity is not positive,
    /// or the deadline date falls before the creation day.
    pub fn validate(
        self,
        id: DeadlineId,
        created_at: DateTime<Utc>,
    ) -> Result<Deadline, DeadlineError> {
        let created_on = created_at.date_naive();
        if self.deadline_date < created_on {
            return Err(DeadlineError::DeadlineBeforeCreation {
                deadline_date: self.deadline_date,
                created_on,
            });
        }

        Deadline::from_persisted(
            id,
            self.user_id,
            self.title,
            self.format,
            self.total_quantity,
            self.deadline_date,
            self.flexibility,
            created_at,
            vec![StatusChange::new(DeadlineStatus::Reading, created_at)],
        )
    }
}

//
// ─── DEADLINE ──────────────────────────────────────────────────────────────────
//

/// A book the user has committed to finish by a given date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deadline {
    id: DeadlineId,
    user_id: UserId,
    title: String,
    format: Format,
    total_quantity: u32,
    deadline_date: NaiveDate,
    flexibility: Flexibility,
    created_at: DateTime<Utc>,
    status_history: Vec<StatusChange>,
}

impl Deadline {
    /// Rehydrate a deadline from persisted storage.
    ///
    /// The status history is sorted by timestamp; it must contain at least one entry.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineError` if any field fails validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: DeadlineId,
        user_id: UserId,
        title: impl Into<String>,
        format: Format,
        total_quantity: i64,
        deadline_date: NaiveDate,
        flexibility: Flexibility,
        created_at: DateTime<Utc>,
        mut status_history: Vec<StatusChange>,
    ) -> Result<Self, DeadlineError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(DeadlineError::EmptyTitle);
        }
        let total_quantity = u32::try_from(total_quantity)
            .ok()
            .filter(|qty| *qty > 0)
            .ok_or(DeadlineError::InvalidTotalQuantity(total_quantity))?;
        if status_history.is_empty() {
            return Err(DeadlineError::EmptyStatusHistory);
        }
        status_history.sort_by_key(|change| change.created_at);

        Ok(Self {
            id,
            user_id,
            title,
            format,
            total_quantity,
            deadline_date,
            flexibility,
            created_at,
            status_history,
        })
    }

    /// Return a copy of this deadline carrying a storage-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: DeadlineId) -> Self {
        self.id = id;
        self
    }

    /// Append a status change.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineError::StatusOutOfOrder` if `at` precedes the latest recorded change.
    pub fn record_status(
        &mut self,
        status: DeadlineStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DeadlineError> {
        let latest = self.latest_change().created_at;
        if at < latest {
            return Err(DeadlineError::StatusOutOfOrder { at, latest });
        }
        self.status_history.push(StatusChange::new(status, at));
        Ok(())
    }

    fn latest_change(&self) -> &StatusChange {
        // from_persisted guarantees at least one entry
        &self.status_history[self.status_history.len() - 1]
    }

    /// Latest status.
    #[must_use]
    pub fn status(&self) -> DeadlineStatus {
        self.latest_change().status
    }

    /// Status in effect at `at`, or `None` if the deadline did not exist yet.
    #[must_use]
    pub fn status_at(&self, at: DateTime<Utc>) -> Option<DeadlineStatus> {
        self.status_history
            .iter()
            .take_while(|change| change.created_at <= at)
            .last()
            .map(|change| change.status)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.status_at(at).is_some_and(DeadlineStatus::is_active)
    }

    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.status().is_archived()
    }

    #[must_use]
    pub fn id(&self) -> DeadlineId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    #[must_use]
    pub fn deadline_date(&self) -> NaiveDate {
        self.deadline_date
    }

    #[must_use]
    pub fn flexibility(&self) -> Flexibility {
        self.flexibility
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
