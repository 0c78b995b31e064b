use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pace_core::ledger::ProgressLedger;
use pace_core::model::{Deadline, DeadlineId, Format, PaceSettings, UserId};
use pace_core::pace::{PaceEstimator, PaceProfile};
use pace_core::remaining::{RemainingWork, RemainingWorkCalculator};
use pace_core::units::{DisplayQuantity, UnitConverter};
use pace_core::urgency::{UrgencyClassifier, UrgencySnapshot};
use serde::Serialize;
use storage::repository::{DeadlineRepository, PaceSettingsRepository, ProgressRepository};
use tracing::debug;

use crate::Clock;
use crate::error::OverviewServiceError;

/// Everything a dashboard row needs for one deadline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadlineOverview {
    pub deadline: Deadline,
    pub remaining: RemainingWork,
    pub urgency: UrgencySnapshot,
    /// Pace pooled across all of the user's deadlines in this format.
    pub pace: PaceProfile,
    pub remaining_display: DisplayQuantity,
}

/// Read-only view combining remaining work, urgency and pace.
#[derive(Clone)]
pub struct OverviewService {
    clock: Clock,
    deadlines: Arc<dyn DeadlineRepository>,
    progress: Arc<dyn ProgressRepository>,
    settings: Arc<dyn PaceSettingsRepository>,
}

impl OverviewService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadlines: Arc<dyn DeadlineRepository>,
        progress: Arc<dyn ProgressRepository>,
        settings: Arc<dyn PaceSettingsRepository>,
    ) -> Self {
        Self {
            clock,
            deadlines,
            progress,
            settings,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Overview of every active deadline, soonest deadline first.
    ///
    /// # Errors
    ///
    /// Returns `OverviewServiceError::Storage` if repository access fails.
    pub async fn overview(&self, user_id: UserId) -> Result<Vec<DeadlineOverview>, OverviewServiceError> {
        self.overview_at(user_id, self.clock.now()).await
    }

    /// Same as `overview`, evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns `OverviewServiceError::Storage` if repository access fails.
    pub async fn overview_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeadlineOverview>, OverviewServiceError> {
        let settings = self.settings.get_settings(user_id).await?.unwrap_or_default();
        let deadlines = self.deadlines.list_deadlines(user_id).await?;
        let ledgers = self.load_ledgers(&deadlines).await?;

        let pace_by_format = pace_by_format(&settings, &deadlines, &ledgers, now);
        let classifier = UrgencyClassifier::new(&settings);

        let mut rows: Vec<DeadlineOverview> = deadlines
            .iter()
            .filter(|deadline| deadline.is_active())
            .filter_map(|deadline| {
                let ledger = ledgers.get(&deadline.id())?;
                let pace = pace_by_format.get(&deadline.format())?;
                Some(build_row(&classifier, deadline, ledger, *pace, now))
            })
            .collect();
        rows.sort_by(|a, b| {
            a.deadline
                .deadline_date()
                .cmp(&b.deadline.deadline_date())
                .then_with(|| a.deadline.id().cmp(&b.deadline.id()))
        });

        debug!(user_id = %user_id, rows = rows.len(), "computed overview");
        Ok(rows)
    }

    /// Overview of a single deadline, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `OverviewServiceError::Storage` if repository access fails.
    pub async fn deadline_overview(
        &self,
        deadline_id: DeadlineId,
    ) -> Result<Option<DeadlineOverview>, OverviewServiceError> {
        let now = self.clock.now();
        let Some(deadline) = self.deadlines.load_deadline(deadline_id).await? else {
            return Ok(None);
        };
        let user_id = deadline.user_id();
        let settings = self.settings.get_settings(user_id).await?.unwrap_or_default();
        let siblings = self.deadlines.list_deadlines(user_id).await?;
        let ledgers = self.load_ledgers(&siblings).await?;

        let pace = PaceEstimator::new(&settings).estimate_for_format(
            deadline.format(),
            siblings
                .iter()
                .filter_map(|sibling| ledgers.get(&sibling.id()).map(|ledger| (sibling, ledger))),
            now.date_naive(),
        );
        let ledger = ledgers
            .get(&deadline_id)
            .cloned()
            .unwrap_or_else(|| ProgressLedger::empty(deadline_id));

        Ok(Some(build_row(
            &UrgencyClassifier::new(&settings),
            &deadline,
            &ledger,
            pace,
            now,
        )))
    }

    async fn load_ledgers(
        &self,
        deadlines: &[Deadline],
    ) -> Result<HashMap<DeadlineId, ProgressLedger>, OverviewServiceError> {
        let mut ledgers = HashMap::with_capacity(deadlines.len());
        for deadline in deadlines {
            let entries = self.progress.load_progress_entries(deadline.id()).await?;
            ledgers.insert(deadline.id(), ProgressLedger::new(deadline.id(), entries));
        }
        Ok(ledgers)
    }
}

fn pace_by_format(
    settings: &PaceSettings,
    deadlines: &[Deadline],
    ledgers: &HashMap<DeadlineId, ProgressLedger>,
    now: DateTime<Utc>,
) -> BTreeMap<Format, PaceProfile> {
    let estimator = PaceEstimator::new(settings);
    let today = now.date_naive();
    Format::ALL
        .into_iter()
        .map(|format| {
            let sources = deadlines
                .iter()
                .filter_map(|deadline| ledgers.get(&deadline.id()).map(|ledger| (deadline, ledger)));
            (format, estimator.estimate_for_format(format, sources, today))
        })
        .collect()
}

fn build_row(
    classifier: &UrgencyClassifier,
    deadline: &Deadline,
    ledger: &ProgressLedger,
    pace: PaceProfile,
    now: DateTime<Utc>,
) -> DeadlineOverview {
    let remaining = RemainingWorkCalculator::compute(deadline, ledger, now);
    let urgency = classifier.classify(deadline, &remaining, &pace, now.date_naive());
    DeadlineOverview {
        deadline: deadline.clone(),
        remaining,
        urgency,
        pace,
        remaining_display: UnitConverter::display_units(deadline.format(), remaining.remaining),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, NaiveDate};
    use pace_core::model::{DeadlineDraft, DeadlineStatus, Flexibility, ProgressEntryDraft};
    use pace_core::time::start_of_day;
    use pace_core::urgency::UrgencyLevel;
    use storage::repository::{InMemoryRepository, NewDeadlineRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Wednesday
    fn today() -> NaiveDate {
        date(2023, 11, 15)
    }

    async fn add(
        repo: &InMemoryRepository,
        title: &str,
        format: Format,
        total: i64,
        due: NaiveDate,
        flexibility: Flexibility,
    ) -> DeadlineId {
        let deadline = DeadlineDraft {
            user_id: UserId::new(1),
            title: title.into(),
            format,
            total_quantity: total,
            deadline_date: due,
            flexibility,
        }
        .validate(DeadlineId::new(0), start_of_day(date(2023, 10, 1)))
        .unwrap();
        repo.insert_new_deadline(NewDeadlineRecord::from_deadline(&deadline))
            .await
            .unwrap()
    }

    async fn log(repo: &InMemoryRepository, id: DeadlineId, day: NaiveDate, value: i64) {
        let entry = ProgressEntryDraft::progress(value)
            .validate(id, start_of_day(day) + Duration::hours(20))
            .unwrap();
        repo.append_entry(entry).await.unwrap();
    }

    fn service(repo: &InMemoryRepository) -> OverviewService {
        OverviewService::new(
            Clock::fixed(start_of_day(today()) + Duration::hours(9)),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn overview_combines_remaining_urgency_and_pace() {
        let repo = InMemoryRepository::new();
        let book = add(&repo, "Dune", Format::Pages, 500, date(2023, 11, 25), Flexibility::Flexible).await;
        // previous week: 4 active days, 280 pages
        for (day, value) in [(6, 60), (7, 130), (9, 190), (11, 280)] {
            log(&repo, book, date(2023, 11, day), value).await;
        }

        let rows = service(&repo).overview(UserId::new(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.remaining.remaining, 220);
        assert_eq!(row.remaining_display.primary, 220);
        assert_eq!(row.urgency.days_left, 10);
        assert!((row.urgency.required_pace_today - 22.0).abs() < 1e-9);
        assert!((row.pace.average_per_day - 70.0).abs() < 1e-9);
        assert_eq!(row.urgency.level, UrgencyLevel::Good);
    }

    #[tokio::test]
    async fn pace_is_pooled_per_format_including_archived() {
        let repo = InMemoryRepository::new();
        let done = add(&repo, "Finished", Format::AudioMinutes, 600, date(2023, 11, 30), Flexibility::Flexible).await;
        for (day, value) in [(6, 90), (8, 180), (10, 270)] {
            log(&repo, done, date(2023, 11, day), value).await;
        }
        let mut archived = repo.load_deadline(done).await.unwrap().unwrap();
        archived
            .record_status(DeadlineStatus::Complete, start_of_day(date(2023, 11, 12)))
            .unwrap();
        repo.upsert_deadline(&archived).await.unwrap();

        let fresh = add(&repo, "Fresh", Format::AudioMinutes, 300, date(2023, 11, 20), Flexibility::Strict).await;
        let paper = add(&repo, "Paper", Format::Pages, 100, date(2023, 11, 20), Flexibility::Strict).await;

        let rows = service(&repo).overview(UserId::new(1)).await.unwrap();
        let ids: Vec<DeadlineId> = rows.iter().map(|row| row.deadline.id()).collect();
        assert_eq!(ids, vec![fresh, paper]);

        let audio = &rows[0];
        assert!(audio.pace.is_reliable);
        assert!((audio.pace.average_per_day - 90.0).abs() < 1e-9);
        assert_eq!(audio.remaining_display.primary, 5);
        assert_eq!(audio.remaining_display.secondary, 0);

        let pages = &rows[1];
        assert!(!pages.pace.has_data());
    }

    #[tokio::test]
    async fn overview_orders_by_deadline_date() {
        let repo = InMemoryRepository::new();
        let later = add(&repo, "Later", Format::Pages, 100, date(2023, 12, 20), Flexibility::Flexible).await;
        let sooner = add(&repo, "Sooner", Format::Pages, 100, date(2023, 11, 18), Flexibility::Flexible).await;
        let overdue = add(&repo, "Overdue", Format::Pages, 100, date(2023, 11, 10), Flexibility::Flexible).await;

        let rows = service(&repo).overview(UserId::new(1)).await.unwrap();
        let ids: Vec<DeadlineId> = rows.iter().map(|row| row.deadline.id()).collect();
        assert_eq!(ids, vec![overdue, sooner, later]);
        assert_eq!(rows[0].urgency.level, UrgencyLevel::Overdue);
    }

    #[tokio::test]
    async fn single_deadline_overview_handles_missing_ids() {
        let repo = InMemoryRepository::new();
        let id = add(&repo, "One", Format::EbookPages, 120, date(2023, 11, 16), Flexibility::Strict).await;
        log(&repo, id, date(2023, 11, 14), 20).await;

        let service = service(&repo);
        let row = service.deadline_overview(id).await.unwrap().unwrap();
        assert_eq!(row.remaining.remaining, 100);
        assert_eq!(row.urgency.days_left, 1);
        assert!(service.deadline_overview(DeadlineId::new(99)).await.unwrap().is_none());
    }
}
