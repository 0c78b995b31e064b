use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use pace_core::daily_target::{DailyTargetAggregator, DailyTargetBaseline, DailyTargets};
use pace_core::ledger::ProgressLedger;
use pace_core::model::{Deadline, DeadlineId, UserId};
use storage::repository::{DailyTargetBaselineRepository, DeadlineRepository, ProgressRepository};
use tracing::{debug, info};

use crate::Clock;
use crate::error::DailyTargetServiceError;

/// "Today's goal" per format with a required side that is fixed once per day.
///
/// The baseline is stored on the first request of a day and read back by every later one,
/// across restarts, so a correction made today cannot move today's required total.
#[derive(Clone)]
pub struct DailyTargetService {
    clock: Clock,
    deadlines: Arc<dyn DeadlineRepository>,
    progress: Arc<dyn ProgressRepository>,
    baselines: Arc<dyn DailyTargetBaselineRepository>,
}

impl DailyTargetService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadlines: Arc<dyn DeadlineRepository>,
        progress: Arc<dyn ProgressRepository>,
        baselines: Arc<dyn DailyTargetBaselineRepository>,
    ) -> Self {
        Self {
            clock,
            deadlines,
            progress,
            baselines,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// # Errors
    ///
    /// See `targets_at`.
    pub async fn today(&self, user_id: UserId) -> Result<DailyTargets, DailyTargetServiceError> {
        self.targets_at(user_id, self.clock.now()).await
    }

    /// Targets for the calendar day of `now`.
    ///
    /// The first call of a day captures the baseline from the deadlines active when the day
    /// began; later calls on the same day reuse it and only recompute what was achieved.
    ///
    /// # Errors
    ///
    /// Returns `DailyTargetServiceError::Storage` if repository access fails.
    pub async fn targets_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<DailyTargets, DailyTargetServiceError> {
        let day = now.date_naive();
        let deadlines = self.deadlines.list_deadlines(user_id).await?;
        let ledgers = self.load_ledgers(&deadlines).await?;
        let progress_as_of = |id: DeadlineId, at: DateTime<Utc>| {
            ledgers.get(&id).map_or(0, |ledger| ledger.progress_as_of(at))
        };

        let baseline = match self.baselines.load_baseline(user_id, day).await? {
            Some(stored) => stored,
            None => {
                let captured = capture(day, &deadlines, &progress_as_of);
                let stored = self
                    .baselines
                    .save_baseline_if_absent(user_id, &captured)
                    .await?;
                info!(
                    user_id = %user_id,
                    day = %day,
                    deadlines = stored.targets().len(),
                    "captured daily target baseline"
                );
                stored
            }
        };

        let targets =
            DailyTargetAggregator::snapshot_with_baseline(&baseline, &deadlines, &progress_as_of, now);
        debug!(user_id = %user_id, day = %day, formats = targets.by_format.len(), "computed daily targets");
        Ok(targets)
    }

    async fn load_ledgers(
        &self,
        deadlines: &[Deadline],
    ) -> Result<HashMap<DeadlineId, ProgressLedger>, DailyTargetServiceError> {
        let mut ledgers = HashMap::with_capacity(deadlines.len());
        for deadline in deadlines {
            let entries = self.progress.load_progress_entries(deadline.id()).await?;
            ledgers.insert(deadline.id(), ProgressLedger::new(deadline.id(), entries));
        }
        Ok(ledgers)
    }
}

fn capture<F>(day: NaiveDate, deadlines: &[Deadline], progress_as_of: F) -> DailyTargetBaseline
where
    F: Fn(DeadlineId, DateTime<Utc>) -> u32,
{
    let active = DailyTargetAggregator::active_at_start_of_day(deadlines, day);
    DailyTargetAggregator::capture(day, active, progress_as_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use pace_core::model::{
        DeadlineDraft, DeadlineStatus, Flexibility, Format, ProgressEntryDraft,
    };
    use pace_core::time::start_of_day;
    use storage::repository::{InMemoryRepository, NewDeadlineRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2023, 11, 15)
    }

    fn at(hour: i64) -> DateTime<Utc> {
        start_of_day(today()) + Duration::hours(hour)
    }

    async fn add(repo: &InMemoryRepository, format: Format, total: i64, due_in: i64) -> DeadlineId {
        let deadline = DeadlineDraft {
            user_id: UserId::new(1),
            title: format!("{format:?} book"),
            format,
            total_quantity: total,
            deadline_date: today() + Duration::days(due_in),
            flexibility: Flexibility::Flexible,
        }
        .validate(DeadlineId::new(0), start_of_day(date(2023, 11, 1)))
        .unwrap();
        repo.insert_new_deadline(NewDeadlineRecord::from_deadline(&deadline))
            .await
            .unwrap()
    }

    async fn log(repo: &InMemoryRepository, id: DeadlineId, at: DateTime<Utc>, value: i64) {
        repo.append_entry(ProgressEntryDraft::progress(value).validate(id, at).unwrap())
            .await
            .unwrap();
    }

    fn service(repo: &InMemoryRepository) -> DailyTargetService {
        DailyTargetService::new(
            Clock::fixed(at(9)),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn required_total_is_stable_through_the_day() {
        let repo = InMemoryRepository::new();
        let first = add(&repo, Format::Pages, 300, 10).await;
        let second = add(&repo, Format::Pages, 200, 4).await;
        log(&repo, first, at(-5), 100).await;

        let service = service(&repo);
        let morning = service.today(UserId::new(1)).await.unwrap();
        // ceil(200 / 10) + ceil(200 / 4)
        assert_eq!(morning.total_required(Format::Pages), 70);
        assert_eq!(morning.current_achieved(Format::Pages), 0);

        log(&repo, first, at(12), 130).await;
        log(&repo, second, at(13), 60).await;
        let mut done = repo.load_deadline(second).await.unwrap().unwrap();
        done.record_status(DeadlineStatus::DidNotFinish, at(14)).unwrap();
        repo.upsert_deadline(&done).await.unwrap();

        let evening = service.targets_at(UserId::new(1), at(17)).await.unwrap();
        assert_eq!(evening.total_required(Format::Pages), 70);
        assert_eq!(evening.current_achieved(Format::Pages), 90);
        assert!(evening.get(Format::Pages).unwrap().is_met());
    }

    #[tokio::test]
    async fn a_new_day_recaptures_the_baseline() {
        let repo = InMemoryRepository::new();
        let id = add(&repo, Format::AudioMinutes, 600, 6).await;

        let service = service(&repo);
        assert_eq!(
            service.today(UserId::new(1)).await.unwrap().total_required(Format::AudioMinutes),
            100
        );

        log(&repo, id, at(20), 300).await;
        let tomorrow = service
            .targets_at(UserId::new(1), at(24 + 8))
            .await
            .unwrap();
        // 300 left over 5 days
        assert_eq!(tomorrow.total_required(Format::AudioMinutes), 60);
        assert_eq!(tomorrow.current_achieved(Format::AudioMinutes), 0);
    }

    #[tokio::test]
    async fn deadlines_created_today_wait_until_tomorrow() {
        let repo = InMemoryRepository::new();
        add(&repo, Format::Pages, 100, 5).await;
        let service = service(&repo);
        assert_eq!(service.today(UserId::new(1)).await.unwrap().total_required(Format::Pages), 20);

        let late = DeadlineDraft {
            user_id: UserId::new(1),
            title: "Late addition".into(),
            format: Format::Pages,
            total_quantity: 500,
            deadline_date: today() + Duration::days(5),
            flexibility: Flexibility::Flexible,
        }
        .validate(DeadlineId::new(0), at(10))
        .unwrap();
        repo.insert_new_deadline(NewDeadlineRecord::from_deadline(&late))
            .await
            .unwrap();

        assert_eq!(
            service.targets_at(UserId::new(1), at(11)).await.unwrap().total_required(Format::Pages),
            20
        );
    }

    #[tokio::test]
    async fn a_correction_today_does_not_move_the_stored_target() {
        let repo = InMemoryRepository::new();
        let id = add(&repo, Format::Pages, 300, 10).await;
        log(&repo, id, at(-4), 200).await;

        let morning = service(&repo).today(UserId::new(1)).await.unwrap();
        // ceil((300 - 200) / 10)
        assert_eq!(morning.total_required(Format::Pages), 10);

        // a correction to 100 removes yesterday's 200 and logs 100 now
        let yesterday = repo.load_progress_entries(id).await.unwrap();
        let corrected = ProgressEntryDraft::progress(100).validate(id, at(10)).unwrap();
        repo.replace_entries(id, &[yesterday[0].id], corrected)
            .await
            .unwrap();

        // a fresh service stands in for a restarted process
        let restarted = service(&repo)
            .targets_at(UserId::new(1), at(17))
            .await
            .unwrap();
        assert_eq!(restarted.total_required(Format::Pages), 10);
        assert_eq!(restarted.current_achieved(Format::Pages), 100);
    }
}
