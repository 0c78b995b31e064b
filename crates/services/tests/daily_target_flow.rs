use chrono::{Duration, NaiveDate};
use pace_core::model::{
    DeadlineDraft, DeadlineStatus, Flexibility, Format, ProgressEntryDraft, UserId,
};
use pace_core::time::start_of_day;
use services::{AppServices, Clock};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock_at(day: NaiveDate, hour: i64) -> Clock {
    Clock::fixed(start_of_day(day) + Duration::hours(hour))
}

#[tokio::test]
async fn sqlite_backed_daily_targets_survive_a_mid_day_completion() {
    let yesterday = date(2023, 11, 14);
    let today = date(2023, 11, 15);
    let user = UserId::new(4);

    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_daily_target_flow?mode=memory&cache=shared",
        clock_at(yesterday, 9),
    )
    .await
    .expect("sqlite services");

    let mut ids = Vec::new();
    for (title, format, total, due_in) in [
        ("Paper", Format::Pages, 120, 4),
        ("Ebook", Format::EbookPages, 90, 3),
        ("Audio", Format::AudioMinutes, 480, 8),
    ] {
        let deadline = services
            .deadlines()
            .create_deadline(DeadlineDraft {
                user_id: user,
                title: title.into(),
                format,
                total_quantity: total,
                deadline_date: today + Duration::days(due_in),
                flexibility: Flexibility::Flexible,
            })
            .await
            .unwrap();
        ids.push(deadline.id());
    }

    services
        .progress()
        .as_ref()
        .clone()
        .with_clock(clock_at(yesterday, 20))
        .log_baseline(ids[0], 40)
        .await
        .unwrap();

    let targets = services.daily_targets();
    let morning = targets
        .as_ref()
        .clone()
        .with_clock(clock_at(today, 9))
        .today(user)
        .await
        .unwrap();
    assert_eq!(morning.total_required(Format::Pages), 20);
    assert_eq!(morning.total_required(Format::EbookPages), 30);
    assert_eq!(morning.total_required(Format::AudioMinutes), 60);

    services
        .progress()
        .as_ref()
        .clone()
        .with_clock(clock_at(today, 12))
        .log_progress(ids[1], ProgressEntryDraft::progress(90))
        .await
        .unwrap();
    services
        .deadlines()
        .as_ref()
        .clone()
        .with_clock(Clock::fixed(
            start_of_day(today) + Duration::hours(12) + Duration::minutes(1),
        ))
        .change_status(ids[1], DeadlineStatus::Complete)
        .await
        .unwrap();

    let evening = targets
        .as_ref()
        .clone()
        .with_clock(clock_at(today, 17))
        .today(user)
        .await
        .unwrap();
    assert_eq!(evening.total_required(Format::EbookPages), 30);
    assert_eq!(evening.current_achieved(Format::EbookPages), 90);
    assert_eq!(evening.total_required(Format::Pages), 20);
    assert_eq!(evening.total_required(Format::AudioMinutes), 60);
}

#[tokio::test]
async fn stored_baseline_survives_a_restart_and_a_correction() {
    let yesterday = date(2023, 11, 14);
    let today = date(2023, 11, 15);
    let user = UserId::new(5);
    let db_url = "sqlite:file:memdb_daily_target_restart?mode=memory&cache=shared";

    let first = AppServices::new_sqlite(db_url, clock_at(yesterday, 9))
        .await
        .expect("sqlite services");
    let deadline = first
        .deadlines()
        .create_deadline(DeadlineDraft {
            user_id: user,
            title: "Long novel".into(),
            format: Format::Pages,
            total_quantity: 300,
            deadline_date: today + Duration::days(10),
            flexibility: Flexibility::Flexible,
        })
        .await
        .unwrap();
    first
        .progress()
        .as_ref()
        .clone()
        .with_clock(clock_at(yesterday, 20))
        .log_progress(deadline.id(), ProgressEntryDraft::progress(200))
        .await
        .unwrap();

    let morning = first
        .daily_targets()
        .as_ref()
        .clone()
        .with_clock(clock_at(today, 9))
        .today(user)
        .await
        .unwrap();
    assert_eq!(morning.total_required(Format::Pages), 10);

    let outcome = first
        .progress()
        .as_ref()
        .clone()
        .with_clock(clock_at(today, 10))
        .correct_progress(deadline.id(), 100)
        .await
        .unwrap();
    assert_eq!(outcome.deleted_entry_ids.len(), 1);

    // a second connection stands in for the next CLI invocation
    let restarted = AppServices::new_sqlite(db_url, clock_at(today, 17))
        .await
        .expect("sqlite services");
    let evening = restarted.daily_targets().today(user).await.unwrap();
    assert_eq!(evening.total_required(Format::Pages), 10);
    assert_eq!(evening.current_achieved(Format::Pages), 100);
}
