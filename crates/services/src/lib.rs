#![forbid(unsafe_code)]

pub mod app_services;
pub mod daily_target_service;
pub mod deadline_service;
pub mod error;
pub mod overview_service;
pub mod progress_service;
pub mod settings_service;

pub use pace_core::Clock;

pub use app_services::AppServices;
pub use daily_target_service::DailyTargetService;
pub use deadline_service::DeadlineService;
pub use error::{
    AppServicesError, DailyTargetServiceError, DeadlineServiceError, OverviewServiceError,
    ProgressServiceError, SettingsServiceError,
};
pub use overview_service::{DeadlineOverview, OverviewService};
pub use progress_service::ProgressService;
pub use settings_service::PaceSettingsService;
