mod deadline;
mod ids;
mod progress;
mod settings;

pub use ids::{DeadlineId, ParseIdError, ProgressEntryId, UserId};

pub use deadline::{
    Deadline, DeadlineDraft, DeadlineError, DeadlineStatus, Flexibility, Format, StatusChange,
    Unit,
};
pub use progress::{NewProgressEntry, ProgressEntry, ProgressEntryDraft, ProgressEntryError};
pub(crate) use progress::non_negative_u32;
pub use settings::{PaceSettings, SettingsError};
