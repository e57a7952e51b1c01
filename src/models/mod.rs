pub(crate) mod exam;
pub(crate) mod rubric;
pub(crate) mod types;

pub(crate) use exam::ExamRecord;
pub use exam::SENTINEL_STUDENT_ID;
pub(crate) use rubric::{RubricEdit, RubricLine};
pub(crate) use types::{QuestionState, WorkerId};
pub use types::SyncMode;
