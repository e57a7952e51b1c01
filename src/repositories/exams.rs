use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::config::Settings;
use crate::core::errors::MarkingError;
use crate::models::ExamRecord;

/// Source of exams, addressed by one-based sequential index.
#[async_trait]
pub(crate) trait ExamRepository: Send + Sync {
    /// `Ok(None)` means no exam exists at `exam_index`: the queue has ended.
    async fn load(&self, exam_index: u32) -> Result<Option<ExamRecord>, MarkingError>;

    fn location(&self, exam_index: u32) -> String;
}

/// Exams stored as `{prefix}{index:04}{suffix}` files whose first line is the
/// student number.
pub(crate) struct ExamFiles {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    question_count: usize,
}

impl ExamFiles {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let storage = settings.storage();
        Self {
            dir: storage.data_dir.clone(),
            prefix: storage.exam_prefix.clone(),
            suffix: storage.exam_suffix.clone(),
            question_count: settings.exercise_count(),
        }
    }

    pub(crate) fn path_for(&self, exam_index: u32) -> PathBuf {
        self.dir.join(format!("{}{:04}{}", self.prefix, exam_index, self.suffix))
    }
}

#[async_trait]
impl ExamRepository for ExamFiles {
    async fn load(&self, exam_index: u32) -> Result<Option<ExamRecord>, MarkingError> {
        let path = self.path_for(exam_index);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(MarkingError::storage(path, err)),
        };

        let first_line = raw.lines().next().unwrap_or_default().trim();
        let student_id = leading_integer(first_line).ok_or_else(|| MarkingError::ExamMalformed {
            path: path.clone(),
            line: first_line.to_string(),
        })?;

        Ok(Some(ExamRecord::new(student_id, exam_index, self.question_count)))
    }

    fn location(&self, exam_index: u32) -> String {
        self.path_for(exam_index).display().to_string()
    }
}

// Leading integer token, so `111 Smith` reads as student 111.
fn leading_integer(line: &str) -> Option<i64> {
    let unsigned = line.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(line);
    let digits = unsigned.find(|c: char| !c.is_ascii_digit()).unwrap_or(unsigned.len());
    if digits == 0 {
        return None;
    }
    let sign_len = line.len() - unsigned.len();
    line[..sign_len + digits].parse().ok()
}
