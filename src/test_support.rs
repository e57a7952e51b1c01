use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::errors::MarkingError;
use crate::models::{ExamRecord, RubricLine};
use crate::repositories::exams::ExamRepository;
use crate::repositories::rubric::RubricRepository;

/// Serialises tests that touch process environment variables.
pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

/// Rubric kept in memory; every save is recorded in order.
pub(crate) struct MemoryRubric {
    initial: Vec<RubricLine>,
    saves: StdMutex<Vec<Vec<RubricLine>>>,
}

impl MemoryRubric {
    pub(crate) fn new(initial: Vec<RubricLine>) -> Self {
        Self { initial, saves: StdMutex::new(Vec::new()) }
    }

    /// `1, A`, `2, B`, ... one entry per exercise.
    pub(crate) fn standard(exercise_count: usize) -> Self {
        let lines = (0..exercise_count)
            .map(|slot| {
                let grade = char::from(b'A' + (slot % 26) as u8);
                RubricLine::new(format!("{}, {grade}", slot + 1))
            })
            .collect();
        Self::new(lines)
    }

    pub(crate) fn initial(&self) -> Vec<RubricLine> {
        self.initial.clone()
    }

    pub(crate) fn saves(&self) -> Vec<Vec<RubricLine>> {
        self.saves.lock().expect("saves lock").clone()
    }
}

#[async_trait]
impl RubricRepository for MemoryRubric {
    async fn load(&self) -> Result<Vec<RubricLine>, MarkingError> {
        Ok(self.initial.clone())
    }

    async fn save(&self, lines: &[RubricLine]) -> Result<(), MarkingError> {
        self.saves.lock().expect("saves lock").push(lines.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        "memory://rubric".to_string()
    }
}

/// Exams `1..=students.len()`; any other index is missing.
pub(crate) struct MemoryExams {
    students: Vec<i64>,
    question_count: usize,
    loads: StdMutex<Vec<u32>>,
}

impl MemoryExams {
    pub(crate) fn new(students: Vec<i64>, question_count: usize) -> Self {
        Self { students, question_count, loads: StdMutex::new(Vec::new()) }
    }

    /// Every index passed to `load`, in call order.
    pub(crate) fn loads(&self) -> Vec<u32> {
        self.loads.lock().expect("loads lock").clone()
    }
}

#[async_trait]
impl ExamRepository for MemoryExams {
    async fn load(&self, exam_index: u32) -> Result<Option<ExamRecord>, MarkingError> {
        self.loads.lock().expect("loads lock").push(exam_index);

        let student = (exam_index as usize)
            .checked_sub(1)
            .and_then(|position| self.students.get(position))
            .copied();
        Ok(student.map(|student| ExamRecord::new(student, exam_index, self.question_count)))
    }

    fn location(&self, exam_index: u32) -> String {
        format!("memory://exam/{exam_index}")
    }
}

/// Exam storage whose every read fails.
pub(crate) struct FailingExams;

#[async_trait]
impl ExamRepository for FailingExams {
    async fn load(&self, exam_index: u32) -> Result<Option<ExamRecord>, MarkingError> {
        Err(MarkingError::storage(
            PathBuf::from(self.location(exam_index)),
            io::Error::new(io::ErrorKind::Other, "exam storage offline"),
        ))
    }

    fn location(&self, exam_index: u32) -> String {
        format!("failing://exam/{exam_index}")
    }
}
