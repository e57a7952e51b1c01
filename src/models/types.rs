use std::fmt;

/// One-based identifier of a TA worker, as shown in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct WorkerId(usize);

impl WorkerId {
    pub(crate) fn new(value: usize) -> Self {
        Self(value)
    }

    pub(crate) fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TA {}", self.0)
    }
}

/// Marking progress of one question slot. Slots only ever move forward:
/// `Unmarked -> Claimed -> Marked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuestionState {
    Unmarked,
    Claimed { by: WorkerId },
    Marked { by: WorkerId },
}

impl QuestionState {
    pub(crate) fn is_unmarked(self) -> bool {
        matches!(self, QuestionState::Unmarked)
    }

    pub(crate) fn is_marked(self) -> bool {
        matches!(self, QuestionState::Marked { .. })
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            QuestionState::Unmarked => "unmarked",
            QuestionState::Claimed { .. } => "claimed",
            QuestionState::Marked { .. } => "marked",
        }
    }
}

/// Whether the coordinators enforce the locking protocol.
///
/// `Unguarded` keeps every access memory-safe but drops the exclusion rules
/// (writer exclusion, atomic claim, single-winner transition), which makes the
/// races they prevent observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Coordinated,
    Unguarded,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Coordinated => "coordinated",
            SyncMode::Unguarded => "unguarded",
        }
    }

    pub(crate) fn is_coordinated(self) -> bool {
        matches!(self, SyncMode::Coordinated)
    }
}
