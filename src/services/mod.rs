pub(crate) mod exam_claims;
pub(crate) mod exam_session;
pub(crate) mod exam_transition;
pub(crate) mod rubric_access;
pub(crate) mod stats;
