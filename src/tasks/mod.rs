pub(crate) mod marking;
pub(crate) mod scheduler;
