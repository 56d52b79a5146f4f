#[macro_use]
pub(crate) mod optim;

pub(crate) mod counters;
pub(crate) mod read_log;
pub(crate) mod seqlock;
pub(crate) mod thread;
pub(crate) mod write_log;
