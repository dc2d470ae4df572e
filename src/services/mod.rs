pub(crate) mod grading_engine;
pub(crate) mod pipeline;
pub(crate) mod reports;
pub(crate) mod staging;
pub(crate) mod storage;
