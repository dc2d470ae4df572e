mod parsing;
mod settings;
mod types;

pub(crate) use types::{GradingApiMode, GradingSettings, Settings, StorageSettings};
