pub(crate) mod appeals;
pub(crate) mod assessments;
pub(crate) mod classes;
pub(crate) mod health;
pub(crate) mod students;
pub(crate) mod submissions;
pub(crate) mod teachers;

mod postgres;
mod store;

pub(crate) use postgres::PgStore;
pub(crate) use store::{Store, StoreError};
