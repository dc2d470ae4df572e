pub(crate) mod answer_keys;
pub(crate) mod appeals;
pub(crate) mod classes;
pub(crate) mod errors;
pub(crate) mod folders;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod students;
pub(crate) mod teachers;
pub(crate) mod validation;
