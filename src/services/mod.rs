pub(crate) mod access;
pub(crate) mod catalog;
pub(crate) mod errors;
pub(crate) mod grading;
pub(crate) mod identifiers;
pub(crate) mod listing;
pub(crate) mod navigation;
pub(crate) mod single_flight;
pub(crate) mod state_machine;
pub(crate) mod summary;
pub(crate) mod workflow;
