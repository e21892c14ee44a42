pub mod activity;
pub mod api;
pub mod batch;
pub mod job;
pub mod stats;
pub mod tag;
