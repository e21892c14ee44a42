//! Album processing dashboard
//!
//! This library provides the core functionality for the album-dashboard
//! service: a live view of the AI and video processing queues reconciled
//! from a Redis change feed and periodic PostgreSQL polls, a reviewer for
//! syncing manual face tags with AI detections, and a resumable batch
//! queuing controller.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
