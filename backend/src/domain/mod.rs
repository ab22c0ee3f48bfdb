//! # Domain Module
//!
//! Business logic for roster and attendance management. It operates on the
//! [`Repository`](crate::storage::Repository) and knows nothing about how
//! data is stored.
//!
//! ## Module Organization
//!
//! - **attendance_stats**: pure percentage and statistics calculations
//! - **class_service**: class creation, roster edits, class deletion
//! - **attendance_service**: taking, editing and deleting attendance
//! - **statistics_service**: loads data and feeds it to `attendance_stats`

pub mod attendance_service;
pub mod attendance_stats;
pub mod class_service;
pub mod statistics_service;

pub use attendance_service::{AttendanceService, AttendanceSheet, AttendanceValidationError};
pub use class_service::{parse_roster, ClassService, ClassValidationError};
pub use statistics_service::StatisticsService;
