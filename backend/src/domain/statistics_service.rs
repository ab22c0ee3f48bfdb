use anyhow::{Context, Result};
use log::debug;
use shared::{ClassDetails, StatisticsOverview};

use super::attendance_stats;
use crate::storage::{Entity, Repository, RepositoryError};

/// Loads classes and records and runs them through the aggregation functions
#[derive(Clone)]
pub struct StatisticsService {
    repository: Repository,
}

impl StatisticsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn overview(&self) -> Result<StatisticsOverview> {
        let classes = self
            .repository
            .list_classes()
            .await
            .context("Failed to load classes")?;
        let records = self
            .repository
            .list_attendance()
            .await
            .context("Failed to load attendance")?;

        debug!(
            "Computing statistics over {} classes and {} records",
            classes.len(),
            records.len()
        );
        Ok(attendance_stats::statistics_overview(&classes, &records))
    }

    pub async fn class_details(&self, class_id: &str) -> Result<ClassDetails> {
        let class = self
            .repository
            .get_class(class_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Entity::Class, class_id))?;
        let records = self.repository.list_attendance_for_class(class_id).await?;

        Ok(attendance_stats::class_details(&class, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttendanceService, ClassService};
    use crate::storage::{JsonStore, MemoryBackend};
    use chrono::Utc;
    use shared::AttendanceBand;
    use std::sync::Arc;

    struct Fixture {
        classes: ClassService,
        attendance: AttendanceService,
        statistics: StatisticsService,
    }

    fn setup() -> Fixture {
        let repository = Repository::new(JsonStore::new(Arc::new(MemoryBackend::new())));
        Fixture {
            classes: ClassService::new(repository.clone()),
            attendance: AttendanceService::new(repository.clone()),
            statistics: StatisticsService::new(repository),
        }
    }

    #[tokio::test]
    async fn test_overview_of_empty_store() {
        let fixture = setup();

        let overview = fixture.statistics.overview().await.unwrap();

        assert!(overview.classes.is_empty());
        assert_eq!(overview.overall.total_classes, 0);
        assert_eq!(overview.overall.average_attendance, 0.0);
    }

    #[tokio::test]
    async fn test_class_details_after_sessions() {
        let fixture = setup();
        let class = fixture.classes.create_class("CS101", "Ada\nGrace").await.unwrap();
        let grace = class.students[1].id.clone();

        let sheet = fixture.attendance.start_session(&class.id).await.unwrap();
        fixture.attendance.save_session(sheet, Utc::now()).await.unwrap();

        let mut sheet = fixture.attendance.start_session(&class.id).await.unwrap();
        sheet.toggle(&grace).unwrap();
        fixture.attendance.save_session(sheet, Utc::now()).await.unwrap();

        let details = fixture.statistics.class_details(&class.id).await.unwrap();

        assert_eq!(details.total_sessions, 2);
        assert_eq!(details.percentage, 75.0);
        assert_eq!(details.students[0].attendance.percentage, "100.00");
        assert_eq!(details.students[1].attendance.present, 1);
        assert_eq!(details.students[1].attendance.percentage, "50.00");
        assert_eq!(details.students[1].band, AttendanceBand::Warning);

        let overview = fixture.statistics.overview().await.unwrap();
        assert_eq!(overview.classes[0].percentage, 75.0);
        assert_eq!(overview.overall.total_sessions, 2);
        assert_eq!(overview.overall.average_attendance, 75.0);
    }

    #[tokio::test]
    async fn test_new_student_counts_against_past_sessions() {
        let fixture = setup();
        let class = fixture.classes.create_class("CS101", "Ada").await.unwrap();
        let sheet = fixture.attendance.start_session(&class.id).await.unwrap();
        fixture.attendance.save_session(sheet, Utc::now()).await.unwrap();

        let newcomer = fixture.classes.add_student(&class.id, "Grace").await.unwrap();
        let details = fixture.statistics.class_details(&class.id).await.unwrap();

        // One present tag, two students expected at one session
        assert_eq!(details.percentage, 50.0);
        let stats = &details.students.iter().find(|s| s.student.id == newcomer.id).unwrap().attendance;
        assert_eq!((stats.present, stats.total), (0, 1));
    }

    #[tokio::test]
    async fn test_class_details_for_unknown_class() {
        let fixture = setup();

        let err = fixture.statistics.class_details("missing").await.unwrap_err();
        assert!(err.downcast_ref::<RepositoryError>().unwrap().is_not_found());
    }
}
