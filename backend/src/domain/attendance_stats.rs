//! Attendance aggregation.
//!
//! Pure functions over rosters and attendance records; nothing here touches
//! storage. Percentages are rounded half away from zero at the precision each
//! view uses: two fraction digits for class and student figures, one for a
//! single session.
//!
//! Note that the class figure and the student figure count presence
//! differently. [`class_attendance_percentage`] counts every `present` tag in
//! each record, whether or not that student is still on the roster, while
//! [`student_attendance`] looks entries up by student id. A student removed
//! from a class therefore keeps contributing to the class percentage through
//! the sessions they attended.

use shared::{
    AttendanceBand, AttendanceEntry, AttendanceRecord, ClassDetails, ClassRoom, ClassStatistics,
    OverallStatistics, SessionSummary, StatisticsOverview, Student, StudentAttendance,
    StudentStatistics,
};

/// Round `value` to `digits` fraction digits, halves away from zero
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Percentage of expected attendances that were present, over a class's sessions.
///
/// Every roster student is expected at every session, so the denominator is
/// `roster.len() * sessions`. Returns 0 for an empty roster or no sessions.
pub fn class_attendance_percentage<'a, I>(roster: &[Student], records: I) -> f64
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let (sessions, total_present) = records
        .into_iter()
        .fold((0usize, 0usize), |(sessions, present), record| {
            (sessions + 1, present + record.present_count())
        });

    if roster.is_empty() || sessions == 0 {
        return 0.0;
    }

    let total_possible = roster.len() * sessions;
    round_to(total_present as f64 / total_possible as f64 * 100.0, 2)
}

/// How often one student was present.
///
/// Every record counts toward the total. A record without an entry for the
/// student counts as an absence.
pub fn student_attendance<'a, I>(student_id: &str, records: I) -> StudentAttendance
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut present = 0u32;
    let mut total = 0u32;

    for record in records {
        total += 1;
        if record
            .entry_for(student_id)
            .is_some_and(|entry| entry.status.is_present())
        {
            present += 1;
        }
    }

    let percentage = if total > 0 {
        format!("{:.2}", attendance_rate(present, total))
    } else {
        "0".to_string()
    };

    StudentAttendance {
        present,
        total,
        percentage,
    }
}

/// `present / total` as a percentage with two fraction digits, 0 when `total` is 0
pub fn attendance_rate(present: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(present as f64 / total as f64 * 100.0, 2)
}

/// Share of a single session's entries marked present, one fraction digit.
/// An empty session is 0.
pub fn session_percentage(record: &AttendanceRecord) -> f64 {
    summarize_entries(&record.attendance).percentage
}

pub fn session_summary(record: &AttendanceRecord) -> SessionSummary {
    summarize_entries(&record.attendance)
}

/// Counts for a list of entries, saved or not
pub fn summarize_entries(entries: &[AttendanceEntry]) -> SessionSummary {
    let total = entries.len();
    let present = entries.iter().filter(|e| e.status.is_present()).count();

    let percentage = if total == 0 {
        0.0
    } else {
        round_to(present as f64 / total as f64 * 100.0, 1)
    };

    SessionSummary {
        present: present as u32,
        absent: (total - present) as u32,
        total: total as u32,
        percentage,
    }
}

/// Class figure plus per-student figures. Records belonging to other classes
/// are ignored.
pub fn class_details(class: &ClassRoom, records: &[AttendanceRecord]) -> ClassDetails {
    let class_records: Vec<&AttendanceRecord> =
        records.iter().filter(|r| r.class_id == class.id).collect();

    let students = class
        .students
        .iter()
        .map(|student| {
            let attendance = student_attendance(&student.id, class_records.iter().copied());
            let band = AttendanceBand::from_percentage(attendance_rate(attendance.present, attendance.total));
            StudentStatistics {
                student: student.clone(),
                attendance,
                band,
            }
        })
        .collect();

    ClassDetails {
        class_id: class.id.clone(),
        class_name: class.name.clone(),
        total_students: class.students.len(),
        total_sessions: class_records.len(),
        percentage: class_attendance_percentage(&class.students, class_records.iter().copied()),
        students,
    }
}

/// Per-class statistics and totals across every class.
///
/// `total_sessions` counts every stored record, including any whose class no
/// longer exists. The average is the plain mean of the class percentages.
pub fn statistics_overview(classes: &[ClassRoom], records: &[AttendanceRecord]) -> StatisticsOverview {
    let class_stats: Vec<ClassStatistics> = classes
        .iter()
        .map(|class| {
            let class_records: Vec<&AttendanceRecord> =
                records.iter().filter(|r| r.class_id == class.id).collect();
            let percentage =
                class_attendance_percentage(&class.students, class_records.iter().copied());

            ClassStatistics {
                id: class.id.clone(),
                name: class.name.clone(),
                students: class.students.len(),
                sessions: class_records.len(),
                percentage,
                band: AttendanceBand::from_percentage(percentage),
            }
        })
        .collect();

    let average_attendance = if class_stats.is_empty() {
        0.0
    } else {
        let sum: f64 = class_stats.iter().map(|c| c.percentage).sum();
        round_to(sum / class_stats.len() as f64, 2)
    };

    let overall = OverallStatistics {
        total_classes: classes.len(),
        total_students: classes.iter().map(|c| c.students.len()).sum(),
        total_sessions: records.len(),
        average_attendance,
    };

    StatisticsOverview {
        classes: class_stats,
        overall,
    }
}
