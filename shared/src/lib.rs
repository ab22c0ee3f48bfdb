use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A student on a class roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    /// Roll number assigned when a student is added to an existing class ("R3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
}

/// A named group of students tracked as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoom {
    pub id: String,
    pub name: String,
    /// Roster, in insertion order
    #[serde(default)]
    pub students: Vec<Student>,
    pub created_at: DateTime<Utc>,
}

impl ClassRoom {
    pub fn find_student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }
}

/// Presence of a single student in a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn toggled(self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Present,
        }
    }

    pub fn is_present(self) -> bool {
        self == AttendanceStatus::Present
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Absent => write!(f, "absent"),
        }
    }
}

/// One student's line in an attendance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub student_id: String,
    /// Snapshot of the student's name when the session was taken.
    /// Older edited records may not carry it.
    #[serde(default)]
    pub student_name: String,
    pub status: AttendanceStatus,
}

/// One dated snapshot of presence/absence for a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    /// ID of the class this record was taken for
    pub class_id: String,
    /// Class name at the time the record was taken
    pub class_name: String,
    /// Date of the session (RFC 3339)
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub attendance: Vec<AttendanceEntry>,
    /// When the record was persisted (RFC 3339)
    pub timestamp: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Number of entries marked present
    pub fn present_count(&self) -> usize {
        self.attendance.iter().filter(|a| a.status.is_present()).count()
    }

    /// Number of entries marked absent
    pub fn absent_count(&self) -> usize {
        self.attendance.len() - self.present_count()
    }

    pub fn entry_for(&self, student_id: &str) -> Option<&AttendanceEntry> {
        self.attendance.iter().find(|a| a.student_id == student_id)
    }
}

/// Input for persisting a new attendance record. The id and timestamp are
/// assigned on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendanceRecord {
    pub class_id: String,
    pub class_name: String,
    pub date: DateTime<Utc>,
    pub attendance: Vec<AttendanceEntry>,
}

/// Fields of a class that may be changed after creation.
///
/// Each present field overwrites the stored value as a whole; `students`
/// replaces the entire roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<Student>>,
}

impl ClassPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn students(students: Vec<Student>) -> Self {
        Self {
            students: Some(students),
            ..Self::default()
        }
    }

    pub fn apply(self, class: &mut ClassRoom) {
        if let Some(name) = self.name {
            class.name = name;
        }
        if let Some(students) = self.students {
            class.students = students;
        }
    }
}

/// Fields of an attendance record that may be changed after creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Vec<AttendanceEntry>>,
}

impl AttendanceRecordPatch {
    pub fn attendance(attendance: Vec<AttendanceEntry>) -> Self {
        Self {
            attendance: Some(attendance),
            ..Self::default()
        }
    }

    pub fn apply(self, record: &mut AttendanceRecord) {
        if let Some(class_name) = self.class_name {
            record.class_name = class_name;
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(attendance) = self.attendance {
            record.attendance = attendance;
        }
    }
}

/// Attendance tally for one student across a set of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub present: u32,
    pub total: u32,
    /// Two fraction digits ("66.67"), or "0" when there are no records
    pub percentage: String,
}

/// Counts for a single session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub present: u32,
    pub absent: u32,
    pub total: u32,
    /// One fraction digit
    pub percentage: f64,
}

/// Coarse rating used to colour percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    /// 75% and above
    Good,
    /// 50% up to 75%
    Warning,
    /// Below 50%
    Poor,
}

impl AttendanceBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 75.0 {
            AttendanceBand::Good
        } else if percentage >= 50.0 {
            AttendanceBand::Warning
        } else {
            AttendanceBand::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatistics {
    pub student: Student,
    pub attendance: StudentAttendance,
    pub band: AttendanceBand,
}

/// Everything shown for a single class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    pub class_id: String,
    pub class_name: String,
    pub total_students: usize,
    pub total_sessions: usize,
    pub percentage: f64,
    pub students: Vec<StudentStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStatistics {
    pub id: String,
    pub name: String,
    pub students: usize,
    pub sessions: usize,
    pub percentage: f64,
    pub band: AttendanceBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatistics {
    pub total_classes: usize,
    pub total_students: usize,
    pub total_sessions: usize,
    /// Mean of the per-class percentages, two fraction digits
    pub average_attendance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsOverview {
    pub classes: Vec<ClassStatistics>,
    pub overall: OverallStatistics,
}

/// Ids are written as strings, but rosters created by older builds stored
/// student ids as millisecond numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Integer(id) => id.to_string(),
    })
}
