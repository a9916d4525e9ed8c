use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// Type aliases for clarity
pub type Roll = String;
pub type CourseCode = String;
pub type RoomNumber = String;
pub type Building = String;

/// Display name used when a roll has no entry in the name mapping.
pub const UNKNOWN_NAME: &str = "Unknown Name";

/// Exam session within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Session {
    Morning,
    Evening,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Morning => write!(f, "Morning"),
            Session::Evening => write!(f, "Evening"),
        }
    }
}

/// Seating density. Sparse seats each room at half of its effective capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Mode {
    #[serde(alias = "sparse")]
    Sparse,
    #[serde(alias = "dense")]
    Dense,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sparse" => Ok(Mode::Sparse),
            "dense" => Ok(Mode::Dense),
            other => Err(format!("mode must be 'Sparse' or 'Dense', got '{}'", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sparse => write!(f, "Sparse"),
            Mode::Dense => write!(f, "Dense"),
        }
    }
}

/// Identifies one exam slot: a date and a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub session: Session,
}

impl SlotKey {
    pub fn new(date: NaiveDate, session: Session) -> Self {
        Self { date, session }
    }

    pub fn weekday(&self) -> String {
        self.date.weekday().to_string()
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.date, self.session)
    }
}

/// One timetable row: the courses examined concurrently in a slot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    pub date: NaiveDate,
    pub session: Session,
    pub courses: Vec<CourseCode>,
}

impl TimetableSlot {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.date, self.session)
    }
}

/// A room row as supplied by the caller, before validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub number: RoomNumber,
    pub building: Building,
    pub capacity: i64,
}

/// The complete input for one allocation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingRequest {
    pub buffer: i64,
    pub mode: Mode,
    pub timetable: Vec<TimetableSlot>,
    pub rosters: BTreeMap<CourseCode, Vec<Roll>>,
    #[serde(default)]
    pub names: BTreeMap<Roll, String>,
    pub rooms: Vec<RoomRecord>,
}

/// A single seated student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub index: u32,
    pub roll: Roll,
    pub name: String,
}

/// Seats given to one course in one room during one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAllocation {
    pub slot: SlotKey,
    pub course: CourseCode,
    pub room: RoomNumber,
    pub building: Building,
    pub seats: Vec<Seat>,
}

/// A student enrolled in two or more courses examined in the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clash {
    pub slot: SlotKey,
    pub roll: Roll,
    pub courses: Vec<CourseCode>,
}

impl fmt::Display for Clash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CLASH on {}: {} is enrolled in {}",
            self.slot,
            self.roll,
            self.courses.join(", ")
        )
    }
}

/// Students of a course left without a seat because the slot ran out of rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnallocatedStudents {
    pub slot: SlotKey,
    pub course: CourseCode,
    pub count: usize,
    pub rolls: Vec<Roll>,
}

impl fmt::Display for UnallocatedStudents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot allocate all students for {} on {}. {} students remaining: {}",
            self.course,
            self.slot,
            self.count,
            self.rolls.join(";")
        )
    }
}

/// Per-slot seat usage of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacancyRow {
    pub slot: SlotKey,
    pub room: RoomNumber,
    pub building: Building,
    pub raw_capacity: u32,
    pub target_fill: u32,
    pub allotted: u32,
    pub vacant: u32,
}

/// Flat view of one allocation, matching the overall seating sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallRow {
    pub date: NaiveDate,
    pub day: String,
    pub session: Session,
    pub course: CourseCode,
    pub room: RoomNumber,
    pub allocated_count: usize,
    pub roll_list: String,
}

/// Totals for one room across every slot of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomVacancyTotal {
    pub room: RoomNumber,
    pub building: Building,
    pub raw_capacity: u32,
    pub allotted: u64,
    pub vacant: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Sparse".parse::<Mode>(), Ok(Mode::Sparse));
        assert_eq!(" dense ".parse::<Mode>(), Ok(Mode::Dense));
        assert!("half".parse::<Mode>().is_err());
    }

    #[test]
    fn slot_key_orders_by_date_then_session() {
        let d1 = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let mut keys = vec![
            SlotKey::new(d2, Session::Morning),
            SlotKey::new(d1, Session::Evening),
            SlotKey::new(d1, Session::Morning),
        ];
        keys.sort();
        assert_eq!(keys[0], SlotKey::new(d1, Session::Morning));
        assert_eq!(keys[2], SlotKey::new(d2, Session::Morning));
        assert_eq!(keys[0].weekday(), "Fri");
        assert_eq!(keys[0].to_string(), "2025-10-31 (Morning)");
    }

    #[test]
    fn request_deserializes_from_camel_case_json() {
        let json = r#"{
            "buffer": 5,
            "mode": "dense",
            "timetable": [{"date": "2025-10-31", "session": "Morning", "courses": ["CS101"]}],
            "rosters": {"CS101": ["r1", "r2"]},
            "rooms": [{"number": "101", "building": "B1", "capacity": 30}]
        }"#;
        let request: SeatingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.mode, Mode::Dense);
        assert!(request.names.is_empty());
        assert_eq!(request.timetable[0].key().session, Session::Morning);
    }
}
