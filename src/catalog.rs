//! Reference data loaded once per run: rooms, rosters and student names.
//!
//! Everything here is read-only after construction and is shared between
//! slots, including across worker threads.

use crate::data::{Building, CourseCode, Roll, RoomNumber, RoomRecord, UNKNOWN_NAME};
use crate::error::AllocationIssue;
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A validated room. Capacity is always positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub number: RoomNumber,
    pub building: Building,
    pub raw_capacity: u32,
}

impl Room {
    /// Position of this room in the natural room order.
    pub fn order_key(&self) -> (u64, &str) {
        (room_number_value(&self.number).unwrap_or(u64::MAX), &self.number)
    }
}

/// First run of digits in a room number: `104` for `"104"`, `1` for `"B1-104"`.
pub fn room_number_value(number: &str) -> Option<u64> {
    let digits: String = number
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Rooms available to every slot, kept in natural room order.
#[derive(Debug, Clone, Default)]
pub struct RoomCatalog {
    rooms: Vec<Room>,
}

impl RoomCatalog {
    /// Validates raw room rows. Rejected rows are returned as issues rather than errors.
    pub fn from_records(records: &[RoomRecord]) -> (Self, Vec<AllocationIssue>) {
        let mut issues = Vec::new();
        let mut seen = BTreeSet::new();
        let mut rooms = Vec::with_capacity(records.len());

        for record in records {
            let number = record.number.trim().to_string();
            let building = record.building.trim().to_string();

            if number.is_empty() {
                issues.push(AllocationIssue::MissingReferenceData {
                    slot: None,
                    subject: "room row".to_string(),
                    detail: "empty room number".to_string(),
                });
                continue;
            }
            if building.is_empty() {
                issues.push(AllocationIssue::MissingReferenceData {
                    slot: None,
                    subject: format!("room {}", number),
                    detail: "no building".to_string(),
                });
                continue;
            }
            let raw_capacity = match u32::try_from(record.capacity) {
                Ok(c) if c > 0 => c,
                _ => {
                    issues.push(AllocationIssue::InvalidRoomCapacity {
                        room: number,
                        capacity: record.capacity,
                    });
                    continue;
                }
            };
            if !seen.insert(number.clone()) {
                warn!("Room {} listed more than once; keeping the first row.", number);
                continue;
            }
            rooms.push(Room {
                number,
                building,
                raw_capacity,
            });
        }

        rooms.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        debug!("Room catalog holds {} rooms ({} rejected).", rooms.len(), issues.len());
        (Self { rooms }, issues)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Enrolment of one course. `rolls` is sorted and distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseRoster {
    pub rolls: Vec<Roll>,
    pub duplicates: Vec<Roll>,
}

impl CourseRoster {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Course code to roster mapping.
#[derive(Debug, Clone, Default)]
pub struct RosterBook {
    courses: BTreeMap<CourseCode, CourseRoster>,
}

impl RosterBook {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CourseCode, Roll)>,
    {
        let grouped = entries
            .into_iter()
            .map(|(course, roll)| (course.trim().to_string(), roll.trim().to_string()))
            .filter(|(course, roll)| !course.is_empty() && !roll.is_empty())
            .into_group_map();

        let courses = grouped
            .into_iter()
            .map(|(course, rolls)| {
                let counts = rolls.iter().counts();
                let duplicates: Vec<Roll> = counts
                    .iter()
                    .filter(|(_, n)| **n > 1)
                    .map(|(r, _)| (*r).clone())
                    .sorted()
                    .collect();
                if !duplicates.is_empty() {
                    warn!(
                        "Course {} lists {} roll(s) more than once: {}",
                        course,
                        duplicates.len(),
                        duplicates.join(";")
                    );
                }
                let rolls: Vec<Roll> = rolls.into_iter().sorted().dedup().collect();
                (course, CourseRoster { rolls, duplicates })
            })
            .collect();

        Self { courses }
    }

    pub fn from_map(map: &BTreeMap<CourseCode, Vec<Roll>>) -> Self {
        Self::from_entries(
            map.iter()
                .flat_map(|(course, rolls)| rolls.iter().map(move |r| (course.clone(), r.clone()))),
        )
    }

    pub fn get(&self, course: &str) -> Option<&CourseRoster> {
        self.courses.get(course)
    }

    /// Courses whose roster lists a roll more than once, by course code.
    pub fn duplicated(&self) -> impl Iterator<Item = (&str, &CourseRoster)> {
        self.courses
            .iter()
            .filter(|(_, roster)| roster.has_duplicates())
            .map(|(course, roster)| (course.as_str(), roster))
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

/// Roll to display name. Lookups never fail.
#[derive(Debug, Clone, Default)]
pub struct NameBook {
    names: HashMap<Roll, String>,
}

impl NameBook {
    pub fn from_map(map: &BTreeMap<Roll, String>) -> Self {
        let names = map
            .iter()
            .map(|(roll, name)| (roll.trim().to_string(), name.trim().to_string()))
            .filter(|(roll, name)| !roll.is_empty() && !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn name_of(&self, roll: &str) -> &str {
        self.names.get(roll).map(String::as_str).unwrap_or(UNKNOWN_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: &str, building: &str, capacity: i64) -> RoomRecord {
        RoomRecord {
            number: number.to_string(),
            building: building.to_string(),
            capacity,
        }
    }

    #[test]
    fn catalog_rejects_bad_rows_and_sorts_naturally() {
        let (catalog, issues) = RoomCatalog::from_records(&[
            record("110", "B1", 40),
            record("LT", "B1", 100),
            record("9", "B1", 30),
            record("104", "B1", 0),
            record("B-201", "", 50),
            record("102", "B1", -5),
            record("110", "B1", 99),
        ]);

        let numbers: Vec<&str> = catalog.rooms().iter().map(|r| r.number.as_str()).collect();
        assert_eq!(numbers, vec!["9", "110", "LT"]);
        assert_eq!(catalog.rooms()[1].raw_capacity, 40);
        assert_eq!(issues.len(), 3);
        assert!(matches!(
            issues[0],
            AllocationIssue::InvalidRoomCapacity { capacity: 0, .. }
        ));
        assert!(matches!(issues[1], AllocationIssue::MissingReferenceData { .. }));
    }

    #[test]
    fn room_number_value_takes_first_digit_run() {
        assert_eq!(room_number_value("104"), Some(104));
        assert_eq!(room_number_value("R-12a"), Some(12));
        assert_eq!(room_number_value("LT"), None);
    }

    #[test]
    fn roster_book_sorts_and_flags_duplicates() {
        let book = RosterBook::from_entries(vec![
            ("CS101".to_string(), "r3".to_string()),
            ("CS101".to_string(), " r1 ".to_string()),
            ("CS101".to_string(), "r3".to_string()),
            ("MA102".to_string(), "r2".to_string()),
        ]);
        let cs = book.get("CS101").unwrap();
        assert_eq!(cs.rolls, vec!["r1", "r3"]);
        assert_eq!(cs.duplicates, vec!["r3"]);
        assert!(!book.get("MA102").unwrap().has_duplicates());
        assert!(book.get("PH103").is_none());
        let flagged: Vec<&str> = book.duplicated().map(|(course, _)| course).collect();
        assert_eq!(flagged, vec!["CS101"]);
    }

    #[test]
    fn missing_names_fall_back_to_sentinel() {
        let mut map = BTreeMap::new();
        map.insert("r1".to_string(), "Asha".to_string());
        let names = NameBook::from_map(&map);
        assert_eq!(names.name_of("r1"), "Asha");
        assert_eq!(names.name_of("r2"), "Unknown Name");
    }
}
