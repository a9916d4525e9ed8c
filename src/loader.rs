//! CSV readers for the four input tables.
//!
//! Column names follow the exam cell's spreadsheet exports:
//! `Date,Day,Morning,Evening`, `rollno,course_code`, `Roll,Name` and
//! `Room No.,Exam Capacity,Block`.

use crate::data::{CourseCode, Roll, RoomRecord, Session, TimetableSlot};
use crate::error::SeatingError;
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use log::{info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

#[derive(Debug, Deserialize)]
struct TimetableRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Morning", default)]
    morning: String,
    #[serde(rename = "Evening", default)]
    evening: String,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    rollno: String,
    course_code: String,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    #[serde(rename = "Roll")]
    roll: String,
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    #[serde(rename = "Room No.")]
    number: String,
    #[serde(rename = "Exam Capacity")]
    capacity: i64,
    #[serde(rename = "Block", default)]
    building: String,
}

/// Raw tables of one run, ready to be turned into a request.
#[derive(Debug, Clone, Default)]
pub struct LoadedInputs {
    pub timetable: Vec<TimetableSlot>,
    pub roster_entries: Vec<(CourseCode, Roll)>,
    pub names: BTreeMap<Roll, String>,
    pub rooms: Vec<RoomRecord>,
}

impl LoadedInputs {
    pub fn rosters(&self) -> BTreeMap<CourseCode, Vec<Roll>> {
        let mut rosters: BTreeMap<CourseCode, Vec<Roll>> = BTreeMap::new();
        for (course, roll) in &self.roster_entries {
            rosters.entry(course.clone()).or_default().push(roll.clone());
        }
        rosters
    }
}

pub fn load_all(timetable: &Path, rosters: &Path, names: &Path, rooms: &Path) -> Result<LoadedInputs, SeatingError> {
    let inputs = LoadedInputs {
        timetable: read_timetable(File::open(timetable)?, &timetable.display().to_string())?,
        roster_entries: read_rosters(File::open(rosters)?, &rosters.display().to_string())?,
        names: read_names(File::open(names)?, &names.display().to_string())?,
        rooms: read_rooms(File::open(rooms)?, &rooms.display().to_string())?,
    };
    info!(
        "Loaded {} timetable slots, {} roster entries, {} names and {} rooms.",
        inputs.timetable.len(),
        inputs.roster_entries.len(),
        inputs.names.len(),
        inputs.rooms.len()
    );
    Ok(inputs)
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    ReaderBuilder::new().trim(Trim::All).flexible(true).from_reader(source)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // spreadsheet exports sometimes carry a midnight time component
    let day = raw.split_whitespace().next().unwrap_or("");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Splits a `;`-separated session cell. `NO EXAM` or a blank cell means no courses.
fn parse_session_cell(cell: &str) -> Vec<CourseCode> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("no exam") {
        return Vec::new();
    }
    let all: Vec<&str> = cell.split(';').map(str::trim).filter(|c| !c.is_empty()).collect();
    let unique: Vec<CourseCode> = all.iter().unique().map(|c| c.to_string()).collect();
    if unique.len() != all.len() {
        warn!("Duplicate course codes dropped from timetable cell '{}'", cell);
    }
    unique
}

pub fn read_timetable<R: Read>(source: R, file: &str) -> Result<Vec<TimetableSlot>, SeatingError> {
    let mut slots = Vec::new();
    for (i, row) in reader(source).deserialize::<TimetableRow>().enumerate() {
        let row = row?;
        let line = i as u64 + 2;
        let date = parse_date(&row.date).ok_or_else(|| SeatingError::InvalidRow {
            file: file.to_string(),
            line,
            detail: format!("unrecognised date '{}'", row.date),
        })?;
        for (session, cell) in [(Session::Morning, &row.morning), (Session::Evening, &row.evening)] {
            let courses = parse_session_cell(cell);
            if !courses.is_empty() {
                slots.push(TimetableSlot {
                    date,
                    session,
                    courses,
                });
            }
        }
    }
    Ok(slots)
}

pub fn read_rosters<R: Read>(source: R, file: &str) -> Result<Vec<(CourseCode, Roll)>, SeatingError> {
    let mut entries = Vec::new();
    for (i, row) in reader(source).deserialize::<RosterRow>().enumerate() {
        let row = row?;
        if row.rollno.is_empty() || row.course_code.is_empty() {
            return Err(SeatingError::InvalidRow {
                file: file.to_string(),
                line: i as u64 + 2,
                detail: "blank roll or course code".to_string(),
            });
        }
        entries.push((row.course_code, row.rollno));
    }
    Ok(entries)
}

pub fn read_names<R: Read>(source: R, file: &str) -> Result<BTreeMap<Roll, String>, SeatingError> {
    let mut names = BTreeMap::new();
    for (i, row) in reader(source).deserialize::<NameRow>().enumerate() {
        let row = row?;
        if row.roll.is_empty() {
            return Err(SeatingError::InvalidRow {
                file: file.to_string(),
                line: i as u64 + 2,
                detail: "blank roll".to_string(),
            });
        }
        if let Some(previous) = names.insert(row.roll.clone(), row.name) {
            warn!("Roll {} has more than one name; '{}' replaced", row.roll, previous);
        }
    }
    Ok(names)
}

/// Room rows are passed through unvalidated; capacity and building checks
/// happen when the catalog is built so they surface as report issues.
pub fn read_rooms<R: Read>(source: R, file: &str) -> Result<Vec<RoomRecord>, SeatingError> {
    let mut rooms = Vec::new();
    for (i, row) in reader(source).deserialize::<RoomRow>().enumerate() {
        let row = row.map_err(|e| SeatingError::InvalidRow {
            file: file.to_string(),
            line: i as u64 + 2,
            detail: e.to_string(),
        })?;
        rooms.push(RoomRecord {
            number: row.number,
            building: row.building,
            capacity: row.capacity,
        });
    }
    Ok(rooms)
}
