use crate::allocator::{RoomAllocator, SlotPool};
use crate::capacity::CapacityPlanner;
use crate::catalog::{NameBook, RoomCatalog, RosterBook};
use crate::clash::{ClashDetector, SlotCourse};
use crate::data::{
    Clash, RoomAllocation, Seat, SlotKey, TimetableSlot, UnallocatedStudents, VacancyRow,
};
use crate::error::{AllocationIssue, SeatingError};
use crate::report::AllocationReport;
use itertools::Itertools;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Immutable inputs shared by every slot of a run.
#[derive(Debug, Clone)]
pub struct SeatingContext {
    pub catalog: RoomCatalog,
    pub rosters: RosterBook,
    pub names: NameBook,
    pub planner: CapacityPlanner,
}

/// Everything one slot produced. Either complete or never built.
#[derive(Debug, Clone, Default)]
pub struct SlotOutcome {
    pub allocations: Vec<RoomAllocation>,
    pub vacancies: Vec<VacancyRow>,
    pub clashes: Vec<Clash>,
    pub unallocated: Vec<UnallocatedStudents>,
    pub issues: Vec<AllocationIssue>,
}

/// Runs clash detection then room allocation for one slot.
pub struct SlotProcessor<'a> {
    ctx: &'a SeatingContext,
}

impl<'a> SlotProcessor<'a> {
    pub fn new(ctx: &'a SeatingContext) -> Self {
        Self { ctx }
    }

    pub fn process(&self, entry: &TimetableSlot) -> SlotOutcome {
        let slot = entry.key();
        let mut outcome = SlotOutcome::default();

        let codes: Vec<&str> = entry
            .courses
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .unique()
            .collect();
        if codes.len() != entry.courses.len() {
            warn!("{}: duplicate or blank course codes dropped from the timetable row", slot);
        }

        let mut known = Vec::with_capacity(codes.len());
        let mut allocatable = Vec::with_capacity(codes.len());
        for code in codes {
            let Some(roster) = self.ctx.rosters.get(code) else {
                outcome.issues.push(AllocationIssue::MissingReferenceData {
                    slot: Some(slot),
                    subject: format!("course {}", code),
                    detail: "no roster".to_string(),
                });
                continue;
            };
            let course = SlotCourse {
                code,
                rolls: &roster.rolls,
            };
            known.push(course);
            if roster.has_duplicates() {
                outcome.issues.push(AllocationIssue::DuplicateRosterEntry {
                    slot: Some(slot),
                    course: code.to_string(),
                    rolls: roster.duplicates.clone(),
                });
            } else {
                allocatable.push(course);
            }
        }
        if self.ctx.catalog.is_empty() && !allocatable.is_empty() {
            outcome.issues.push(AllocationIssue::MissingReferenceData {
                slot: Some(slot),
                subject: "room pool".to_string(),
                detail: "no room has a capacity entry".to_string(),
            });
        }
        for issue in &outcome.issues {
            warn!("{}", issue);
        }

        outcome.clashes = ClashDetector::detect(slot, &known);

        let mut pool = SlotPool::new(&self.ctx.catalog, &self.ctx.planner);
        for placement in RoomAllocator::allocate(&mut pool, &allocatable) {
            debug!(
                "{}: {} seated {} in {} rooms, {} unseated",
                slot,
                placement.course,
                placement.seated(),
                placement.rooms.len(),
                placement.unseated.len()
            );
            for assigned in placement.rooms {
                outcome.allocations.push(RoomAllocation {
                    slot,
                    course: placement.course.clone(),
                    room: assigned.room,
                    building: assigned.building,
                    seats: assigned
                        .seats
                        .into_iter()
                        .map(|(index, roll)| Seat {
                            index,
                            name: self.ctx.names.name_of(&roll).to_string(),
                            roll,
                        })
                        .collect(),
                });
            }
            if !placement.unseated.is_empty() {
                let shortfall = UnallocatedStudents {
                    slot,
                    course: placement.course,
                    count: placement.unseated.len(),
                    rolls: placement.unseated,
                };
                error!("{}", shortfall);
                outcome.unallocated.push(shortfall);
            }
        }
        outcome.vacancies = pool.vacancies(slot);

        info!(
            "{}: {} courses, {} room allocations, {} clashes, {} shortfalls, {} seats left",
            slot,
            known.len(),
            outcome.allocations.len(),
            outcome.clashes.len(),
            outcome.unallocated.len(),
            pool.remaining_total()
        );
        outcome
    }
}

/// Processes every slot in timetable order on the calling thread.
pub fn process_timetable(ctx: &SeatingContext, timetable: &[TimetableSlot], report: &mut AllocationReport) {
    let processor = SlotProcessor::new(ctx);
    for entry in timetable {
        let outcome = processor.process(entry);
        report.absorb(entry.key(), outcome);
    }
}

/// Processes slots concurrently on the blocking pool. Slots share no mutable
/// state, and outcomes are merged in timetable order so the report matches
/// [`process_timetable`] exactly.
pub async fn process_timetable_concurrent(
    ctx: Arc<SeatingContext>,
    timetable: Vec<TimetableSlot>,
    report: &mut AllocationReport,
) -> Result<(), SeatingError> {
    let handles: Vec<(SlotKey, tokio::task::JoinHandle<SlotOutcome>)> = timetable
        .into_iter()
        .map(|entry| {
            let ctx = Arc::clone(&ctx);
            let key = entry.key();
            let handle = tokio::task::spawn_blocking(move || SlotProcessor::new(&ctx).process(&entry));
            (key, handle)
        })
        .collect();

    for (key, handle) in handles {
        let outcome = handle.await?;
        report.absorb(key, outcome);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Mode, RoomRecord, Session};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn context(buffer: i64, mode: Mode, rooms: &[(&str, &str, i64)], rosters: &[(&str, &[&str])]) -> SeatingContext {
        let records: Vec<RoomRecord> = rooms
            .iter()
            .map(|(n, b, c)| RoomRecord {
                number: n.to_string(),
                building: b.to_string(),
                capacity: *c,
            })
            .collect();
        let entries = rosters
            .iter()
            .flat_map(|(course, rolls)| rolls.iter().map(move |r| (course.to_string(), r.to_string())));
        let mut names = BTreeMap::new();
        names.insert("r1".to_string(), "Asha Rao".to_string());
        SeatingContext {
            catalog: RoomCatalog::from_records(&records).0,
            rosters: RosterBook::from_entries(entries),
            names: NameBook::from_map(&names),
            planner: CapacityPlanner::new(buffer, mode).unwrap(),
        }
    }

    fn entry(day: u32, session: Session, courses: &[&str]) -> TimetableSlot {
        TimetableSlot {
            date: NaiveDate::from_ymd_opt(2025, 11, day).unwrap(),
            session,
            courses: courses.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn clashing_student_is_seated_under_both_courses() {
        let ctx = context(
            0,
            Mode::Dense,
            &[("101", "B1", 3), ("102", "B1", 3)],
            &[("A", &["r1", "r2"]), ("B", &["r2", "r3"])],
        );
        let outcome = SlotProcessor::new(&ctx).process(&entry(3, Session::Morning, &["A", "B"]));

        assert_eq!(outcome.clashes.len(), 1);
        assert_eq!(outcome.clashes[0].roll, "r2");
        let seats_for_r2 = outcome
            .allocations
            .iter()
            .flat_map(|a| a.seats.iter().map(move |s| (a.course.as_str(), s.roll.as_str())))
            .filter(|(_, roll)| *roll == "r2")
            .count();
        assert_eq!(seats_for_r2, 2);
        assert!(outcome.unallocated.is_empty());
    }

    #[test]
    fn missing_and_duplicate_rosters_are_logged_not_fatal() {
        let ctx = context(
            0,
            Mode::Dense,
            &[("101", "B1", 10)],
            &[("A", &["r1", "r2"]), ("DUP", &["r3", "r3", "r4"])],
        );
        let outcome = SlotProcessor::new(&ctx).process(&entry(3, Session::Evening, &["A", "GHOST", "DUP"]));

        assert_eq!(outcome.issues.len(), 2);
        assert!(matches!(&outcome.issues[0], AllocationIssue::MissingReferenceData { subject, .. } if subject == "course GHOST"));
        assert!(matches!(&outcome.issues[1], AllocationIssue::DuplicateRosterEntry { course, rolls, .. } if course == "DUP" && rolls == &vec!["r3".to_string()]));
        assert_eq!(outcome.allocations.len(), 1);
        assert_eq!(outcome.allocations[0].course, "A");
        assert_eq!(outcome.allocations[0].seats[0].name, "Asha Rao");
        assert_eq!(outcome.allocations[0].seats[1].name, "Unknown Name");
    }

    #[test]
    fn capacity_resets_between_slots() {
        let ctx = context(0, Mode::Dense, &[("101", "B1", 5)], &[("A", &["r1", "r2", "r3", "r4", "r5"]), ("B", &["r6", "r7", "r8", "r9", "s1"])]);
        let timetable = vec![
            entry(3, Session::Morning, &["A"]),
            entry(3, Session::Evening, &["B"]),
        ];
        let mut report = AllocationReport::default();
        process_timetable(&ctx, &timetable, &mut report);

        assert!(report.unallocated.is_empty());
        assert_eq!(report.allocations.len(), 2);
        assert!(report.vacancies.iter().all(|v| v.allotted == 5 && v.vacant == 0));
    }

    #[test]
    fn empty_catalog_is_reported_once_per_slot() {
        let ctx = context(0, Mode::Dense, &[], &[("A", &["r1"])]);
        let outcome = SlotProcessor::new(&ctx).process(&entry(4, Session::Morning, &["A"]));
        assert!(matches!(&outcome.issues[0], AllocationIssue::MissingReferenceData { subject, .. } if subject == "room pool"));
        assert_eq!(outcome.unallocated[0].rolls, vec!["r1"]);
    }

    #[tokio::test]
    async fn concurrent_run_matches_sequential_run() {
        let ctx = context(
            2,
            Mode::Sparse,
            &[("101", "B1", 12), ("102", "B1", 14), ("201", "B2", 22)],
            &[("A", &["r1", "r2", "r3", "r4", "r5", "r6", "r7"]), ("B", &["r2", "r8", "r9"]), ("C", &["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "t1", "t2", "t3"])],
        );
        let timetable = vec![
            entry(3, Session::Morning, &["A", "B"]),
            entry(3, Session::Evening, &["C"]),
            entry(4, Session::Morning, &["A", "B", "C"]),
        ];

        let mut sequential = AllocationReport::default();
        process_timetable(&ctx, &timetable, &mut sequential);

        let mut concurrent = AllocationReport::default();
        process_timetable_concurrent(Arc::new(ctx), timetable, &mut concurrent)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&sequential).unwrap(),
            serde_json::to_string(&concurrent).unwrap()
        );
    }
}
