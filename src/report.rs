use crate::data::{
    Clash, OverallRow, RoomAllocation, RoomVacancyTotal, SlotKey, UnallocatedStudents, VacancyRow,
};
use crate::error::AllocationIssue;
use crate::slot::SlotOutcome;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// Results of a whole run, in slot processing order. Append-only while slots
/// are merged; read-only for renderers afterwards.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub slots_processed: Vec<SlotKey>,
    pub allocations: Vec<RoomAllocation>,
    pub vacancies: Vec<VacancyRow>,
    pub clashes: Vec<Clash>,
    pub unallocated: Vec<UnallocatedStudents>,
    pub issues: Vec<AllocationIssue>,
    /// Every issue, clash and shortfall as one line, in the order it was found.
    pub error_log: Vec<String>,
}

impl AllocationReport {
    /// Starts a report with problems found while loading reference data.
    pub fn with_load_issues(issues: Vec<AllocationIssue>) -> Self {
        let error_log = issues.iter().map(ToString::to_string).collect();
        Self {
            issues,
            error_log,
            ..Self::default()
        }
    }

    pub fn absorb(&mut self, slot: SlotKey, outcome: SlotOutcome) {
        self.error_log.extend(outcome.issues.iter().map(ToString::to_string));
        self.error_log.extend(outcome.clashes.iter().map(ToString::to_string));
        self.error_log.extend(outcome.unallocated.iter().map(ToString::to_string));

        self.slots_processed.push(slot);
        self.allocations.extend(outcome.allocations);
        self.vacancies.extend(outcome.vacancies);
        self.clashes.extend(outcome.clashes);
        self.unallocated.extend(outcome.unallocated);
        self.issues.extend(outcome.issues);
    }

    pub fn seats_allocated(&self) -> usize {
        self.allocations.iter().map(|a| a.seats.len()).sum()
    }

    pub fn students_unallocated(&self) -> usize {
        self.unallocated.iter().map(|u| u.count).sum()
    }

    /// One row per (slot, course, room), the shape of the overall seating sheet.
    pub fn overall_rows(&self) -> Vec<OverallRow> {
        self.allocations
            .iter()
            .map(|a| OverallRow {
                date: a.slot.date,
                day: a.slot.weekday(),
                session: a.slot.session,
                course: a.course.clone(),
                room: a.room.clone(),
                allocated_count: a.seats.len(),
                roll_list: a.seats.iter().map(|s| s.roll.as_str()).join(";"),
            })
            .collect()
    }

    /// Seats allotted and left vacant per room, summed over every slot.
    pub fn vacancy_by_room(&self) -> Vec<RoomVacancyTotal> {
        let mut totals: BTreeMap<&str, RoomVacancyTotal> = BTreeMap::new();
        for row in &self.vacancies {
            let total = totals.entry(row.room.as_str()).or_insert_with(|| RoomVacancyTotal {
                room: row.room.clone(),
                building: row.building.clone(),
                raw_capacity: row.raw_capacity,
                allotted: 0,
                vacant: 0,
            });
            total.allotted += u64::from(row.allotted);
            total.vacant += u64::from(row.vacant);
        }
        // keep natural room order from the first slot rather than string order
        let order: Vec<&str> = self.vacancies.iter().map(|v| v.room.as_str()).unique().collect();
        order.into_iter().filter_map(|room| totals.remove(room)).collect()
    }
}
