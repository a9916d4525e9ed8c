//! Greedy room packing for a single slot.
//!
//! Courses are placed largest roster first (ties by course code). Each course
//! starts in the roomiest free room, fills one room completely before touching
//! the next, stays in the building of its first room while that building has
//! space, and prefers the room closest to the one it used last. Commitments are final: there is no backtracking,
//! so the result is a heuristic packing with no optimality guarantee.

use crate::capacity::CapacityPlanner;
use crate::catalog::{Room, RoomCatalog, room_number_value};
use crate::clash::SlotCourse;
use crate::data::{Building, CourseCode, Roll, RoomNumber, SlotKey, VacancyRow};
use itertools::Itertools;
use log::{debug, trace};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct PoolRoom<'a> {
    room: &'a Room,
    target: u32,
    remaining: u32,
}

impl PoolRoom<'_> {
    fn used(&self) -> u32 {
        self.target - self.remaining
    }
}

/// Remaining seats per room for one slot. Built fresh for every slot and dropped afterwards.
#[derive(Debug, Clone)]
pub struct SlotPool<'a> {
    rooms: Vec<PoolRoom<'a>>,
}

impl<'a> SlotPool<'a> {
    pub fn new(catalog: &'a RoomCatalog, planner: &CapacityPlanner) -> Self {
        let rooms: Vec<PoolRoom<'a>> = catalog
            .rooms()
            .iter()
            .map(|room| {
                let target = planner.target_fill(room);
                PoolRoom {
                    room,
                    target,
                    remaining: target,
                }
            })
            .collect();

        for zero in rooms.iter().filter(|r| r.target == 0) {
            debug!(
                "Room {} has zero target fill (capacity {}, buffer {}, {} mode); not allocatable.",
                zero.room.number,
                zero.room.raw_capacity,
                planner.buffer(),
                planner.mode()
            );
        }
        Self { rooms }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn remaining_total(&self) -> u64 {
        self.rooms.iter().map(|r| u64::from(r.remaining)).sum()
    }

    /// Seat usage per room, in natural room order.
    pub fn vacancies(&self, slot: SlotKey) -> Vec<VacancyRow> {
        self.rooms
            .iter()
            .map(|r| VacancyRow {
                slot,
                room: r.room.number.clone(),
                building: r.room.building.clone(),
                raw_capacity: r.room.raw_capacity,
                target_fill: r.target,
                allotted: r.used(),
                vacant: r.remaining,
            })
            .collect()
    }

    /// Debits `count` seats from room `idx` and returns the first seat index handed out.
    fn take(&mut self, idx: usize, count: u32) -> u32 {
        let room = &mut self.rooms[idx];
        debug_assert!(count <= room.remaining);
        let first = room.used() + 1;
        room.remaining -= count;
        first
    }
}

/// Seats handed to a course in one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAssignment {
    pub room: RoomNumber,
    pub building: Building,
    pub seats: Vec<(u32, Roll)>,
}

/// Everything the allocator decided for one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursePlacement {
    pub course: CourseCode,
    pub rooms: Vec<RoomAssignment>,
    pub unseated: Vec<Roll>,
}

impl CoursePlacement {
    pub fn seated(&self) -> usize {
        self.rooms.iter().map(|r| r.seats.len()).sum()
    }
}

/// Where a course already sits: its first building and the last room it took.
#[derive(Debug, Clone, Copy)]
struct Anchor<'a> {
    building: &'a str,
    last: usize,
}

pub struct RoomAllocator;

impl RoomAllocator {
    /// Largest roster first, ties broken by ascending course code.
    pub fn order_courses<'c>(courses: &[SlotCourse<'c>]) -> Vec<SlotCourse<'c>> {
        courses
            .iter()
            .copied()
            .sorted_by(|a, b| b.rolls.len().cmp(&a.rolls.len()).then_with(|| a.code.cmp(b.code)))
            .collect()
    }

    /// Places every course in order against the shared pool. Courses run to
    /// completion one at a time since each one shrinks the pool for the next.
    pub fn allocate(pool: &mut SlotPool<'_>, courses: &[SlotCourse<'_>]) -> Vec<CoursePlacement> {
        Self::order_courses(courses)
            .into_iter()
            .map(|course| Self::place_course(pool, course))
            .collect()
    }

    fn place_course(pool: &mut SlotPool<'_>, course: SlotCourse<'_>) -> CoursePlacement {
        let mut used: Vec<usize> = Vec::new();
        let mut assignments = Vec::new();
        let mut pending: &[Roll] = course.rolls;
        let mut first_building: Option<&str> = None;

        // every iteration consumes a room, so the pool size bounds the loop
        for _ in 0..pool.room_count() {
            if pending.is_empty() {
                break;
            }
            let anchor = first_building.zip(used.last().copied()).map(|(building, last)| Anchor { building, last });
            let Some(idx) = Self::pick_room(pool, &used, anchor) else {
                break;
            };

            let room = pool.rooms[idx].room;
            let take = pool.rooms[idx].remaining.min(u32::try_from(pending.len()).unwrap_or(u32::MAX));
            let first_seat = pool.take(idx, take);
            let (seated, rest) = pending.split_at(take as usize);
            pending = rest;

            debug!(
                "Allocated {} students of {} to {} (seats {}..={}, {} left in room)",
                take,
                course.code,
                room.number,
                first_seat,
                first_seat + take - 1,
                pool.rooms[idx].remaining
            );

            assignments.push(RoomAssignment {
                room: room.number.clone(),
                building: room.building.clone(),
                seats: seated
                    .iter()
                    .enumerate()
                    .map(|(k, roll)| (first_seat + k as u32, roll.clone()))
                    .collect(),
            });
            used.push(idx);
            first_building.get_or_insert(room.building.as_str());
        }

        CoursePlacement {
            course: course.code.to_string(),
            rooms: assignments,
            unseated: pending.to_vec(),
        }
    }

    fn pick_room(pool: &SlotPool<'_>, used: &[usize], anchor: Option<Anchor<'_>>) -> Option<usize> {
        let candidates: Vec<usize> = (0..pool.rooms.len())
            .filter(|i| pool.rooms[*i].remaining > 0 && !used.contains(i))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let Some(a) = anchor else {
            // first room of a course: the roomiest room anywhere; candidates are
            // in natural room order, so min_by_key keeps the lowest room on ties
            let choice = candidates
                .into_iter()
                .min_by_key(|&i| std::cmp::Reverse(pool.rooms[i].remaining));
            trace!("picked {:?} as first room", choice);
            return choice;
        };

        let building = if candidates.iter().any(|&i| pool.rooms[i].room.building == a.building) {
            a.building
        } else {
            Self::roomiest_building(pool, &candidates)
        };
        let choice = candidates
            .into_iter()
            .filter(|&i| pool.rooms[i].room.building == building)
            .min_by_key(|&i| Self::distance(pool, a.last, i));
        trace!("picked {:?} in building {} (anchor {:?})", choice, building, a);
        choice
    }

    /// Building with the most remaining seats over the candidate rooms; ties by name.
    fn roomiest_building<'p>(pool: &SlotPool<'p>, candidates: &[usize]) -> &'p str {
        let mut totals: BTreeMap<&'p str, u64> = BTreeMap::new();
        for &i in candidates {
            let r = &pool.rooms[i];
            *totals.entry(r.room.building.as_str()).or_insert(0) += u64::from(r.remaining);
        }
        totals
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(building, _)| building)
            .unwrap_or_default()
    }

    /// Rooms with comparable numbers sort by numeric gap; anything else by
    /// position in the natural room order, after all numeric matches.
    fn distance(pool: &SlotPool<'_>, from: usize, to: usize) -> (u8, u64) {
        let a = room_number_value(&pool.rooms[from].room.number);
        let b = room_number_value(&pool.rooms[to].room.number);
        match (a, b) {
            (Some(x), Some(y)) => (0, x.abs_diff(y)),
            _ => (1, from.abs_diff(to) as u64),
        }
    }
}
