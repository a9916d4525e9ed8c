use crate::data::{Clash, SlotKey};
use itertools::Itertools;
use log::{trace, warn};

/// A course examined in the slot together with its distinct, sorted rolls.
#[derive(Debug, Clone, Copy)]
pub struct SlotCourse<'a> {
    pub code: &'a str,
    pub rolls: &'a [String],
}

/// Finds students enrolled in more than one course of the same slot.
///
/// Read-only: clashes are reported, never resolved here.
pub struct ClashDetector;

impl ClashDetector {
    pub fn detect(slot: SlotKey, courses: &[SlotCourse<'_>]) -> Vec<Clash> {
        if courses.len() < 2 {
            return Vec::new();
        }

        let by_roll = courses
            .iter()
            .flat_map(|c| c.rolls.iter().map(move |r| (r.as_str(), c.code)))
            .into_group_map();
        trace!("{}: {} distinct rolls across {} courses", slot, by_roll.len(), courses.len());

        let clashes: Vec<Clash> = by_roll
            .into_iter()
            .filter_map(|(roll, codes)| {
                let codes: Vec<String> = codes.into_iter().sorted().dedup().map(str::to_string).collect();
                (codes.len() >= 2).then(|| Clash {
                    slot,
                    roll: roll.to_string(),
                    courses: codes,
                })
            })
            .sorted_by(|a, b| a.roll.cmp(&b.roll))
            .collect();

        for clash in &clashes {
            warn!("{}", clash);
        }
        clashes
    }
}
