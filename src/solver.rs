use crate::capacity::CapacityPlanner;
use crate::catalog::{NameBook, RoomCatalog, RosterBook};
use crate::data::SeatingRequest;
use crate::error::{AllocationIssue, SeatingError};
use crate::report::AllocationReport;
use crate::slot::{SeatingContext, process_timetable, process_timetable_concurrent};
use log::{info, trace, warn};
use std::sync::Arc;
use std::time::Instant;

/// Validates configuration and loads reference data. Configuration errors are
/// fatal; bad room rows come back as issues for the report.
pub fn prepare(input: &SeatingRequest) -> Result<(SeatingContext, AllocationReport), SeatingError> {
    let planner = CapacityPlanner::new(input.buffer, input.mode)?;
    let (catalog, mut issues) = RoomCatalog::from_records(&input.rooms);
    let rosters = RosterBook::from_map(&input.rosters);
    issues.extend(rosters.duplicated().map(|(course, roster)| AllocationIssue::DuplicateRosterEntry {
        slot: None,
        course: course.to_string(),
        rolls: roster.duplicates.clone(),
    }));
    for issue in &issues {
        warn!("{}", issue);
    }
    let names = NameBook::from_map(&input.names);

    info!(
        "Loaded {} rooms, {} course rosters and {} timetable slots (buffer {}, {} mode).",
        catalog.len(),
        rosters.course_count(),
        input.timetable.len(),
        planner.buffer(),
        planner.mode()
    );
    trace!(
        "Total raw seats across rooms: {}",
        catalog.rooms().iter().map(|r| u64::from(r.raw_capacity)).sum::<u64>()
    );

    let ctx = SeatingContext {
        catalog,
        rosters,
        names,
        planner,
    };
    Ok((ctx, AllocationReport::with_load_issues(issues)))
}

/// Allocates every slot of the timetable, one after another.
pub fn solve(input: &SeatingRequest) -> Result<AllocationReport, SeatingError> {
    let start_time = Instant::now();
    let (ctx, mut report) = prepare(input)?;

    info!("Starting seat allocation...");
    process_timetable(&ctx, &input.timetable, &mut report);

    log_summary(&report, start_time);
    Ok(report)
}

/// Same result as [`solve`], with slots spread over the blocking thread pool.
pub async fn solve_concurrent(input: SeatingRequest) -> Result<AllocationReport, SeatingError> {
    let start_time = Instant::now();
    let (ctx, mut report) = prepare(&input)?;

    info!("Starting seat allocation across {} slots concurrently...", input.timetable.len());
    process_timetable_concurrent(Arc::new(ctx), input.timetable, &mut report).await?;

    log_summary(&report, start_time);
    Ok(report)
}

fn log_summary(report: &AllocationReport, start_time: Instant) {
    info!(
        "Allocation finished in {:.2?}: {} seats in {} room allocations over {} slots; {} clashes, {} unallocated students, {} other issues.",
        start_time.elapsed(),
        report.seats_allocated(),
        report.allocations.len(),
        report.slots_processed.len(),
        report.clashes.len(),
        report.students_unallocated(),
        report.issues.len()
    );
}
