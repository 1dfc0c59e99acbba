//! Merge session behavior: widening, finalization, and ownership.

use super::{on_march_first, test_location};
use crate::app::models::{Activity, OverlapMode, TimeInterval};
use crate::app::services::merge::MergeSession;
use crate::error::Error;

#[test]
fn final_interval_covers_every_contributed_timestamp() {
    let mut session = MergeSession::new(OverlapMode::WholeDay);
    let location = test_location("LOC-1");

    let handle = session
        .attach_visit(
            &location,
            TimeInterval::new(on_march_first(9, 0), on_march_first(10, 0)),
        )
        .unwrap();

    session
        .add_activity(
            handle,
            Activity::Reading {
                parameter_id: "HG".to_string(),
                unit: "m".to_string(),
                value: Some(1.42),
                time: Some(on_march_first(8, 15)),
            },
        )
        .unwrap();
    session
        .add_activity(
            handle,
            Activity::DischargeMeasurement {
                period: TimeInterval::new(on_march_first(11, 0), on_march_first(11, 45)),
                discharge: 7.3,
                unit: "m^3/s".to_string(),
            },
        )
        .unwrap();

    let visits = session.finalize().unwrap();
    assert_eq!(visits.len(), 1);
    let visit = &visits[0];

    assert_eq!(visit.interval.start, on_march_first(8, 15));
    assert_eq!(visit.interval.end, on_march_first(11, 45));
    assert_eq!(visit.activities.len(), 2);
}

#[test]
fn re_adding_covered_timestamps_never_shrinks_the_interval() {
    let mut session = MergeSession::new(OverlapMode::WholeDay);
    let location = test_location("LOC-1");

    let handle = session
        .attach_visit(
            &location,
            TimeInterval::new(on_march_first(8, 0), on_march_first(16, 0)),
        )
        .unwrap();

    session
        .add_activity(
            handle,
            Activity::Inspection {
                time: Some(on_march_first(12, 0)),
                notes: None,
            },
        )
        .unwrap();
    session
        .add_activity(
            handle,
            Activity::Inspection {
                time: Some(on_march_first(12, 0)),
                notes: None,
            },
        )
        .unwrap();

    let visits = session.finalize().unwrap();
    assert_eq!(visits[0].interval.start, on_march_first(8, 0));
    assert_eq!(visits[0].interval.end, on_march_first(16, 0));
}

#[test]
fn unknown_timestamps_do_not_affect_the_interval() {
    let mut session = MergeSession::new(OverlapMode::WholeDay);
    let location = test_location("LOC-1");

    let handle = session
        .attach_visit(
            &location,
            TimeInterval::new(on_march_first(9, 0), on_march_first(10, 0)),
        )
        .unwrap();
    session
        .add_activity(
            handle,
            Activity::Reading {
                parameter_id: "TW".to_string(),
                unit: "degC".to_string(),
                value: None,
                time: None,
            },
        )
        .unwrap();

    let visits = session.finalize().unwrap();
    assert_eq!(visits[0].interval.start, on_march_first(9, 0));
    assert_eq!(visits[0].interval.end, on_march_first(10, 0));
    assert_eq!(visits[0].activities.len(), 1);
}

#[test]
fn zero_width_fragment_widens_through_later_merges() {
    let mut session = MergeSession::new(OverlapMode::WholeDay);
    let location = test_location("LOC-1");

    let first = session
        .attach_visit(&location, TimeInterval::instant(on_march_first(8, 0)))
        .unwrap();
    let second = session
        .attach_visit(&location, TimeInterval::instant(on_march_first(14, 0)))
        .unwrap();

    assert_eq!(first, second);
    let visits = session.finalize().unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].interval.start, on_march_first(8, 0));
    assert_eq!(visits[0].interval.end, on_march_first(14, 0));
}

#[test]
fn visits_finalize_in_creation_order() {
    let mut session = MergeSession::new(OverlapMode::Strict);

    session
        .attach_visit(
            &test_location("LOC-B"),
            TimeInterval::new(on_march_first(8, 0), on_march_first(9, 0)),
        )
        .unwrap();
    session
        .attach_visit(
            &test_location("LOC-A"),
            TimeInterval::new(on_march_first(10, 0), on_march_first(11, 0)),
        )
        .unwrap();

    let visits = session.finalize().unwrap();
    assert_eq!(visits[0].location.identifier, "LOC-B");
    assert_eq!(visits[1].location.identifier, "LOC-A");
}

#[test]
fn first_reported_party_wins() {
    let mut session = MergeSession::new(OverlapMode::WholeDay);
    let location = test_location("LOC-1");

    let handle = session
        .attach_visit(&location, TimeInterval::instant(on_march_first(9, 0)))
        .unwrap();
    session.set_party(handle, "Smith, Jones").unwrap();
    session.set_party(handle, "Somebody Else").unwrap();

    let visits = session.finalize().unwrap();
    assert_eq!(visits[0].party.as_deref(), Some("Smith, Jones"));
}

#[test]
fn mutation_after_finalize_is_an_error() {
    let mut session = MergeSession::new(OverlapMode::WholeDay);
    let location = test_location("LOC-1");

    let handle = session
        .attach_visit(&location, TimeInterval::instant(on_march_first(9, 0)))
        .unwrap();
    session.finalize().unwrap();

    let add_err = session
        .add_activity(
            handle,
            Activity::Inspection {
                time: None,
                notes: None,
            },
        )
        .unwrap_err();
    assert!(matches!(add_err, Error::FinalizeAlreadyCalled));

    let attach_err = session
        .attach_visit(&location, TimeInterval::instant(on_march_first(10, 0)))
        .unwrap_err();
    assert!(matches!(attach_err, Error::FinalizeAlreadyCalled));

    let finalize_err = session.finalize().unwrap_err();
    assert!(matches!(finalize_err, Error::FinalizeAlreadyCalled));
}
