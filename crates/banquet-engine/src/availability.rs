//! Availability Evaluator: ranks candidate rooms for a date, headcount and
//! feature request. Read-only; never mutates a process record.

use std::collections::BTreeSet;

use banquet_core::{
    Bookable, EventWindow, ProcessRecord, Requirements, ResourceStatus, Room, RoomCatalog,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bookability of one room for the requested slot.
///
/// Ordering doubles as ranking order: `Available` before `OptionHeld` before
/// `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// No other process holds the slot.
    Available,
    /// Another process holds a soft (Option) lock on an overlapping window.
    OptionHeld,
    /// A Confirmed lock blocks the slot, or capacity fails.
    Unavailable,
}

/// One hold in the derived booking ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hold {
    /// The process holding the slot.
    pub process_id: Uuid,
    /// The held room.
    pub room_id: String,
    /// The held date.
    pub date: NaiveDate,
    /// The held window within the day.
    pub window: EventWindow,
    /// Option or Confirmed.
    pub status: ResourceStatus,
    /// When the hold was first taken; first-come-first-served tiebreak.
    pub taken_at: Option<DateTime<Utc>>,
}

/// The booking state of every room, derived from all live process records.
#[derive(Debug, Clone, Default)]
pub struct BookingLedger {
    holds: Vec<Hold>,
}

impl BookingLedger {
    /// Derive the ledger from every process currently holding a room.
    pub fn derive<'a, I>(processes: I) -> Self
    where
        I: IntoIterator<Item = &'a ProcessRecord>,
    {
        let holds = processes
            .into_iter()
            .filter(|p| {
                matches!(
                    p.resource_status,
                    ResourceStatus::Option | ResourceStatus::Confirmed
                )
            })
            .filter_map(|p| {
                let room_id = p.locked_room_id.clone()?;
                let date = p.chosen_date?;
                Some(Hold {
                    process_id: p.id,
                    room_id,
                    date,
                    window: p.requirements.window,
                    status: p.resource_status,
                    taken_at: p.lock_taken_at,
                })
            })
            .collect();
        Self { holds }
    }

    /// Holds by *other* processes overlapping the given slot.
    pub fn competing_holds(
        &self,
        requesting: Uuid,
        room_id: &str,
        date: NaiveDate,
        window: &EventWindow,
    ) -> Vec<&Hold> {
        self.holds
            .iter()
            .filter(|h| {
                h.process_id != requesting
                    && h.room_id == room_id
                    && h.date == date
                    && h.window.overlaps(window)
            })
            .collect()
    }

    /// The earliest holder of the slot, the presumptive winner under
    /// first-come-first-served.
    pub fn first_holder(
        &self,
        room_id: &str,
        date: NaiveDate,
        window: &EventWindow,
    ) -> Option<Uuid> {
        // A hold missing its timestamp sorts last, never first.
        self.holds
            .iter()
            .filter(|h| h.room_id == room_id && h.date == date && h.window.overlaps(window))
            .min_by_key(|h| h.taken_at.unwrap_or(DateTime::<Utc>::MAX_UTC))
            .map(|h| h.process_id)
    }
}

/// One room's ranking entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRoom {
    /// The room.
    pub room_id: String,
    /// Bookability for the requested slot.
    pub status: RoomStatus,
    /// Requested features the room provides.
    pub matched_features: BTreeSet<String>,
    /// Requested features the room lacks.
    pub missing_features: BTreeSet<String>,
    /// Capacity under the requested layout, if supported.
    pub capacity: Option<u32>,
    /// Spare seats beyond the headcount; tightest acceptable fit ranks first.
    pub slack: Option<u32>,
}

impl RankedRoom {
    fn rank_key(&self) -> (RoomStatus, std::cmp::Reverse<usize>, u32, String) {
        (
            self.status,
            std::cmp::Reverse(self.matched_features.len()),
            self.slack.unwrap_or(u32::MAX),
            self.room_id.clone(),
        )
    }
}

/// The evaluator's output for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvaluation {
    /// All considered rooms, best first.
    pub ranked: Vec<RankedRoom>,
    /// The top-ranked proposable room (status Available or OptionHeld).
    pub proposal: Option<RankedRoom>,
    /// No room fits the headcount at all; the client must reduce the
    /// headcount, pick another date, or escalate.
    pub capacity_exceeded: bool,
}

/// Rank every catalog room for the given slot and requirements.
///
/// Rooms in `excluded` are left out of the ranking entirely (conflict
/// losses, see-alternatives choices).
pub fn evaluate(
    requesting: Uuid,
    date: NaiveDate,
    reqs: &Requirements,
    catalog: &RoomCatalog,
    ledger: &BookingLedger,
    excluded: &BTreeSet<String>,
) -> RoomEvaluation {
    let mut ranked: Vec<RankedRoom> = catalog
        .rooms()
        .iter()
        .filter(|room| !excluded.contains(room.id()))
        .map(|room| score_room(requesting, room, date, reqs, ledger))
        .collect();

    ranked.sort_by(|a, b| a.rank_key().cmp(&b.rank_key()));

    let any_capacity_fit = ranked.iter().any(|r| r.slack.is_some());
    let proposal = if any_capacity_fit {
        ranked
            .iter()
            .find(|r| matches!(r.status, RoomStatus::Available | RoomStatus::OptionHeld))
            .cloned()
    } else {
        None
    };

    RoomEvaluation {
        ranked,
        proposal,
        capacity_exceeded: !any_capacity_fit,
    }
}

/// Fast-path re-validation: the status of one specific room for the slot,
/// without re-ranking the catalog. `None` if the room does not exist.
pub fn check_single(
    requesting: Uuid,
    room_id: &str,
    date: NaiveDate,
    reqs: &Requirements,
    catalog: &RoomCatalog,
    ledger: &BookingLedger,
) -> Option<RoomStatus> {
    let room = catalog.get(room_id)?;
    Some(score_room(requesting, room, date, reqs, ledger).status)
}

fn score_room(
    requesting: Uuid,
    room: &Room,
    date: NaiveDate,
    reqs: &Requirements,
    ledger: &BookingLedger,
) -> RankedRoom {
    let capacity = room.capacity_for(reqs.layout);
    let fits = capacity.map_or(false, |cap| reqs.headcount <= cap);
    let slack = if fits {
        capacity.map(|cap| cap - reqs.headcount)
    } else {
        None
    };

    let matched_features: BTreeSet<String> = reqs
        .features
        .intersection(room.feature_set())
        .cloned()
        .collect();
    let missing_features: BTreeSet<String> = reqs
        .features
        .difference(room.feature_set())
        .cloned()
        .collect();

    let competing = ledger.competing_holds(requesting, room.id(), date, &reqs.window);
    let status = if !fits {
        RoomStatus::Unavailable
    } else if competing
        .iter()
        .any(|h| h.status == ResourceStatus::Confirmed)
    {
        RoomStatus::Unavailable
    } else if !competing.is_empty() {
        RoomStatus::OptionHeld
    } else {
        RoomStatus::Available
    };

    RankedRoom {
        room_id: room.id().to_string(),
        status,
        matched_features,
        missing_features,
        capacity,
        slack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banquet_core::{ProcessRecord, SeatingLayout};
    use std::collections::BTreeMap;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 7).unwrap()
    }

    fn room(name: &str, banquet_cap: u32, features: &[&str]) -> Room {
        let mut capacities = BTreeMap::new();
        capacities.insert(SeatingLayout::Banquet, banquet_cap);
        Room::new(name, capacities, features.iter().copied())
    }

    fn catalog() -> RoomCatalog {
        RoomCatalog::new(vec![
            room("Salon A", 40, &["projector"]),
            room("Salon B", 25, &["projector", "stage"]),
            room("Salon E", 100, &["stage"]),
        ])
    }

    fn reqs(headcount: u32, features: &[&str]) -> Requirements {
        Requirements {
            headcount,
            layout: SeatingLayout::Banquet,
            features: features.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn holder(room_id: &str, status: ResourceStatus) -> ProcessRecord {
        let mut p = ProcessRecord::new();
        p.chosen_date = Some(d());
        p.date_confirmed = true;
        p.requirements = reqs(30, &[]);
        p.refresh_requirements_hash();
        p.lock_room(room_id, p.requirements_hash.clone());
        p.resource_status = status;
        p
    }

    #[test]
    fn test_available_ranks_before_option_before_unavailable() {
        let p1 = holder("Salon A", ResourceStatus::Option);
        let p2 = holder("Salon E", ResourceStatus::Confirmed);
        let ledger = BookingLedger::derive([&p1, &p2]);

        let eval = evaluate(
            Uuid::new_v4(),
            d(),
            &reqs(20, &[]),
            &catalog(),
            &ledger,
            &BTreeSet::new(),
        );
        assert_eq!(eval.ranked[0].room_id, "Salon B");
        assert_eq!(eval.ranked[0].status, RoomStatus::Available);
        assert_eq!(eval.ranked[1].status, RoomStatus::OptionHeld);
        assert_eq!(eval.ranked[2].status, RoomStatus::Unavailable);
    }

    #[test]
    fn test_feature_coverage_breaks_status_ties() {
        let ledger = BookingLedger::default();
        let eval = evaluate(
            Uuid::new_v4(),
            d(),
            &reqs(20, &["projector", "stage"]),
            &catalog(),
            &ledger,
            &BTreeSet::new(),
        );
        // Salon B matches both features; Salon A only one.
        assert_eq!(eval.ranked[0].room_id, "Salon B");
        assert_eq!(eval.ranked[0].matched_features.len(), 2);
        assert!(eval.ranked[0].missing_features.is_empty());
    }

    #[test]
    fn test_tightest_fit_wins_among_equals() {
        let ledger = BookingLedger::default();
        let eval = evaluate(
            Uuid::new_v4(),
            d(),
            &reqs(20, &[]),
            &catalog(),
            &ledger,
            &BTreeSet::new(),
        );
        // No features requested: slack decides. Salon B (25) over A (40)
        // over E (100).
        let order: Vec<&str> = eval.ranked.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(order, vec!["Salon B", "Salon A", "Salon E"]);
    }

    #[test]
    fn test_capacity_exceeded_when_nothing_fits() {
        let ledger = BookingLedger::default();
        let eval = evaluate(
            Uuid::new_v4(),
            d(),
            &reqs(500, &[]),
            &catalog(),
            &ledger,
            &BTreeSet::new(),
        );
        assert!(eval.capacity_exceeded);
        assert_eq!(eval.proposal, None);
        assert!(eval.ranked.iter().all(|r| r.status == RoomStatus::Unavailable));
    }

    #[test]
    fn test_unsupported_layout_fails_capacity() {
        let ledger = BookingLedger::default();
        let mut r = reqs(10, &[]);
        r.layout = SeatingLayout::UShape;
        let eval = evaluate(Uuid::new_v4(), d(), &r, &catalog(), &ledger, &BTreeSet::new());
        assert!(eval.capacity_exceeded);
    }

    #[test]
    fn test_option_holder_is_proposable() {
        // Every fitting room is softly held, so feature coverage decides
        // among OptionHeld entries. Softly held rooms can still be proposed;
        // conflict handling comes later in the room step.
        let p1 = holder("Salon A", ResourceStatus::Option);
        let p2 = holder("Salon B", ResourceStatus::Option);
        let p3 = holder("Salon E", ResourceStatus::Option);
        let ledger = BookingLedger::derive([&p1, &p2, &p3]);
        let eval = evaluate(
            Uuid::new_v4(),
            d(),
            &reqs(20, &["projector", "stage"]),
            &catalog(),
            &ledger,
            &BTreeSet::new(),
        );
        assert_eq!(eval.proposal.as_ref().unwrap().room_id, "Salon B");
        assert_eq!(eval.proposal.as_ref().unwrap().status, RoomStatus::OptionHeld);
    }

    #[test]
    fn test_excluded_rooms_are_left_out_of_the_ranking() {
        let ledger = BookingLedger::default();
        let excluded: BTreeSet<String> = ["Salon B".to_string()].into_iter().collect();
        let eval = evaluate(
            Uuid::new_v4(),
            d(),
            &reqs(20, &[]),
            &catalog(),
            &ledger,
            &excluded,
        );
        assert!(eval.ranked.iter().all(|r| r.room_id != "Salon B"));
        assert_eq!(eval.proposal.as_ref().unwrap().room_id, "Salon A");
    }

    #[test]
    fn test_own_hold_does_not_compete() {
        let p1 = holder("Salon B", ResourceStatus::Option);
        let ledger = BookingLedger::derive([&p1]);
        let status = check_single(p1.id, "Salon B", d(), &reqs(20, &[]), &catalog(), &ledger);
        assert_eq!(status, Some(RoomStatus::Available));
    }

    #[test]
    fn test_check_single_sees_other_holds() {
        let p1 = holder("Salon B", ResourceStatus::Option);
        let ledger = BookingLedger::derive([&p1]);
        let status = check_single(
            Uuid::new_v4(),
            "Salon B",
            d(),
            &reqs(20, &[]),
            &catalog(),
            &ledger,
        );
        assert_eq!(status, Some(RoomStatus::OptionHeld));
    }

    #[test]
    fn test_non_overlapping_windows_do_not_compete() {
        use chrono::NaiveTime;
        let mut p1 = holder("Salon B", ResourceStatus::Confirmed);
        p1.requirements.window = EventWindow::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        let ledger = BookingLedger::derive([&p1]);

        let mut r = reqs(20, &[]);
        r.window = EventWindow::new(
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        );
        let status = check_single(Uuid::new_v4(), "Salon B", d(), &r, &catalog(), &ledger);
        assert_eq!(status, Some(RoomStatus::Available));
    }

    #[test]
    fn test_first_holder_is_earliest_taker() {
        let p1 = holder("Salon E", ResourceStatus::Option);
        let mut p2 = holder("Salon E", ResourceStatus::Option);
        p2.lock_taken_at = p1.lock_taken_at.map(|t| t + chrono::Duration::seconds(30));
        let ledger = BookingLedger::derive([&p2, &p1]);

        let reqs = reqs(30, &[]);
        assert_eq!(
            ledger.first_holder("Salon E", d(), &reqs.window),
            Some(p1.id)
        );
    }

    #[test]
    fn test_holder_without_timestamp_is_not_presumed_first() {
        let mut p1 = holder("Salon E", ResourceStatus::Option);
        p1.lock_taken_at = None;
        let p2 = holder("Salon E", ResourceStatus::Option);
        let ledger = BookingLedger::derive([&p1, &p2]);

        let reqs = reqs(30, &[]);
        assert_eq!(
            ledger.first_holder("Salon E", d(), &reqs.window),
            Some(p2.id)
        );
    }
}
