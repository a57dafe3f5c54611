//! Change Detector: classifies what the latest turn revises.
//!
//! Compares the turn's structured facts against the process record. Date
//! takes priority over room, room over requirements; a single turn produces
//! at most one [`ChangeKind`]. A fact is only a *change* when there is
//! settled state to invalidate: supplying the first headcount is progress,
//! not a revision.

use banquet_core::{MessageTopic, ProcessRecord, TransitionReason, TurnFacts};
use serde::{Deserialize, Serialize};

/// What the client revised this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The confirmed event date moved.
    DateChange,
    /// A different room than the locked one was requested.
    RoomChange,
    /// A tracked requirement (headcount, window, layout, features) moved.
    RequirementsChange,
}

impl ChangeKind {
    /// The audit reason for the detour this change triggers.
    pub fn transition_reason(&self) -> TransitionReason {
        match self {
            ChangeKind::DateChange => TransitionReason::DateChange,
            ChangeKind::RoomChange => TransitionReason::RoomChange,
            ChangeKind::RequirementsChange => TransitionReason::RequirementsChange,
        }
    }
}

/// Classify the turn against the record. Returns `None` when no tracked
/// field differs from settled state.
pub fn classify(record: &ProcessRecord, facts: &TurnFacts) -> Option<ChangeKind> {
    // A date mentioned as a payment or administrative reference is not a
    // date change, whatever it reads as.
    if facts.topic != MessageTopic::PaymentAcknowledgment {
        if let (Some(mentioned), Some(chosen)) = (facts.event_date, record.chosen_date) {
            if mentioned != chosen && record.date_confirmed {
                return Some(ChangeKind::DateChange);
            }
        }
    }

    if let (Some(requested), Some(locked)) = (&facts.requested_room, &record.locked_room_id) {
        if requested != locked {
            return Some(ChangeKind::RoomChange);
        }
    }

    let room_evaluated =
        record.locked_room_id.is_some() || record.pending_room_decision.is_some();
    if room_evaluated && facts.requirements.differs_from(&record.requirements) {
        return Some(ChangeKind::RequirementsChange);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use banquet_core::{MessageTopic, TurnFacts};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
    }

    fn locked_record() -> ProcessRecord {
        let mut record = ProcessRecord::new();
        record.chosen_date = Some(d(10));
        record.date_confirmed = true;
        record.requirements.headcount = 20;
        record.refresh_requirements_hash();
        record.lock_room("Salon A", record.requirements_hash.clone());
        record
    }

    #[test]
    fn test_no_facts_no_change() {
        let record = locked_record();
        assert_eq!(classify(&record, &TurnFacts::default()), None);
    }

    #[test]
    fn test_new_date_is_a_date_change() {
        let record = locked_record();
        let facts = TurnFacts::builder()
            .event_date(d(24))
            .topic(MessageTopic::EventDateChange)
            .build();
        assert_eq!(classify(&record, &facts), Some(ChangeKind::DateChange));
    }

    #[test]
    fn test_payment_date_mention_is_not_a_date_change() {
        let record = locked_record();
        let facts = TurnFacts::builder()
            .event_date(d(24))
            .topic(MessageTopic::PaymentAcknowledgment)
            .message("we paid the deposit on the 24th")
            .build();
        assert_eq!(classify(&record, &facts), None);
    }

    #[test]
    fn test_unconfirmed_date_mention_is_negotiation_not_change() {
        let mut record = locked_record();
        record.date_confirmed = false;
        let facts = TurnFacts::builder().event_date(d(24)).build();
        assert_eq!(classify(&record, &facts), None);
    }

    #[test]
    fn test_other_room_is_a_room_change() {
        let record = locked_record();
        let facts = TurnFacts::builder().requested_room("Salon B").build();
        assert_eq!(classify(&record, &facts), Some(ChangeKind::RoomChange));
    }

    #[test]
    fn test_same_room_is_no_change() {
        let record = locked_record();
        let facts = TurnFacts::builder().requested_room("Salon A").build();
        assert_eq!(classify(&record, &facts), None);
    }

    #[test]
    fn test_headcount_move_is_a_requirements_change() {
        let record = locked_record();
        let facts = TurnFacts::builder().headcount(45).build();
        assert_eq!(classify(&record, &facts), Some(ChangeKind::RequirementsChange));
    }

    #[test]
    fn test_first_headcount_is_not_a_change() {
        // Nothing evaluated yet, so nothing to invalidate.
        let mut record = ProcessRecord::new();
        record.chosen_date = Some(d(10));
        record.date_confirmed = true;

        let facts = TurnFacts::builder().headcount(45).build();
        assert_eq!(classify(&record, &facts), None);
    }

    #[test]
    fn test_date_takes_priority_over_room_and_requirements() {
        let record = locked_record();
        let facts = TurnFacts::builder()
            .event_date(d(24))
            .topic(MessageTopic::EventDateChange)
            .requested_room("Salon B")
            .headcount(45)
            .build();
        assert_eq!(classify(&record, &facts), Some(ChangeKind::DateChange));
    }

    #[test]
    fn test_room_takes_priority_over_requirements() {
        let record = locked_record();
        let facts = TurnFacts::builder()
            .requested_room("Salon B")
            .headcount(45)
            .build();
        assert_eq!(classify(&record, &facts), Some(ChangeKind::RoomChange));
    }
}
