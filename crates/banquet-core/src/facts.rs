//! The inbound structured-facts bundle for one client turn.
//!
//! The core never parses text. An upstream extraction collaborator turns the
//! raw message into a [`TurnFacts`] bundle; the only trace of the original
//! prose kept here is `message_text` (for audit payloads) and the
//! [`MessageTopic`] tag it was classified under.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::requirements::{EventWindow, RequirementsPatch, SeatingLayout};

/// Lightweight classification of what the message is about, produced by the
/// external NLP collaborator. Keeps the core language-model-free: the Change
/// Detector consumes this tag instead of pattern-matching text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageTopic {
    /// The client is moving the event date.
    EventDateChange,
    /// A date was mentioned only as a payment/administrative reference
    /// ("we paid on the 3rd") and must not trigger a date detour.
    PaymentAcknowledgment,
    /// Anything else.
    #[default]
    Other,
}

/// The client's answer to a soft-conflict warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum ConflictReply {
    /// Drop the contested room and see other options.
    SeeAlternatives,
    /// Keep the contested room; escalates to a human once a reason is given.
    Insist { reason: Option<String> },
}

/// A human's approve/reject action, when this turn carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// The approval request being decided.
    pub request_id: Uuid,
    /// Approve or reject.
    pub approved: bool,
    /// For conflict resolutions: the winning process.
    pub winner_process_id: Option<Uuid>,
    /// Free-form notes from the decider.
    pub notes: Option<String>,
}

/// Everything the extraction layer pulled out of one inbound turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TurnFacts {
    /// Event date mentioned this turn, if any.
    pub event_date: Option<NaiveDate>,

    /// The client explicitly confirmed the (current or supplied) date.
    #[serde(default)]
    pub confirms_date: bool,

    /// Requirement facts mentioned this turn.
    #[serde(default)]
    pub requirements: RequirementsPatch,

    /// Room explicitly named by the client, if any.
    pub requested_room: Option<String>,

    /// The client accepted the outstanding offer.
    #[serde(default)]
    pub accepts_offer: bool,

    /// Answer to a pending soft-conflict warning.
    pub conflict_reply: Option<ConflictReply>,

    /// A human approve/reject action riding on this turn.
    pub approval: Option<ApprovalDecision>,

    /// The raw message, for audit payloads only.
    pub message_text: Option<String>,

    /// Topic classification of the message.
    #[serde(default)]
    pub topic: MessageTopic,
}

impl TurnFacts {
    /// Create a new builder.
    pub fn builder() -> TurnFactsBuilder {
        TurnFactsBuilder::default()
    }
}

/// Builder for [`TurnFacts`] with a fluent API.
#[derive(Debug, Default)]
pub struct TurnFactsBuilder {
    facts: TurnFacts,
}

impl TurnFactsBuilder {
    /// Set the mentioned event date.
    pub fn event_date(mut self, date: NaiveDate) -> Self {
        self.facts.event_date = Some(date);
        self
    }

    /// Mark the date as explicitly confirmed.
    pub fn confirms_date(mut self) -> Self {
        self.facts.confirms_date = true;
        self
    }

    /// Set the headcount.
    pub fn headcount(mut self, headcount: u32) -> Self {
        self.facts.requirements.headcount = Some(headcount);
        self
    }

    /// Set the time window.
    pub fn window(mut self, window: EventWindow) -> Self {
        self.facts.requirements.window = Some(window);
        self
    }

    /// Set the seating layout.
    pub fn layout(mut self, layout: SeatingLayout) -> Self {
        self.facts.requirements.layout = Some(layout);
        self
    }

    /// Set the requested feature list.
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facts.requirements.features =
            Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Name a specific room.
    pub fn requested_room(mut self, room: impl Into<String>) -> Self {
        self.facts.requested_room = Some(room.into());
        self
    }

    /// Mark the outstanding offer as accepted.
    pub fn accepts_offer(mut self) -> Self {
        self.facts.accepts_offer = true;
        self
    }

    /// Attach a soft-conflict reply.
    pub fn conflict_reply(mut self, reply: ConflictReply) -> Self {
        self.facts.conflict_reply = Some(reply);
        self
    }

    /// Attach a human approval decision.
    pub fn approval(mut self, decision: ApprovalDecision) -> Self {
        self.facts.approval = Some(decision);
        self
    }

    /// Attach the raw message text.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.facts.message_text = Some(text.into());
        self
    }

    /// Set the topic classification.
    pub fn topic(mut self, topic: MessageTopic) -> Self {
        self.facts.topic = topic;
        self
    }

    /// Build the facts bundle.
    pub fn build(self) -> TurnFacts {
        self.facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let facts = TurnFacts::builder()
            .event_date(NaiveDate::from_ymd_opt(2026, 4, 10).unwrap())
            .headcount(20)
            .features(["projector", "stage"])
            .topic(MessageTopic::EventDateChange)
            .build();

        assert_eq!(
            facts.event_date,
            Some(NaiveDate::from_ymd_opt(2026, 4, 10).unwrap())
        );
        assert_eq!(facts.requirements.headcount, Some(20));
        assert_eq!(facts.requirements.features.as_ref().unwrap().len(), 2);
        assert_eq!(facts.topic, MessageTopic::EventDateChange);
        assert!(!facts.confirms_date);
    }

    #[test]
    fn test_default_topic_is_other() {
        let facts = TurnFacts::builder().build();
        assert_eq!(facts.topic, MessageTopic::Other);
    }

    #[test]
    fn test_conflict_reply_serialization() {
        let reply = ConflictReply::Insist {
            reason: Some("anniversary".to_string()),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("insist"));

        let back: ConflictReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reply);
    }
}
