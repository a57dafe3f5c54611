//! The structured requirements bundle: every fact that materially affects
//! room fit. Free-text notes deliberately live *outside* this type so they
//! can never leak into the fingerprint.

use std::collections::BTreeSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Seating layout requested for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeatingLayout {
    /// Rows of chairs facing front (default assumption for leads).
    #[default]
    Theater,
    /// Seated dinner at round or long tables.
    Banquet,
    /// Single large table.
    Boardroom,
    /// Classroom-style tables and chairs.
    Classroom,
    /// Standing reception, no fixed seating.
    Reception,
    /// U-shaped table arrangement.
    UShape,
}

/// A time window within the event day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    /// Start of the booked slot.
    pub start: NaiveTime,
    /// End of the booked slot.
    pub end: NaiveTime,
}

impl EventWindow {
    /// Create a window, normalizing an inverted pair.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Whether two windows on the same day overlap.
    ///
    /// Back-to-back slots (one ends exactly when the other starts) do not
    /// count as overlapping.
    pub fn overlaps(&self, other: &EventWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        // Whole-day hold until the client narrows it down.
        Self {
            start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        }
    }
}

/// The facts that decide whether a room fits.
///
/// `features` is a `BTreeSet` so two bundles with the same requests in a
/// different order are identical field-for-field, which keeps the
/// fingerprint order-independent without any sorting at hash time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Requirements {
    /// Expected number of attendees.
    pub headcount: u32,

    /// The slot within the event day.
    pub window: EventWindow,

    /// Requested seating layout.
    pub layout: SeatingLayout,

    /// Requested features and products (e.g. "projector", "stage", "dinner").
    pub features: BTreeSet<String>,
}

impl Requirements {
    /// Merge the non-empty fields of `other` into this bundle, returning
    /// whether anything tracked actually changed.
    pub fn merge(&mut self, other: &RequirementsPatch) -> bool {
        let mut changed = false;

        if let Some(headcount) = other.headcount {
            if headcount != self.headcount {
                self.headcount = headcount;
                changed = true;
            }
        }
        if let Some(window) = other.window {
            if window != self.window {
                self.window = window;
                changed = true;
            }
        }
        if let Some(layout) = other.layout {
            if layout != self.layout {
                self.layout = layout;
                changed = true;
            }
        }
        if let Some(features) = &other.features {
            if *features != self.features {
                self.features = features.clone();
                changed = true;
            }
        }

        changed
    }
}

/// Partial update to a [`Requirements`] bundle, as extracted from one turn.
/// `None` means "the turn did not mention this field".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequirementsPatch {
    pub headcount: Option<u32>,
    pub window: Option<EventWindow>,
    pub layout: Option<SeatingLayout>,
    pub features: Option<BTreeSet<String>>,
}

impl RequirementsPatch {
    /// True if the turn carried no requirement facts at all.
    pub fn is_empty(&self) -> bool {
        self.headcount.is_none()
            && self.window.is_none()
            && self.layout.is_none()
            && self.features.is_none()
    }

    /// Whether applying this patch to `current` would change anything.
    pub fn differs_from(&self, current: &Requirements) -> bool {
        let mut probe = current.clone();
        probe.merge(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_overlap() {
        let a = EventWindow::new(t(10, 0), t(14, 0));
        let b = EventWindow::new(t(13, 0), t(18, 0));
        let c = EventWindow::new(t(14, 0), t(18, 0));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c), "back-to-back slots do not overlap");
    }

    #[test]
    fn test_window_normalizes_inverted_pair() {
        let w = EventWindow::new(t(18, 0), t(10, 0));
        assert_eq!(w.start, t(10, 0));
        assert_eq!(w.end, t(18, 0));
    }

    #[test]
    fn test_merge_reports_changes() {
        let mut reqs = Requirements {
            headcount: 20,
            ..Default::default()
        };

        let patch = RequirementsPatch {
            headcount: Some(20),
            ..Default::default()
        };
        assert!(!reqs.merge(&patch), "same headcount is not a change");

        let patch = RequirementsPatch {
            headcount: Some(35),
            ..Default::default()
        };
        assert!(reqs.merge(&patch));
        assert_eq!(reqs.headcount, 35);
    }

    #[test]
    fn test_feature_order_is_irrelevant() {
        let a: BTreeSet<String> = ["projector", "stage"].iter().map(|s| s.to_string()).collect();
        let b: BTreeSet<String> = ["stage", "projector"].iter().map(|s| s.to_string()).collect();
        assert_eq!(a, b);
    }
}
