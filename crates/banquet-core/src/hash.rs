//! Content Hasher: deterministic fingerprint of a requirements bundle.
//!
//! Every other component uses this to answer "has anything that matters
//! changed since I last looked?". The exclusion set is structural: only the
//! fields of [`Requirements`] enter the digest, so free-text notes can never
//! perturb it. This is a fixed, versioned schema, not a heuristic.

use sha2::{Digest, Sha256};

use crate::requirements::Requirements;

/// Schema version folded into the digest so a future field change can never
/// collide with fingerprints written under the old layout.
const FINGERPRINT_VERSION: u8 = 1;

/// A hex-encoded SHA-256 fingerprint.
pub type Fingerprint = String;

/// Compute the fingerprint of a requirements bundle.
///
/// Identical bundles (field-for-field; feature order is irrelevant because
/// the set is ordered) always yield identical hashes; any material field
/// difference yields a different hash with overwhelming probability.
pub fn fingerprint(reqs: &Requirements) -> Fingerprint {
    let canonical = serde_json::json!({
        "v": FINGERPRINT_VERSION,
        "headcount": reqs.headcount,
        "window": { "start": reqs.window.start, "end": reqs.window.end },
        "layout": reqs.layout,
        "features": reqs.features,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::{EventWindow, SeatingLayout};
    use chrono::NaiveTime;
    use rand::{seq::SliceRandom, Rng};
    use std::collections::BTreeSet;

    fn base() -> Requirements {
        Requirements {
            headcount: 20,
            window: EventWindow::new(
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            ),
            layout: SeatingLayout::Banquet,
            features: ["projector", "stage"].iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_identical_bundles_hash_equal() {
        assert_eq!(fingerprint(&base()), fingerprint(&base()));
    }

    #[test]
    fn test_feature_order_does_not_matter() {
        let mut a = base();
        let mut b = base();
        a.features = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        // Inserted in a different order; BTreeSet canonicalizes.
        let mut shuffled: Vec<&str> = vec!["c", "a", "b"];
        shuffled.shuffle(&mut rand::thread_rng());
        b.features = shuffled.iter().map(|s| s.to_string()).collect();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_random_field_mutation_changes_hash() {
        // Randomized sensitivity sweep: mutate one tracked field at a time
        // and require the fingerprint to move.
        let mut rng = rand::thread_rng();
        let original = fingerprint(&base());

        for _ in 0..64 {
            let mut reqs = base();
            match rng.gen_range(0..4) {
                0 => reqs.headcount += rng.gen_range(1..500),
                1 => {
                    reqs.window = EventWindow::new(
                        NaiveTime::from_hms_opt(rng.gen_range(0..10), 0, 0).unwrap(),
                        NaiveTime::from_hms_opt(rng.gen_range(17..24) % 24, 30, 0).unwrap(),
                    )
                }
                2 => reqs.layout = SeatingLayout::UShape,
                _ => {
                    reqs.features.insert(format!("extra-{}", rng.gen::<u32>()));
                }
            }
            assert_ne!(fingerprint(&reqs), original, "mutated bundle must re-hash");
        }
    }

    #[test]
    fn test_empty_feature_set_differs_from_some() {
        let mut a = base();
        a.features = BTreeSet::new();
        assert_ne!(fingerprint(&a), fingerprint(&base()));
    }
}
