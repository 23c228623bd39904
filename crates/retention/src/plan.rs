//! Deletion planning
//!
//! Pure part of the retention pass: given the collection names the store
//! reported, decide which rotations of an alias are old enough to go.

use crate::candidate::{RetentionCandidate, trailing_ordinal};
use std::fmt;

/// Why a retention pass deleted nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No rotation of the alias exists besides the new collection
    NoCandidates,
    /// Fewer rotations than the keep floor
    NotEnoughHistory { candidates: usize, min_to_keep: i64 },
    /// The new collection name carries no ordinal to measure age against
    NoOrdinal,
    /// Every rotation is inside the retention window or protected by the floor
    NothingExpired,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no candidates"),
            Self::NotEnoughHistory {
                candidates,
                min_to_keep,
            } => write!(
                f,
                "{} candidates, fewer than the {} to keep",
                candidates, min_to_keep
            ),
            Self::NoOrdinal => write!(f, "concrete collection has no ordinal"),
            Self::NothingExpired => write!(f, "nothing expired"),
        }
    }
}

/// Collections to delete and to keep, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

/// Plan a retention pass over `collections`
///
/// Candidates are the rotations of `alias` other than `concrete`. They are
/// evaluated oldest first, so the keep floor always protects the newest
/// rotations. A candidate is marked when it is more than `max_age` ordinal
/// units older than `concrete` and, with `min_to_keep > 0`, at least
/// `min_to_keep` unmarked candidates would remain afterwards.
///
/// Both lists in the plan are ordered newest first.
pub fn plan_retention<S: AsRef<str>>(
    alias: &str,
    concrete: &str,
    collections: &[S],
    max_age: i64,
    min_to_keep: i64,
) -> Result<RetentionPlan, SkipReason> {
    let mut candidates: Vec<RetentionCandidate> = collections
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| *name != concrete)
        .filter_map(|name| RetentionCandidate::parse(alias, name))
        .collect();

    if candidates.is_empty() {
        return Err(SkipReason::NoCandidates);
    }
    if min_to_keep > 0 && (candidates.len() as i64) < min_to_keep {
        return Err(SkipReason::NotEnoughHistory {
            candidates: candidates.len(),
            min_to_keep,
        });
    }
    let current = trailing_ordinal(concrete).ok_or(SkipReason::NoOrdinal)?;

    candidates.sort_by(RetentionCandidate::newest_first);

    let total = candidates.len();
    let mut deleted = Vec::new();
    let mut kept = Vec::new();
    for candidate in candidates.into_iter().rev() {
        let age = i128::from(current) - i128::from(candidate.ordinal);
        let remaining = (total - deleted.len()) as i64;
        let expired = max_age > 0 && age > i128::from(max_age);
        let floor_holds = min_to_keep <= 0 || remaining - 1 >= min_to_keep;

        if expired && floor_holds {
            deleted.push(candidate.name);
        } else {
            kept.push(candidate.name);
        }
    }

    if deleted.is_empty() {
        return Err(SkipReason::NothingExpired);
    }
    deleted.reverse();
    kept.reverse();
    Ok(RetentionPlan { deleted, kept })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotations(alias: &str, ordinals: std::ops::RangeInclusive<u64>) -> Vec<String> {
        ordinals.map(|i| format!("{}-{}", alias, i)).collect()
    }

    #[test]
    fn test_window_and_floor() {
        let names = rotations("logs", 1..=10);
        let plan = plan_retention("logs", "logs-10", &names, 3, 2).unwrap();

        assert_eq!(
            plan.deleted,
            vec!["logs-6", "logs-5", "logs-4", "logs-3", "logs-2", "logs-1"]
        );
        assert_eq!(plan.kept, vec!["logs-9", "logs-8", "logs-7"]);
    }

    #[test]
    fn test_floor_protects_expired_candidates() {
        let names = rotations("logs", 1..=4);
        // everything but logs-4 itself is expired, but three must stay
        let plan = plan_retention("logs", "logs-100", &names, 1, 3).unwrap();

        assert_eq!(plan.deleted, vec!["logs-1"]);
        assert_eq!(plan.kept, vec!["logs-4", "logs-3", "logs-2"]);
    }

    #[test]
    fn test_floor_disabled() {
        let names = rotations("logs", 1..=5);
        let plan = plan_retention("logs", "logs-100", &names, 1, 0).unwrap();
        assert_eq!(plan.deleted.len(), 5);
        assert!(plan.kept.is_empty());

        let plan = plan_retention("logs", "logs-100", &names, 1, -1).unwrap();
        assert_eq!(plan.deleted.len(), 5);
    }

    #[test]
    fn test_keep_floor_property() {
        for count in 1..=12u64 {
            for max_age in 0..=6 {
                for min_to_keep in 1..=5 {
                    let names = rotations("logs", 1..=count);
                    let concrete = format!("logs-{}", count + 1);
                    if let Ok(plan) =
                        plan_retention("logs", &concrete, &names, max_age, min_to_keep)
                    {
                        let remaining = names.len() - plan.deleted.len();
                        assert!(
                            remaining as i64 >= min_to_keep,
                            "count={} max_age={} min_to_keep={}",
                            count,
                            max_age,
                            min_to_keep
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_not_enough_history() {
        let names = rotations("logs", 1..=2);
        let skip = plan_retention("logs", "logs-50", &names, 1, 3).unwrap_err();
        assert_eq!(
            skip,
            SkipReason::NotEnoughHistory {
                candidates: 2,
                min_to_keep: 3
            }
        );
    }

    #[test]
    fn test_concrete_is_never_a_candidate() {
        let names = rotations("logs", 1..=3);
        let plan = plan_retention("logs", "logs-3", &names, 1, 0).unwrap();
        assert_eq!(plan.deleted, vec!["logs-1"]);
        assert_eq!(plan.kept, vec!["logs-2"]);
    }

    #[test]
    fn test_foreign_names_are_ignored() {
        let names = vec!["metrics-1", "logs", "logs-old", "logs-eu-1", "logs-1"];
        let plan = plan_retention("logs", "logs-10", &names, 1, 0).unwrap();
        assert_eq!(plan.deleted, vec!["logs-1"]);
        assert!(plan.kept.is_empty());

        let names = vec!["metrics-1", "logs-old"];
        assert_eq!(
            plan_retention("logs", "logs-10", &names, 1, 0).unwrap_err(),
            SkipReason::NoCandidates
        );
    }

    #[test]
    fn test_zero_max_age_deletes_nothing() {
        let names = rotations("logs", 1..=5);
        assert_eq!(
            plan_retention("logs", "logs-100", &names, 0, 0).unwrap_err(),
            SkipReason::NothingExpired
        );
    }

    #[test]
    fn test_concrete_without_ordinal() {
        let names = rotations("logs", 1..=5);
        assert_eq!(
            plan_retention("logs", "logs-current", &names, 1, 0).unwrap_err(),
            SkipReason::NoOrdinal
        );
    }

    #[test]
    fn test_unsorted_input_gives_same_plan() {
        let mut names = rotations("logs", 1..=10);
        names.reverse();
        names.swap(2, 7);
        let plan = plan_retention("logs", "logs-10", &names, 3, 2).unwrap();
        assert_eq!(plan.kept, vec!["logs-9", "logs-8", "logs-7"]);
        assert_eq!(plan.deleted.len(), 6);
    }
}
