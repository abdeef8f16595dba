//! F1 reward between a candidate trace and the observed branch outcomes.

use tracez_grammar::Decision;

use crate::oracle::BranchTruth;

/// Reward for a well-formed but wrong submission.
pub const MIN_REWARD: f64 = -1.0;
/// Reward for a submission that does not parse.
pub const PARSE_FAILURE_REWARD: f64 = 2.0 * MIN_REWARD;

/// Counts behind an F1 reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Decisions in the candidate trace.
    pub provided: usize,
    /// Branch sites observed in the concrete run.
    pub actual: usize,
    /// Decisions whose site was observed with the same direction, capped at
    /// `actual`.
    pub matches: usize,
}

impl Score {
    /// Every agreeing decision counts, repeats included. The cap keeps recall
    /// at most one when repeats outnumber the observed sites.
    pub fn compute(decisions: &[Decision], truth: &BranchTruth) -> Self {
        let agreeing = decisions
            .iter()
            .filter(|d| {
                d.listing_line().and_then(|line| truth.get(&line))
                    == Some(&d.direction.is_taken())
            })
            .count();
        Self {
            provided: decisions.len(),
            actual: truth.len(),
            matches: agreeing.min(truth.len()),
        }
    }

    pub fn precision(&self) -> f64 {
        ratio(self.matches, self.provided)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.matches, self.actual)
    }

    /// Harmonic mean of precision and recall, `0.0` when both are zero.
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Reward in `[0, 1]` for a feasible trace.
pub fn score(decisions: &[Decision], truth: &BranchTruth) -> f64 {
    Score::compute(decisions, truth).f1()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truth(pairs: &[(u32, bool)]) -> BranchTruth {
        pairs.iter().copied().collect()
    }

    #[test]
    fn exact_match_scores_one() {
        let decisions = [Decision::not_taken(5), Decision::taken(7), Decision::taken(10)];
        let actual = truth(&[(5, false), (7, true), (10, true)]);
        assert_eq!(score(&decisions, &actual), 1.0);
    }

    #[test]
    fn both_empty_scores_zero() {
        assert_eq!(score(&[], &BranchTruth::new()), 0.0);
    }

    #[test]
    fn empty_trace_against_observed_sites_scores_zero() {
        assert_eq!(score(&[], &truth(&[(3, false), (5, false)])), 0.0);
    }

    #[test]
    fn no_overlap_scores_zero() {
        let decisions = [Decision::taken(5)];
        assert_eq!(score(&decisions, &truth(&[(5, false)])), 0.0);
    }

    #[test]
    fn unobserved_sites_only_lower_precision() {
        // 3 of 5 decisions observed and correct, 3 observed sites.
        let decisions = [
            Decision::taken(13),
            Decision::taken(15),
            Decision::taken(20),
            Decision::taken(23),
            Decision::not_taken(42),
        ];
        let actual = truth(&[(13, true), (15, true), (42, false)]);
        let s = Score::compute(&decisions, &actual);
        assert_eq!(s.matches, 3);
        assert_eq!(s.precision(), 0.6);
        assert_eq!(s.recall(), 1.0);
        assert!((s.f1() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn partial_recall() {
        let decisions = [Decision::taken(13), Decision::taken(15)];
        let actual = truth(&[(13, true), (15, true), (42, false), (51, false), (57, true)]);
        let s = Score::compute(&decisions, &actual);
        assert_eq!(s.precision(), 1.0);
        assert_eq!(s.recall(), 0.4);
        assert!((s.f1() - 2.0 * 0.4 / 1.4).abs() < 1e-12);
    }

    #[test]
    fn repeated_decisions_each_count() {
        let decisions = [Decision::taken(5), Decision::taken(5)];
        let s = Score::compute(&decisions, &truth(&[(5, true), (7, false)]));
        assert_eq!(s.matches, 2);
        assert_eq!(s.precision(), 1.0);
        assert_eq!(s.recall(), 1.0);
        assert_eq!(s.f1(), 1.0);
    }

    #[test]
    fn repeats_beyond_observed_sites_are_capped() {
        let decisions = [Decision::taken(5), Decision::taken(5)];
        let s = Score::compute(&decisions, &truth(&[(5, true)]));
        assert_eq!(s.matches, 1);
        assert_eq!(s.precision(), 0.5);
        assert_eq!(s.recall(), 1.0);
    }

    #[test]
    fn lines_outside_the_listing_never_match() {
        let decisions = [Decision::taken(-5), Decision::taken(5)];
        let s = Score::compute(&decisions, &truth(&[(5, true)]));
        assert_eq!(s.matches, 1);
        assert_eq!(s.provided, 2);
    }

    #[test]
    fn failure_rewards_keep_their_ratio() {
        assert_eq!(PARSE_FAILURE_REWARD, 2.0 * MIN_REWARD);
        assert!(PARSE_FAILURE_REWARD < MIN_REWARD);
    }
}
