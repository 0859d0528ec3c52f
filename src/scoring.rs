use tracing::debug;

use crate::models::{
    CorrelationMap, EngagementVector, Recommendation, RecommendationSummary, SuccessTemplate,
};

/// Gaps at or below this are treated as "target met".
pub const SIGNIFICANT_GAP: f64 = 0.05;
/// Denominator floor for anything divided by a target.
pub const TARGET_FLOOR: f64 = 0.01;
/// Number of recommendations surfaced to the student.
pub const FOCUS_LIMIT: usize = 5;

/// Rank the activities where the student trails the template.
///
/// Activities are visited in template order and only those present in both
/// vectors are considered. The result is sorted by `priority_score`
/// descending; equal scores keep template order.
pub fn compute_recommendations(
    engagement: &EngagementVector,
    template: &SuccessTemplate,
    correlations: Option<&CorrelationMap>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for (activity, target) in template.iter() {
        let Some(current) = engagement.get(activity) else {
            continue;
        };

        let gap = target - current;
        if gap.is_nan() || gap <= SIGNIFICANT_GAP {
            continue;
        }

        let correlation = correlations
            .and_then(|map| map.get(activity))
            .filter(|corr| corr.is_finite())
            .unwrap_or(0.0);

        recommendations.push(Recommendation {
            activity: activity.to_string(),
            current,
            target,
            gap,
            correlation,
            priority_score: priority_score(gap, correlation),
        });
    }

    recommendations.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    debug!(
        candidates = template.len(),
        selected = recommendations.len(),
        "computed recommendations"
    );
    recommendations
}

pub fn priority_score(gap: f64, correlation: f64) -> f64 {
    gap * (1.0 + correlation.abs())
}

/// How far below target the student is, as a percentage of the target.
pub fn gap_percent(rec: &Recommendation) -> f64 {
    rec.gap / rec.target.max(TARGET_FLOOR) * 100.0
}

/// Share of the target already reached, capped at 1.
pub fn progress(rec: &Recommendation) -> f64 {
    (rec.current / rec.target.max(TARGET_FLOOR)).min(1.0)
}

pub fn summarize(recommendations: &[Recommendation]) -> RecommendationSummary {
    RecommendationSummary {
        focus_count: recommendations.len().min(FOCUS_LIMIT),
        total_gap: recommendations.iter().map(|rec| rec.gap).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engagement(pairs: &[(&str, f64)]) -> EngagementVector {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn template(pairs: &[(&str, f64)]) -> SuccessTemplate {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn quiz_gap_is_weighted_by_correlation() {
        let correlations: CorrelationMap = [("quiz", 0.4)].into_iter().collect();
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.2)]),
            &template(&[("quiz", 0.8)]),
            Some(&correlations),
        );

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert!((rec.gap - 0.6).abs() < 1e-9);
        assert!((rec.priority_score - 0.84).abs() < 1e-9);
        assert!((gap_percent(rec) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn exceeded_target_is_excluded() {
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.9)]),
            &template(&[("quiz", 0.8)]),
            None,
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn gap_at_threshold_is_excluded() {
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.25)]),
            &template(&[("quiz", 0.25 + SIGNIFICANT_GAP)]),
            None,
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn template_only_activities_are_skipped() {
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.1)]),
            &template(&[("forumng", 0.9), ("quiz", 0.5)]),
            None,
        );
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].activity, "quiz");
        assert_eq!(recs[0].correlation, 0.0);
    }

    #[test]
    fn missing_correlation_entry_counts_as_zero() {
        let correlations: CorrelationMap = [("quiz", -0.5)].into_iter().collect();
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.1), ("url", 0.1)]),
            &template(&[("url", 0.5), ("quiz", 0.5)]),
            Some(&correlations),
        );
        assert_eq!(recs[0].activity, "quiz");
        assert!((recs[0].priority_score - 0.6).abs() < 1e-9);
        assert_eq!(recs[1].activity, "url");
        assert!((recs[1].priority_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn non_finite_correlation_counts_as_zero() {
        let correlations: CorrelationMap =
            [("quiz", f64::NAN), ("url", f64::INFINITY)].into_iter().collect();
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.4), ("url", 0.0)]),
            &template(&[("quiz", 0.5), ("url", 0.9)]),
            Some(&correlations),
        );
        let order: Vec<&str> = recs.iter().map(|r| r.activity.as_str()).collect();
        assert_eq!(order, ["url", "quiz"]);
        assert!(recs.iter().all(|r| r.priority_score.is_finite() && r.correlation == 0.0));
    }

    #[test]
    fn equal_scores_keep_template_order() {
        let recs = compute_recommendations(
            &engagement(&[("quiz", 0.1), ("page", 0.1), ("url", 0.1)]),
            &template(&[("url", 0.5), ("quiz", 0.5), ("page", 0.5)]),
            None,
        );
        let order: Vec<&str> = recs.iter().map(|r| r.activity.as_str()).collect();
        assert_eq!(order, ["url", "quiz", "page"]);
    }

    #[test]
    fn empty_inputs_produce_no_recommendations() {
        let recs = compute_recommendations(
            &EngagementVector::default(),
            &SuccessTemplate::default(),
            None,
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn zero_target_does_not_divide_by_zero() {
        let rec = Recommendation {
            activity: "quiz".to_string(),
            current: 0.0,
            target: 0.0,
            gap: 0.0,
            correlation: 0.0,
            priority_score: 0.0,
        };
        assert_eq!(gap_percent(&rec), 0.0);
        assert_eq!(progress(&rec), 0.0);
    }

    #[test]
    fn progress_is_capped_at_one() {
        let rec = Recommendation {
            activity: "quiz".to_string(),
            current: 0.3,
            target: 0.2,
            gap: -0.1,
            correlation: 0.0,
            priority_score: 0.0,
        };
        assert_eq!(progress(&rec), 1.0);
    }

    #[test]
    fn summary_caps_focus_and_sums_every_gap() {
        let pairs: Vec<(String, f64)> = (0..7).map(|i| (format!("a{i}"), 0.0)).collect();
        let targets: SuccessTemplate = pairs.iter().map(|(k, _)| (k.clone(), 0.5)).collect();
        let current: EngagementVector = pairs.into_iter().collect();

        let recs = compute_recommendations(&current, &targets, None);
        let summary = summarize(&recs);
        assert_eq!(summary.focus_count, FOCUS_LIMIT);
        assert!((summary.total_gap - 3.5).abs() < 1e-9);
    }

    fn activity_rows() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
        proptest::collection::vec((0.0f64..1.1, 0.0f64..1.0, -1.0f64..1.0), 0..24)
    }

    fn build(rows: &[(f64, f64, f64)]) -> (EngagementVector, SuccessTemplate, CorrelationMap) {
        let names: Vec<String> = (0..rows.len()).map(|i| format!("activity{i}")).collect();
        let engagement = names.iter().zip(rows).map(|(n, r)| (n.clone(), r.0)).collect();
        let template = names.iter().zip(rows).map(|(n, r)| (n.clone(), r.1)).collect();
        let correlations = names.iter().zip(rows).map(|(n, r)| (n.clone(), r.2)).collect();
        (engagement, template, correlations)
    }

    proptest! {
        #[test]
        fn every_recommendation_has_significant_gap(rows in activity_rows()) {
            let (engagement, template, correlations) = build(&rows);
            for rec in compute_recommendations(&engagement, &template, Some(&correlations)) {
                prop_assert!(rec.gap > SIGNIFICANT_GAP);
                prop_assert!((rec.priority_score - rec.gap * (1.0 + rec.correlation.abs())).abs() < 1e-12);
            }
        }

        #[test]
        fn output_is_sorted_with_stable_ties(rows in activity_rows()) {
            let (engagement, template, correlations) = build(&rows);
            let recs = compute_recommendations(&engagement, &template, Some(&correlations));
            let position = |activity: &str| template.iter().position(|(a, _)| a == activity);
            for pair in recs.windows(2) {
                prop_assert!(pair[0].priority_score >= pair[1].priority_score);
                if pair[0].priority_score == pair[1].priority_score {
                    prop_assert!(position(&pair[0].activity) < position(&pair[1].activity));
                }
            }
        }

        #[test]
        fn met_targets_yield_nothing(rows in activity_rows()) {
            let lifted: Vec<(f64, f64, f64)> =
                rows.iter().map(|&(_, target, corr)| (target + 0.01, target, corr)).collect();
            let (engagement, template, correlations) = build(&lifted);
            prop_assert!(compute_recommendations(&engagement, &template, Some(&correlations)).is_empty());
        }
    }
}
