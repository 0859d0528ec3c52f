use crate::explain::{NOTABLE_CORRELATION, STRONG_CORRELATION};
use crate::models::{
    ComparisonRow, CorrelationMap, CorrelationTier, EngagementLevel, EngagementVector,
    GapStatus, RankedCorrelation, SuccessTemplate,
};

const CLOSE_GAP: f64 = 0.1;
const VISIBLE_LEVEL: f64 = 0.01;
const FALLBACK_VISIBLE: usize = 10;

pub fn gap_status(gap: f64) -> GapStatus {
    if gap <= 0.0 {
        GapStatus::AboveTarget
    } else if gap < CLOSE_GAP {
        GapStatus::Close
    } else {
        GapStatus::BelowTarget
    }
}

/// Side-by-side view of the student against successful peers, in the
/// student's activity order.
pub fn peer_comparison(
    engagement: &EngagementVector,
    template: &SuccessTemplate,
) -> Vec<ComparisonRow> {
    engagement
        .iter()
        .filter_map(|(activity, you)| {
            let peers = template.get(activity)?;
            let gap = peers - you;
            Some(ComparisonRow {
                activity: activity.to_string(),
                you,
                successful_peers: peers,
                gap,
                status: gap_status(gap),
            })
        })
        .collect()
}

/// Activities worth charting: anything above a trace level, or the first few
/// when the student has barely engaged at all. Each carries the template's
/// target, 0 for activities the template leaves out.
pub fn visible_engagement(
    engagement: &EngagementVector,
    template: Option<&SuccessTemplate>,
) -> Vec<EngagementLevel> {
    let visible: Vec<EngagementLevel> = engagement
        .iter()
        .filter(|(_, level)| *level > VISIBLE_LEVEL)
        .map(|(activity, level)| engagement_level(activity, level, template))
        .collect();

    if !visible.is_empty() {
        return visible;
    }

    engagement
        .iter()
        .take(FALLBACK_VISIBLE)
        .map(|(activity, level)| engagement_level(activity, level, template))
        .collect()
}

/// Every activity, lowest engagement first.
pub fn engagement_by_level(
    engagement: &EngagementVector,
    template: Option<&SuccessTemplate>,
) -> Vec<EngagementLevel> {
    let mut levels: Vec<EngagementLevel> = engagement
        .iter()
        .map(|(activity, level)| engagement_level(activity, level, template))
        .collect();
    levels.sort_by(|a, b| a.level.total_cmp(&b.level));
    levels
}

fn engagement_level(
    activity: &str,
    level: f64,
    template: Option<&SuccessTemplate>,
) -> EngagementLevel {
    EngagementLevel {
        activity: activity.to_string(),
        level,
        target: template.map(|t| t.get(activity).unwrap_or(0.0)),
    }
}

pub fn correlation_tier(correlation: f64) -> CorrelationTier {
    if correlation > STRONG_CORRELATION {
        CorrelationTier::Strong
    } else if correlation > NOTABLE_CORRELATION {
        CorrelationTier::Moderate
    } else {
        CorrelationTier::Weak
    }
}

/// Correlations from weakest to strongest.
pub fn ranked_correlations(correlations: &CorrelationMap) -> Vec<RankedCorrelation> {
    let mut ranked: Vec<RankedCorrelation> = correlations
        .iter()
        .map(|(activity, correlation)| RankedCorrelation {
            activity: activity.to_string(),
            correlation,
            tier: correlation_tier(correlation),
        })
        .collect();
    ranked.sort_by(|a, b| a.correlation.total_cmp(&b.correlation));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tiers_follow_gap() {
        assert_eq!(gap_status(-0.2), GapStatus::AboveTarget);
        assert_eq!(gap_status(0.0), GapStatus::AboveTarget);
        assert_eq!(gap_status(0.05), GapStatus::Close);
        assert_eq!(gap_status(0.1), GapStatus::BelowTarget);
    }

    #[test]
    fn comparison_follows_engagement_order_and_skips_unknown() {
        let engagement: EngagementVector =
            [("url", 0.5), ("quiz", 0.2), ("wiki", 0.4)].into_iter().collect();
        let template: SuccessTemplate = [("quiz", 0.6), ("url", 0.3)].into_iter().collect();

        let rows = peer_comparison(&engagement, &template);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].activity, "url");
        assert_eq!(rows[0].status, GapStatus::AboveTarget);
        assert_eq!(rows[1].activity, "quiz");
        assert_eq!(rows[1].status, GapStatus::BelowTarget);
    }

    #[test]
    fn visible_engagement_drops_trace_levels() {
        let engagement: EngagementVector =
            [("url", 0.005), ("quiz", 0.2), ("page", 0.0)].into_iter().collect();
        let visible = visible_engagement(&engagement, None);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].activity, "quiz");
        assert_eq!(visible[0].target, None);
    }

    #[test]
    fn visible_engagement_overlays_template_targets() {
        let engagement: EngagementVector =
            [("quiz", 0.2), ("wiki", 0.4)].into_iter().collect();
        let template: SuccessTemplate = [("quiz", 0.6)].into_iter().collect();
        let visible = visible_engagement(&engagement, Some(&template));
        assert_eq!(visible[0].target, Some(0.6));
        assert_eq!(visible[1].target, Some(0.0));
    }

    #[test]
    fn idle_students_see_first_ten_activities() {
        let engagement: EngagementVector =
            (0..15).map(|i| (format!("a{i}"), 0.0)).collect();
        let visible = visible_engagement(&engagement, None);
        assert_eq!(visible.len(), 10);
        assert_eq!(visible[0].activity, "a0");
    }

    #[test]
    fn detailed_engagement_lists_everything_ascending() {
        let engagement: EngagementVector =
            [("url", 0.5), ("quiz", 0.0), ("page", 0.2), ("wiki", 0.0)].into_iter().collect();
        let template: SuccessTemplate = [("url", 0.4)].into_iter().collect();
        let levels = engagement_by_level(&engagement, Some(&template));
        let order: Vec<&str> = levels.iter().map(|l| l.activity.as_str()).collect();
        assert_eq!(order, ["quiz", "wiki", "page", "url"]);
        assert_eq!(levels[3].target, Some(0.4));
    }

    #[test]
    fn correlations_rank_ascending_with_tiers() {
        let correlations: CorrelationMap =
            [("quiz", 0.45), ("url", -0.2), ("forumng", 0.2)].into_iter().collect();
        let ranked = ranked_correlations(&correlations);
        let order: Vec<&str> = ranked.iter().map(|r| r.activity.as_str()).collect();
        assert_eq!(order, ["url", "forumng", "quiz"]);
        assert_eq!(ranked[0].tier, CorrelationTier::Weak);
        assert_eq!(ranked[1].tier, CorrelationTier::Moderate);
        assert_eq!(ranked[2].tier, CorrelationTier::Strong);
    }
}
