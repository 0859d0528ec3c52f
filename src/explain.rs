//! Turns a ranked recommendation into text a student can act on.

use std::borrow::Cow;

use tracing::debug;

use crate::archetype::Archetype;
use crate::models::Recommendation;
use crate::scoring::gap_percent;

/// Correlations at or below this magnitude are not worth mentioning.
pub const NOTABLE_CORRELATION: f64 = 0.1;
pub const STRONG_CORRELATION: f64 = 0.3;
/// Turns gap × correlation into an illustrative success-probability delta.
pub const IMPACT_SCALE: f64 = 50.0;
/// Impact estimates at or below this many points are suppressed.
pub const MIN_IMPACT: f64 = 3.0;

/// Explanation lines for one recommendation, most basic first.
///
/// Always starts with the gap line, then optionally the correlation and
/// impact lines.
pub fn explain(rec: &Recommendation, archetype: &Archetype) -> Vec<String> {
    let lines: Vec<String> = [gap_line(rec), correlation_line(rec), impact_line(rec)]
        .into_iter()
        .flatten()
        .collect();

    debug!(
        activity = %rec.activity,
        archetype = %archetype,
        lines = lines.len(),
        "explained recommendation"
    );
    lines
}

fn gap_line(rec: &Recommendation) -> Option<String> {
    Some(format!(
        "You're {:.0}% below the target for {} engagement.",
        gap_percent(rec),
        rec.activity
    ))
}

fn correlation_line(rec: &Recommendation) -> Option<String> {
    let magnitude = rec.correlation.abs();
    (magnitude > NOTABLE_CORRELATION).then(|| {
        let strength = if magnitude > STRONG_CORRELATION {
            "strongly"
        } else {
            "moderately"
        };
        let direction = if rec.correlation > 0.0 {
            "positively"
        } else {
            "negatively"
        };
        format!(
            "This activity is {strength} {direction} correlated with course success (r={:.2}).",
            rec.correlation
        )
    })
}

fn impact_line(rec: &Recommendation) -> Option<String> {
    if rec.correlation > NOTABLE_CORRELATION {
        let impact = rec.gap * rec.correlation * IMPACT_SCALE;
        (impact > MIN_IMPACT).then(|| {
            format!("Improving this could increase your success probability by ~{impact:.0}%.")
        })
    } else {
        None
    }
}

/// Concrete next step for an activity type.
pub fn action_text(activity: &str) -> Cow<'static, str> {
    let action = match activity {
        "quiz" => "Complete more practice quizzes to test your understanding.",
        "forumng" => "Participate in discussion forums - ask questions and help others.",
        "oucontent" => "Spend more time reading course materials and taking notes.",
        "resource" => "Download and review additional learning resources.",
        "subpage" => "Explore more course subpages for supplementary content.",
        "homepage" => "Check the course homepage regularly for updates.",
        "url" => "Visit external resources linked in the course.",
        "ouwiki" => "Contribute to or read the course wiki.",
        "oucollaborate" => "Join collaborative sessions with peers.",
        "ouelluminate" => "Attend live online sessions.",
        "glossary" => "Review the course glossary for key terms.",
        "dataplus" => "Explore data visualizations and interactive content.",
        "questionnaire" => "Complete course questionnaires for feedback.",
        "page" => "Read additional course pages.",
        "folder" => "Browse course folders for materials.",
        "externalquiz" => "Take external quizzes for extra practice.",
        "htmlactivity" => "Engage with interactive HTML activities.",
        "dualpane" => "Use the dual-pane view for content comparison.",
        "repeatactivity" => "Revisit and repeat key activities.",
        "sharedsubpage" => "Collaborate on shared subpages.",
        other => return Cow::Owned(format!("Increase your engagement with {other}.")),
    };
    Cow::Borrowed(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::priority_score;

    fn rec(current: f64, target: f64, correlation: f64) -> Recommendation {
        let gap = target - current;
        Recommendation {
            activity: "quiz".to_string(),
            current,
            target,
            gap,
            correlation,
            priority_score: priority_score(gap, correlation),
        }
    }

    #[test]
    fn strong_positive_correlation_emits_all_three_lines() {
        let lines = explain(&rec(0.2, 0.8, 0.4), &Archetype::EarlyStruggler);
        assert_eq!(
            lines,
            [
                "You're 75% below the target for quiz engagement.",
                "This activity is strongly positively correlated with course success (r=0.40).",
                "Improving this could increase your success probability by ~12%.",
            ]
        );
    }

    #[test]
    fn weak_correlation_only_explains_the_gap() {
        let lines = explain(&rec(0.2, 0.8, 0.05), &Archetype::HighPerformer);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn correlation_exactly_at_threshold_is_silent() {
        let lines = explain(&rec(0.2, 0.8, 0.1), &Archetype::HighPerformer);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn negative_correlation_has_no_impact_line() {
        let lines = explain(&rec(0.0, 0.9, -0.2), &Archetype::ModeratePerformer);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "This activity is moderately negatively correlated with course success (r=-0.20)."
        );
    }

    #[test]
    fn small_impact_is_suppressed() {
        // 0.2 * 0.2 * 50 = 2 points
        let lines = explain(&rec(0.3, 0.5, 0.2), &Archetype::ModeratePerformer);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("moderately positively"));
    }

    #[test]
    fn zero_target_uses_floor() {
        let mut zero = rec(0.0, 0.0, 0.0);
        zero.gap = 0.06;
        let lines = explain(&zero, &Archetype::Other("Night Owl".to_string()));
        assert_eq!(lines[0], "You're 600% below the target for quiz engagement.");
    }

    #[test]
    fn strength_boundary_reads_moderately() {
        let lines = explain(&rec(0.0, 0.9, 0.3), &Archetype::HighPerformer);
        assert_eq!(
            lines[1],
            "This activity is moderately positively correlated with course success (r=0.30)."
        );
    }

    #[test]
    fn strong_negative_correlation_is_labelled() {
        let lines = explain(&rec(0.0, 0.9, -0.45), &Archetype::EarlyStruggler);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "This activity is strongly negatively correlated with course success (r=-0.45)."
        );
    }

    #[test]
    fn nan_correlation_only_explains_the_gap() {
        let lines = explain(&rec(0.2, 0.8, f64::NAN), &Archetype::HighPerformer);
        assert_eq!(lines, ["You're 75% below the target for quiz engagement."]);
    }

    #[test]
    fn known_activities_have_fixed_actions() {
        assert_eq!(
            action_text("quiz"),
            "Complete more practice quizzes to test your understanding."
        );
        assert_eq!(action_text("ouelluminate"), "Attend live online sessions.");
    }

    #[test]
    fn unknown_activity_falls_back_to_generic_sentence() {
        assert_eq!(
            action_text("unknown_code"),
            "Increase your engagement with unknown_code."
        );
    }
}
