//! Plain-text rendering of a calibration report.

use std::fmt::Write;

use calibration_engine::{CalibrationReport, EstimateTendency, EstimationOverview};

pub fn render_text(report: &CalibrationReport, overview: Option<&EstimationOverview>) -> String {
    let mut out = String::new();
    write_report(&mut out, report, overview).expect("writing to String");
    out
}

fn write_report(
    out: &mut String,
    report: &CalibrationReport,
    overview: Option<&EstimationOverview>,
) -> std::fmt::Result {
    let summary = &report.summary;

    writeln!(out, "=== CALIBRATION ANALYSIS REPORT ===")?;
    writeln!(out)?;
    writeln!(out, "SUMMARY:")?;
    writeln!(out, "- Total Predictions: {}", summary.total_predictions)?;
    writeln!(out, "- 75% Accuracy: {:.1}%", summary.accuracy75)?;
    writeln!(out, "- 95% Accuracy: {:.1}%", summary.accuracy95)?;
    writeln!(out, "- Calibration Quality: {}", summary.calibration_quality.as_str())?;
    writeln!(out, "- Primary Issue: {}", summary.primary_issue.as_str())?;

    if let Some(overview) = overview {
        let tendency = match overview.most_common_bias {
            EstimateTendency::Overestimation => "Overestimation",
            EstimateTendency::Underestimation => "Underestimation",
        };
        writeln!(out, "- Average Accuracy: {:.0}%", overview.average_accuracy)?;
        writeln!(out, "- Total Time Spent: {}", format_minutes(overview.total_time_spent))?;
        writeln!(out, "- Most Common Bias: {}", tendency)?;
    }
    writeln!(out)?;

    let scores = &report.scores;
    let or_na = |s: &Option<String>| s.clone().unwrap_or_else(|| "n/a".to_string());
    writeln!(out, "SCIENTIFIC SCORES:")?;
    writeln!(out, "- Brier Score: {} (lower = better)", or_na(&scores.brier_score))?;
    writeln!(out, "- Interval Score (75%): {}", or_na(&scores.interval_score75))?;
    writeln!(out, "- Interval Score (95%): {}", or_na(&scores.interval_score95))?;
    writeln!(out)?;

    writeln!(out, "CALIBRATION CURVE:")?;
    for (level, point) in report.calibration.curve.points() {
        writeln!(
            out,
            "- {}: Predicted {:.0}%, Actual {:.1}%, Error {:.1}%",
            level,
            point.predicted * 100.0,
            point.observed * 100.0,
            point.calibration_error * 100.0
        )?;
    }
    writeln!(out)?;

    let overconfidence = &report.calibration.overconfidence;
    writeln!(out, "OVERCONFIDENCE ANALYSIS:")?;
    writeln!(out, "- Interpretation: {}", overconfidence.interpretation)?;
    writeln!(out, "- Overconfidence Score: {:.3}", overconfidence.overconfidence_score)?;
    writeln!(out, "- Severity: {:.3}", overconfidence.severity)?;
    writeln!(out)?;

    if let Some(bias) = &report.time_estimation {
        writeln!(out, "TIME ESTIMATION BIAS:")?;
        writeln!(out, "- Mean Percentage Error: {:.1}%", bias.mean_percentage_error)?;
        writeln!(out, "- Underestimation Rate: {:.1}%", bias.underestimation_rate * 100.0)?;
        writeln!(out, "- Bias Type: {}", bias.bias.as_str())?;
        writeln!(out, "- Planning Fallacy Present: {}", bias.planning_fallacy_present)?;
        writeln!(out)?;
    }

    if let Some(murphy) = &report.calibration.murphy_decomposition {
        writeln!(out, "MURPHY'S DECOMPOSITION:")?;
        writeln!(out, "- Reliability: {:.4}", murphy.reliability)?;
        writeln!(out, "- Resolution: {:.4}", murphy.resolution)?;
        writeln!(out, "- Uncertainty: {:.4}", murphy.uncertainty)?;
        writeln!(out, "- Skill Score: {:.4}", murphy.skill)?;
        writeln!(out)?;
    }

    writeln!(out, "RECOMMENDATIONS:")?;
    for (i, rec) in report.recommendations.iter().enumerate() {
        writeln!(out, "{}. [{}] {}", i + 1, rec.priority.as_str(), rec.issue)?;
        writeln!(out, "   {}", rec.recommendation)?;
    }
    writeln!(out)?;

    writeln!(out, "INSIGHTS:")?;
    for insight in report.actionable_insights() {
        writeln!(
            out,
            "- [{}] {}: {:.0}% (target {:.0}%)",
            insight.kind.as_str(),
            insight.title,
            insight.percentage,
            insight.target
        )?;
        writeln!(out, "  {} - {}", insight.description, insight.action)?;
    }

    Ok(())
}

fn format_minutes(minutes: f64) -> String {
    let total = minutes.round() as i64;
    let (hours, mins) = (total / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calibration_engine::{CalibrationAnalyzer, PredictionFields};

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45.0), "45m");
        assert_eq!(format_minutes(125.0), "2h 5m");
        assert_eq!(format_minutes(60.0), "1h 0m");
    }

    #[test]
    fn test_render_sections() {
        let mut analyzer = CalibrationAnalyzer::new();
        for actual in [30.0, 35.0, 50.0, 70.0, 25.0] {
            analyzer.add_prediction(PredictionFields::new(20.0, 40.0, 15.0, 60.0), actual);
        }

        let report = analyzer.generate_calibration_report().unwrap();
        let overview = analyzer.calculate_estimation_overview();
        let text = render_text(&report, overview.as_ref());

        assert!(text.contains("- Total Predictions: 5"));
        assert!(text.contains("- 75% Accuracy: 60.0%"));
        assert!(text.contains("- 95% Accuracy: 80.0%"));
        assert!(text.contains("- 75%: Predicted 75%, Actual 60.0%, Error 15.0%"));
        assert!(text.contains("MURPHY'S DECOMPOSITION:"));
        assert!(text.contains("- Total Time Spent: 3h 30m"));
        assert!(text.contains("RECOMMENDATIONS:"));
        assert!(text.contains("INSIGHTS:"));
    }
}
