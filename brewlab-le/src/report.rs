//! Human-readable output
//!
//! Advice and explanations derived from a verdict, and plain-text
//! renderings used by the CLI.

use crate::catalog;
use crate::diagnosis::{Attribute, ExtractionState, ExtractionVerdict, SensoryScores};
use crate::learning::{LearningAdjustment, LearningStatus};
use crate::pressure::Compatibility;
use crate::recipe::Recipe;
use crate::stats::AdminStats;
use serde::Serialize;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// What to change on the next brew
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentAdvice {
    pub state: ExtractionState,
    /// Only set for `balanced`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<&'static str>,
    pub confidence_display: String,
}

impl AdjustmentAdvice {
    pub fn for_verdict(verdict: &ExtractionVerdict) -> Self {
        let (summary, grind, time) = match verdict.state {
            ExtractionState::Balanced => (
                Some("Your extraction appears balanced. No changes recommended."),
                None,
                None,
            ),
            ExtractionState::Under => (
                None,
                Some("Go 1–2 clicks finer."),
                Some("Increase brew time slightly (≈ +3 seconds)."),
            ),
            ExtractionState::Over => (
                None,
                Some("Go 1–2 clicks coarser."),
                Some("Reduce brew time slightly (≈ −3 seconds)."),
            ),
        };
        Self {
            state: verdict.state,
            summary,
            grind,
            time,
            confidence_display: verdict.confidence_display(),
        }
    }
}

/// Qualitative band of a single rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingLabel {
    Low,
    Acceptable,
    Good,
    Excellent,
}

impl RatingLabel {
    pub fn for_value(value: f64) -> Self {
        if value < 4.0 {
            RatingLabel::Low
        } else if value > 7.0 {
            RatingLabel::Excellent
        } else if value < 5.5 {
            RatingLabel::Acceptable
        } else {
            RatingLabel::Good
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RatingLabel::Low => "✗",
            RatingLabel::Acceptable => "~",
            RatingLabel::Good | RatingLabel::Excellent => "✓",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLabel::Low => "low",
            RatingLabel::Acceptable => "acceptable",
            RatingLabel::Good => "good",
            RatingLabel::Excellent => "excellent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRating {
    pub attribute: Attribute,
    pub value: f64,
    pub label: RatingLabel,
}

/// Why the cup tasted the way it did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionExplanation {
    pub ratings: Vec<ScoreRating>,
    pub headline: &'static str,
    pub explanation: &'static str,
    pub causes_heading: &'static str,
    pub causes: &'static [&'static str],
    pub confidence_display: String,
}

impl ExtractionExplanation {
    pub fn new(scores: &SensoryScores, verdict: &ExtractionVerdict) -> Self {
        let ratings = scores
            .present()
            .map(|(attribute, value)| ScoreRating {
                attribute,
                value,
                label: RatingLabel::for_value(value),
            })
            .collect();

        let (headline, explanation, causes_heading, causes): (_, _, _, &'static [&'static str]) =
            match verdict.state {
                ExtractionState::Under => (
                    "UNDER-EXTRACTED",
                    "Coffee didn't spend enough time with water. Not enough flavor compounds dissolved.",
                    "Why this happened:",
                    &[
                        "Grind too coarse (water flowed too fast)",
                        "OR brew time too short",
                        "OR water temperature too low",
                    ],
                ),
                ExtractionState::Over => (
                    "OVER-EXTRACTED",
                    "Coffee spent too much time with water. Extracted bitter, astringent compounds.",
                    "Why this happened:",
                    &[
                        "Grind too fine (water couldn't flow)",
                        "OR brew time too long",
                        "OR water temperature too high",
                    ],
                ),
                ExtractionState::Balanced => (
                    "BALANCED",
                    "Your extraction is in the sweet spot! Good balance of flavors.",
                    "Keep doing what you're doing:",
                    &[
                        "Grind size is appropriate",
                        "Brew time is correct",
                        "Temperature is suitable",
                    ],
                ),
            };

        Self {
            ratings,
            headline,
            explanation,
            causes_heading,
            causes,
            confidence_display: verdict.confidence_display(),
        }
    }

    /// Ratings below the acceptable band
    pub fn issues(&self) -> impl Iterator<Item = &ScoreRating> {
        self.ratings.iter().filter(|r| r.label == RatingLabel::Low)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plain-text renderer for CLI output
pub struct TextFormatter;

impl TextFormatter {
    pub fn format_recipe(recipe: &Recipe) -> String {
        let mut output = String::new();
        output.push_str("Your Initial Recipe\n");
        output.push_str(&format!("{}\n", RULE));

        if let Some(rec) = &recipe.recommendation {
            output.push_str(&format!("Dose:  {}\n", rec.dose));
            output.push_str(&format!("Yield: {}\n", rec.yield_));
            output.push_str(&format!("Time:  {}\n", rec.time));
            output.push_str(&format!("Grind: {}\n", rec.grind));
        }
        if let Some(grind) = recipe.base_grind {
            output.push_str(&format!("Grinder Setting: {}\n", grind));
        }
        if let Some(adj) = recipe.adjustment.as_ref().filter(|a| a.applied) {
            output.push_str("\nPersonalized Adjustments\n");
            output.push_str(&format!("  Learned Grind: {:.1}\n", adj.grind));
            output.push_str(&format!("  Learned Time:  {}s\n", adj.time));
            output.push_str(&format!("  Based on {} previous brews\n", adj.samples));
        }

        output.push_str("\nWhy This Recipe?\n");
        output.push_str(&format!("Brew Method: {}\n", recipe.method.to_uppercase()));
        output.push_str(&format!("{}\n", catalog::method_explanation(&recipe.method)));
        if let Some(grind) = recipe.base_grind {
            output.push_str(&format!(
                "Your Grinder: {}\n",
                recipe.grinder.replace('-', " ").to_uppercase()
            ));
            output.push_str(&format!(
                "Setting {} is our baseline for this method with your grinder.\n",
                grind
            ));
        }
        output
    }

    pub fn format_explanation(explanation: &ExtractionExplanation) -> String {
        let mut output = String::new();
        output.push_str("EXTRACTION ANALYSIS\n");
        output.push_str(&format!("{}\n", RULE));
        output.push_str("Your Ratings Summary:\n");
        for r in &explanation.ratings {
            output.push_str(&format!(
                "  {} {}: {}/10 ({})\n",
                r.label.symbol(),
                capitalize(r.attribute.name()),
                r.value,
                r.label.as_str()
            ));
        }

        let issues: Vec<String> = explanation
            .issues()
            .map(|r| format!("{}: {}/10 (low)", r.attribute.name(), r.value))
            .collect();
        if !issues.is_empty() {
            output.push_str(&format!("Key Issues: {}\n", issues.join(", ")));
        }

        output.push_str(&format!("\nDiagnosis: {}\n", explanation.headline));
        output.push_str(&format!("{}\n", explanation.explanation));
        output.push_str(&format!("\n{}\n", explanation.causes_heading));
        for cause in explanation.causes {
            output.push_str(&format!("  - {}\n", cause));
        }
        output.push_str(&format!(
            "\nConfidence: {} (higher = more certain)\n",
            explanation.confidence_display
        ));
        output
    }

    pub fn format_advice(advice: &AdjustmentAdvice) -> String {
        let mut output = String::new();
        output.push_str("Adjustment for Next Brew\n");
        if let Some(summary) = advice.summary {
            output.push_str(&format!("{}\n", summary));
            return output;
        }
        output.push_str(&format!("Diagnosis: {} extraction\n", advice.state));
        if let Some(grind) = advice.grind {
            output.push_str(&format!("Grind Adjustment: {}\n", grind));
        }
        if let Some(time) = advice.time {
            output.push_str(&format!("Time Adjustment: {}\n", time));
        }
        output.push_str(&format!("Confidence: {}\n", advice.confidence_display));
        output
    }

    /// Learning layer after a feedback submission
    pub fn format_learning_result(
        adjustment: &LearningAdjustment,
        base_grind: i32,
        base_time_secs: u32,
    ) -> String {
        let mut output = String::new();
        output.push_str("Personalized Learning Layer\n");
        output.push_str(&format!("Status: {}\n", adjustment.reason));
        output.push_str(&format!("Base Grind: {}\n", base_grind));
        output.push_str(&format!("Base Time: {}s\n", base_time_secs));
        if adjustment.applied {
            output.push_str(&format!("Learned Grind: {:.1}\n", adjustment.grind));
            output.push_str(&format!("Learned Time: {}s\n", adjustment.time));
        } else {
            output.push_str(&format!(
                "Learning not yet applied (need {} more brews)\n",
                adjustment.samples_needed
            ));
        }
        output
    }

    pub fn format_status(status: &LearningStatus) -> String {
        let mut output = String::new();
        output.push_str("LEARNING STATUS\n");
        output.push_str(&format!("{}\n", progress_bar(status.progress_percent)));
        output.push_str(&format!("Brews with this setup: {}\n", status.samples));
        output.push_str(&format!("Status: {}\n", status.status_text));
        if !status.insights.is_empty() {
            output.push_str("What we've learned about YOUR setup:\n");
            for insight in &status.insights {
                output.push_str(&format!("  - {}\n", insight));
            }
        }
        output
    }

    pub fn format_admin_stats(stats: &AdminStats) -> String {
        let mut output = String::new();
        output.push_str("Research Statistics\n");
        output.push_str(&format!("{}\n", RULE));
        output.push_str(&format!("Total brews:            {}\n", stats.total_brews));
        output.push_str(&format!("Research entries:       {}\n", stats.total_research_entries));
        output.push_str(&format!("Unique weeks:           {}\n", stats.unique_users));
        output.push_str(&format!("Learning models:        {}\n", stats.total_learning_models));
        output.push_str(&format!("Learning samples:       {}\n", stats.total_samples));

        output.push_str("\nExtraction states:\n");
        for (state, count) in &stats.extraction_states {
            output.push_str(&format!("  {:<12} {}\n", state, count));
        }
        output.push_str("\nBrew methods:\n");
        for (method, count) in stats.methods_ranked() {
            output.push_str(&format!("  {:<16} {}\n", method, count));
        }
        output.push_str("\nTop origins:\n");
        for (origin, count) in stats.top_origins() {
            output.push_str(&format!("  {:<16} {}\n", origin, count));
        }
        output
    }

    pub fn format_compatibility(machine: &str, profile: &str, result: &Compatibility) -> String {
        let mut output = format!("{} + {}: ", machine, profile);
        if result.compatible {
            output.push_str("[✓] compatible");
        } else {
            output.push_str("[✗] not compatible");
        }
        if let Some(reason) = &result.reason {
            output.push_str(&format!("\n  Reason: {}", reason));
        }
        if let Some(warning) = &result.warning {
            output.push_str(&format!("\n  [⚠] {}", warning));
        }
        output.push('\n');
        output
    }
}

fn progress_bar(percent: f64) -> String {
    const WIDTH: usize = 20;
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:.0}%",
        "█".repeat(filled),
        "░".repeat(WIDTH - filled),
        percent
    )
}
