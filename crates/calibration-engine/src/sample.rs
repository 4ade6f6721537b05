//! Sample Data
//!
//! Synthetic completed predictions with realistic human estimation biases,
//! used for demos and to exercise the analyzer. The random source is
//! injected so datasets are reproducible from a seed.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::record::PredictionFields;

pub const DEFAULT_SAMPLE_COUNT: usize = 12;

/// Intervals never start below this many minutes
const MIN_DURATION: f64 = 5.0;

const TASK_TEMPLATES: &[&str] = &[
    // Development
    "Fix authentication bug",
    "Implement user dashboard",
    "Code review for PR #123",
    "Write unit tests",
    "Refactor legacy component",
    "Set up CI/CD pipeline",
    "Debug performance issue",
    "Add search functionality",
    "Optimize database queries",
    "Update API documentation",
    // Design
    "Create landing page mockup",
    "Design mobile interface",
    "Prototype new feature",
    "Update brand guidelines",
    "Design email template",
    "Create icon set",
    "User research interview",
    "Wireframe checkout flow",
    // Content
    "Write blog post",
    "Create tutorial video",
    "Update help documentation",
    "Draft marketing copy",
    "Prepare presentation slides",
    "Review content strategy",
    "Write product description",
    // Meetings
    "Team standup meeting",
    "Client presentation",
    "Sprint planning session",
    "Design review meeting",
    "One-on-one with manager",
    "Product roadmap discussion",
    "Technical architecture review",
    // Other
    "Analyze user feedback",
    "Plan project timeline",
    "Research competitor features",
    "Organize team workshop",
    "Review quarterly goals",
    "Update project dependencies",
    "Backup system configuration",
];

/// Where the actual time lands relative to the predicted intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeScenario {
    /// Inside the 75% interval
    WithinInner,
    /// Outside the 75% interval but inside the 95% interval
    BetweenIntervals,
    /// Up to 50% past the 95% upper bound
    SevereOverrun,
    /// Up to 30% below the 95% lower bound
    SevereUnderrun,
}

/// Discrete distribution over outcome scenarios, sampled by cumulative walk
#[derive(Debug, Clone)]
pub struct ScenarioDistribution {
    weights: Vec<(OutcomeScenario, f64)>,
}

impl Default for ScenarioDistribution {
    fn default() -> Self {
        Self::new(vec![
            (OutcomeScenario::WithinInner, 0.60),
            (OutcomeScenario::BetweenIntervals, 0.20),
            (OutcomeScenario::SevereOverrun, 0.15),
            (OutcomeScenario::SevereUnderrun, 0.05),
        ])
    }
}

impl ScenarioDistribution {
    /// Weights are used as given and are expected to sum to 1
    pub fn new(weights: Vec<(OutcomeScenario, f64)>) -> Self {
        Self { weights }
    }

    /// Maps a uniform draw in [0, 1) onto a scenario. Falls back to the
    /// first scenario if rounding leaves `u` past the last bucket.
    pub fn pick(&self, u: f64) -> OutcomeScenario {
        let mut cumulative = 0.0;
        for &(scenario, weight) in &self.weights {
            cumulative += weight;
            if u <= cumulative {
                return scenario;
            }
        }
        self.weights
            .first()
            .map(|(s, _)| *s)
            .unwrap_or(OutcomeScenario::WithinInner)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> OutcomeScenario {
        self.pick(rng.gen::<f64>())
    }
}

/// 75% and 95% bounds in whole minutes
#[derive(Debug, Clone, Copy, PartialEq)]
struct Intervals {
    min75: f64,
    max75: f64,
    min95: f64,
    max95: f64,
}

fn generate_intervals<R: Rng + ?Sized>(rng: &mut R, base_time: f64) -> Intervals {
    let optimism_bias = rng.gen::<f64>() * 0.2 - 0.1;
    let uncertainty_factor = 0.5 + rng.gen::<f64>();

    let adjusted = base_time * (1.0 + optimism_bias);

    // People keep the 75% range narrow and skew it low
    let range75 = adjusted * 0.3 * uncertainty_factor;
    let min75 = (adjusted - range75 * 0.6).round().max(MIN_DURATION);
    let max75 = (adjusted + range75 * 0.4).round();

    // Twice as wide, still too narrow on the high side
    let range95 = adjusted * 0.6 * uncertainty_factor;
    let min95 = (adjusted - range95 * 0.7).round().max(MIN_DURATION);
    let max95 = (adjusted + range95 * 0.8).round();

    Intervals {
        min75,
        max75,
        min95,
        max95,
    }
}

fn generate_actual_time<R: Rng + ?Sized>(
    rng: &mut R,
    scenario: OutcomeScenario,
    iv: &Intervals,
) -> f64 {
    let actual = match scenario {
        OutcomeScenario::WithinInner => iv.min75 + rng.gen::<f64>() * (iv.max75 - iv.min75),
        OutcomeScenario::BetweenIntervals => {
            if rng.gen_bool(0.5) {
                iv.min75 - rng.gen::<f64>() * (iv.min75 - iv.min95)
            } else {
                iv.max75 + rng.gen::<f64>() * (iv.max95 - iv.max75)
            }
        }
        OutcomeScenario::SevereOverrun => iv.max95 + rng.gen::<f64>() * iv.max95 * 0.5,
        OutcomeScenario::SevereUnderrun => {
            (iv.min95 - rng.gen::<f64>() * iv.min95 * 0.3).max(MIN_DURATION)
        }
    };
    actual.round()
}

/// Generate `count` completed predictions relative to `now`
pub fn generate_sample_data_at<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<PredictionFields> {
    let scenarios = ScenarioDistribution::default();

    (0..count)
        .map(|i| {
            let task_name = TASK_TEMPLATES[rng.gen_range(0..TASK_TEMPLATES.len())];
            let base_time = 15.0 + rng.gen::<f64>() * 180.0;
            let intervals = generate_intervals(rng, base_time);
            let scenario = scenarios.sample(rng);
            let actual_time = generate_actual_time(rng, scenario, &intervals);
            let days_ago = rng.gen_range(0..30i64);

            PredictionFields {
                id: Some(format!("sample-{}", i + 1)),
                task_name: task_name.to_string(),
                confidence75_min: intervals.min75,
                confidence75_max: intervals.max75,
                confidence95_min: intervals.min95,
                confidence95_max: intervals.max95,
                created_at: Some(now - Duration::days(days_ago + 1)),
                completed_at: Some(now - Duration::days(days_ago)),
                actual_time: Some(actual_time),
                is_completed: true,
                ..Default::default()
            }
        })
        .collect()
}

pub fn generate_sample_data<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<PredictionFields> {
    generate_sample_data_at(rng, count, Utc::now())
}

/// Reproducible dataset: the same seed and `now` always yield the same records
pub fn generate_sample_data_seeded(
    seed: u64,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<PredictionFields> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_sample_data_at(&mut rng, count, now)
}
