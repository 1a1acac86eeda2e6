#![doc = include_str!("../README.md")]

pub mod artifacts;
pub mod baselines;
pub mod ground_truth;
pub mod harness;
pub mod lexical;
pub mod metrics;
pub mod recommender;

pub use artifacts::{
    GroundTruth, GroundTruthEntry, PredictionEntry, PredictionSet, RelevanceSet, TestProfile,
};
pub use baselines::{LexicalRecommender, RandomRecommender, RecencyRecommender};
pub use ground_truth::{CategoryRules, GroundTruthBuilder};
pub use harness::{
    ProfileFailure, RunSummary, calculate_metrics, compare_models, evaluate_files,
    format_comparison_table, generate_labels, label_file, predict_to_file, run_predictions,
    standard_lineup,
};
pub use lexical::{DEFAULT_MAX_FEATURES, TfIdfVectorizer};
pub use metrics::{EvaluationReport, MetricMeans, MetricSample, MetricSummary, evaluate};
pub use recommender::{ContentBasedRecommender, Recommender, RecommenderKind};
