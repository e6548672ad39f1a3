/// Customer intelligence engine
///
/// This module provides the scoring capabilities of the service:
/// - Customer segmentation (decision tree, linear SVM)
/// - Next-service prediction (Naive Bayes over binned order features)
/// - Service recommendations (KNN over a customer's order history)
/// - Feature extraction from customer and order records
/// - Model training with atomic registry replacement

pub mod bayes;
pub mod features;
pub mod knn;
pub mod scaling;
pub mod service;
pub mod svm;
pub mod tree;

pub use bayes::BayesModel;
pub use features::{LabeledMatrix, FEATURE_NAMES, N_FEATURES, N_ORDER_FEATURES, ORDER_FEATURE_NAMES};
pub use knn::KnnModel;
pub use scaling::FeatureScaler;
pub use service::{EngineService, FamilyStatus, ModelStatusReport, TrainReport};
pub use svm::SvmModel;
pub use tree::DecisionTreeModel;
