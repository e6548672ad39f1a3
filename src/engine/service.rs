use crate::config::EngineConfig;
use crate::engine::bayes::BayesModel;
use crate::engine::features;
use crate::engine::knn::KnnModel;
use crate::engine::svm::SvmModel;
use crate::engine::tree::DecisionTreeModel;
use crate::error::{AppError, Result};
use crate::models::{
    CustomerFeatures, LabeledCustomer, ModelFamily, OrderRecord, Recommendation,
    SegmentPrediction, SegmenterFamily,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Outcome of a training call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub message: String,

    /// Usable examples the model was fit on
    pub sample_count: usize,

    /// Incomplete examples dropped from the batch
    pub skipped: usize,
}

/// Lifecycle status of one model family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyStatus {
    pub trained: bool,
    pub sample_count: usize,
    pub trained_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl FamilyStatus {
    fn untrained() -> Self {
        Self {
            trained: false,
            sample_count: 0,
            trained_at: None,
        }
    }

    fn trained(sample_count: usize, trained_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            trained: true,
            sample_count,
            trained_at: Some(trained_at),
        }
    }
}

/// Per-family status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatusReport {
    pub tree: FamilyStatus,
    pub svm: FamilyStatus,
    pub bayes: FamilyStatus,
    pub knn: FamilyStatus,
}

/// The model registry and scoring facade.
///
/// Holds at most one trained model per family. Training builds the
/// replacement model completely off to the side and publishes it with a
/// single write-lock assignment, so a concurrent predict observes either
/// the fully-old or fully-new model, never a partial one. A failed
/// training call leaves the published model untouched.
pub struct EngineService {
    config: EngineConfig,
    tree: Arc<RwLock<Option<DecisionTreeModel>>>,
    svm: Arc<RwLock<Option<SvmModel>>>,
    bayes: Arc<RwLock<Option<BayesModel>>>,
    knn: Arc<RwLock<Option<KnnModel>>>,
}

impl EngineService {
    /// Create a registry with no trained models.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tree: Arc::new(RwLock::new(None)),
            svm: Arc::new(RwLock::new(None)),
            bayes: Arc::new(RwLock::new(None)),
            knn: Arc::new(RwLock::new(None)),
        }
    }

    /// Train a segmentation family on labeled customers, replacing its
    /// registry entry.
    pub async fn train_segmenter(
        &self,
        family: SegmenterFamily,
        customers: &[LabeledCustomer],
    ) -> Result<TrainReport> {
        let batch = features::labeled_matrix(customers)?;
        let sample_count = batch.labels.len();

        if batch.skipped > 0 {
            debug!(
                skipped = batch.skipped,
                "dropped incomplete examples from training batch"
            );
        }

        let message = match family {
            SegmenterFamily::Tree => {
                let model =
                    DecisionTreeModel::fit(&batch.features, &batch.labels, &self.config.tree)?;
                *self.tree.write().await = Some(model);
                "decision tree segmenter trained"
            }
            SegmenterFamily::Svm => {
                let model = SvmModel::fit(&batch.features, &batch.labels, &self.config.svm)?;
                *self.svm.write().await = Some(model);
                "svm segmenter trained"
            }
        };

        info!(sample_count, skipped = batch.skipped, "{message}");

        Ok(TrainReport {
            message: message.to_string(),
            sample_count,
            skipped: batch.skipped,
        })
    }

    /// Predict a customer's segment with the requested family.
    ///
    /// An untrained family answers with the neutral fallback (`regular`,
    /// confidence 0) so scoring stays available before any training.
    pub async fn predict_segment(
        &self,
        family: SegmenterFamily,
        customer: &CustomerFeatures,
    ) -> Result<SegmentPrediction> {
        features::validate(customer)?;
        let vector = features::vector_from(customer);

        let prediction = match family {
            SegmenterFamily::Tree => {
                self.tree.read().await.as_ref().map(|m| m.predict(&vector))
            }
            SegmenterFamily::Svm => {
                self.svm.read().await.as_ref().map(|m| m.predict(&vector))
            }
        };

        Ok(prediction.unwrap_or_else(|| {
            debug!("segment prediction requested before training, returning neutral fallback");
            SegmentPrediction::untrained_fallback()
        }))
    }

    /// Train the Naive Bayes next-service predictor on an order batch.
    pub async fn train_bayes(&self, orders: &[OrderRecord]) -> Result<TrainReport> {
        let model = BayesModel::fit(orders, chrono::Utc::now(), &self.config.bayes)?;
        let report = TrainReport {
            message: "naive bayes predictor trained".to_string(),
            sample_count: model.sample_count,
            skipped: model.skipped,
        };
        info!(
            sample_count = report.sample_count,
            classes = model.classes().len(),
            "naive bayes predictor trained"
        );
        *self.bayes.write().await = Some(model);
        Ok(report)
    }

    /// Train the KNN recommender on an order batch.
    pub async fn train_recommender(&self, orders: &[OrderRecord]) -> Result<TrainReport> {
        let model = KnnModel::fit(orders, chrono::Utc::now(), &self.config.knn)?;
        let report = TrainReport {
            message: "knn recommender trained".to_string(),
            sample_count: model.sample_count,
            skipped: model.skipped,
        };
        info!(
            sample_count = report.sample_count,
            stored_points = model.stored_points(),
            "knn recommender trained"
        );
        *self.knn.write().await = Some(model);
        Ok(report)
    }

    /// Most probable next service for a user, `None` before training.
    pub async fn predict_next_service(&self, history: &[OrderRecord]) -> Result<Option<String>> {
        let guard = self.bayes.read().await;
        match guard.as_ref() {
            Some(model) => Ok(Some(model.predict(history, chrono::Utc::now())?)),
            None => {
                debug!("next-service prediction requested before training");
                Ok(None)
            }
        }
    }

    /// Full service posterior for a user, empty before training.
    pub async fn service_probabilities(
        &self,
        history: &[OrderRecord],
    ) -> Result<BTreeMap<String, f64>> {
        let guard = self.bayes.read().await;
        match guard.as_ref() {
            Some(model) => model.predict_proba(history, chrono::Utc::now()),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Ranked service recommendations, empty before training or for an
    /// empty history.
    pub async fn recommend(&self, history: &[OrderRecord]) -> Result<Vec<Recommendation>> {
        let guard = self.knn.read().await;
        match guard.as_ref() {
            Some(model) => model.recommend(history, chrono::Utc::now()),
            None => {
                debug!("recommendation requested before training");
                Ok(Vec::new())
            }
        }
    }

    /// Feature importance for the families that expose it.
    pub async fn feature_importance(
        &self,
        family: ModelFamily,
    ) -> Result<BTreeMap<&'static str, f64>> {
        match family {
            ModelFamily::Tree => self
                .tree
                .read()
                .await
                .as_ref()
                .map(|m| m.feature_importance())
                .ok_or_else(|| AppError::ModelNotTrained("tree".to_string())),
            ModelFamily::Svm => self
                .svm
                .read()
                .await
                .as_ref()
                .map(|m| m.feature_importance())
                .ok_or_else(|| AppError::ModelNotTrained("svm".to_string())),
            ModelFamily::Bayes | ModelFamily::Knn => Err(AppError::Unsupported(format!(
                "feature importance is not defined for the {family} family"
            ))),
        }
    }

    /// Lifecycle status for every family.
    pub async fn status(&self) -> ModelStatusReport {
        let tree = self
            .tree
            .read()
            .await
            .as_ref()
            .map(|m| FamilyStatus::trained(m.sample_count, m.trained_at))
            .unwrap_or_else(FamilyStatus::untrained);
        let svm = self
            .svm
            .read()
            .await
            .as_ref()
            .map(|m| FamilyStatus::trained(m.sample_count, m.trained_at))
            .unwrap_or_else(FamilyStatus::untrained);
        let bayes = self
            .bayes
            .read()
            .await
            .as_ref()
            .map(|m| FamilyStatus::trained(m.sample_count, m.trained_at))
            .unwrap_or_else(FamilyStatus::untrained);
        let knn = self
            .knn
            .read()
            .await
            .as_ref()
            .map(|m| FamilyStatus::trained(m.sample_count, m.trained_at))
            .unwrap_or_else(FamilyStatus::untrained);

        ModelStatusReport {
            tree,
            svm,
            bayes,
            knn,
        }
    }
}
