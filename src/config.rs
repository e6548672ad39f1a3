use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Intelligence engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CUSTOMER_INTEL_)
            .add_source(
                config::Environment::with_prefix("CUSTOMER_INTEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

/// Hyperparameters for the classifier families. These are configuration
/// rather than constants so test suites and deployments can tune them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub tree: TreeConfig,

    #[serde(default)]
    pub bayes: BayesConfig,

    #[serde(default)]
    pub svm: SvmConfig,

    #[serde(default)]
    pub knn: KnnConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum tree depth
    #[serde(default = "default_tree_max_depth")]
    pub max_depth: usize,

    /// Minimum training examples per leaf
    #[serde(default = "default_tree_min_samples_leaf")]
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_tree_max_depth(),
            min_samples_leaf: default_tree_min_samples_leaf(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesConfig {
    /// Number of discretization bins per feature
    #[serde(default = "default_bayes_bins")]
    pub bins: usize,
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            bins: default_bayes_bins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmConfig {
    /// Training epochs for subgradient descent
    #[serde(default = "default_svm_epochs")]
    pub epochs: usize,

    /// Initial learning rate
    #[serde(default = "default_svm_learning_rate")]
    pub learning_rate: f64,

    /// Regularization parameter; larger C fits the data more closely
    #[serde(default = "default_svm_c")]
    pub c: f64,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            epochs: default_svm_epochs(),
            learning_rate: default_svm_learning_rate(),
            c: default_svm_c(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Number of neighbors consulted per recommendation
    #[serde(default = "default_knn_k")]
    pub k: usize,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: default_knn_k(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_tree_max_depth() -> usize {
    6
}

fn default_tree_min_samples_leaf() -> usize {
    1
}

fn default_bayes_bins() -> usize {
    4
}

fn default_svm_epochs() -> usize {
    300
}

fn default_svm_learning_rate() -> f64 {
    0.01
}

fn default_svm_c() -> f64 {
    1.0
}

fn default_knn_k() -> usize {
    5
}
