use thiserror::Error;

use crate::aws::Credentials;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub aws: AwsConfig,
    pub backend: StoreBackend,
    pub bucket: BucketConfig,
    /// Path to the catalog descriptor file, relative to the working directory
    pub catalog_file: String,
    pub policies: StagePolicies,
    pub tables: TableNames,
    pub waits: WaitConfig,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub credentials: Credentials,
}

/// Which store implementations the workflow runs against.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Real DynamoDB and S3 over their REST APIs.
    Aws,
    /// In-memory stores for a dry run. Image fetches still go out over HTTP.
    Memory,
}

#[derive(Debug, Clone)]
pub struct BucketConfig {
    /// Fixed base name shared by every run
    pub base_name: String,
    /// Per-run token appended to the base name. Bucket names are global in
    /// S3, so an unsuffixed fixed name collides across accounts.
    pub suffix: String,
}

impl BucketConfig {
    pub fn name(&self) -> String {
        format!("{}-{}", self.base_name, self.suffix)
    }
}

#[derive(Debug, Clone)]
pub struct TableNames {
    pub login: String,
    pub music: String,
    pub subscriptions: String,
    /// Provisioned read capacity units for every table and index
    pub read_units: u64,
    /// Provisioned write capacity units for every table and index
    pub write_units: u64,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            login: "login".to_string(),
            music: "music".to_string(),
            subscriptions: "subscriptions".to_string(),
            read_units: 5,
            write_units: 5,
        }
    }
}

/// What the orchestrator does when a stage (or a resource within a
/// best-effort stage) fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Propagate the error and terminate the workflow.
    Abort,
    /// Log the error and move on.
    Continue,
}

/// One explicit policy per stage instead of ad hoc per-call catches.
#[derive(Debug, Clone)]
pub struct StagePolicies {
    pub accounts: FailurePolicy,
    pub bucket: FailurePolicy,
    pub catalog: FailurePolicy,
    pub schema: FailurePolicy,
    pub teardown: FailurePolicy,
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self {
            accounts: FailurePolicy::Abort,
            bucket: FailurePolicy::Abort,
            catalog: FailurePolicy::Abort,
            schema: FailurePolicy::Abort,
            teardown: FailurePolicy::Continue,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay before the single retry after a delete-in-progress conflict
    pub conflict_retry_ms: u64,
    /// Initial delay between table status polls
    pub poll_initial_ms: u64,
    /// Ceiling for the backoff between polls
    pub poll_max_ms: u64,
    /// Polls before a wait gives up with a timeout error
    pub poll_max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            conflict_retry_ms: 5000,
            poll_initial_ms: 500,
            poll_max_ms: 8000,
            poll_max_attempts: 40,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let credentials = Credentials {
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        };

        let backend = match std::env::var("BACKEND")
            .unwrap_or_else(|_| "aws".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Aws,
        };

        let base_name =
            std::env::var("BUCKET_NAME").unwrap_or_else(|_| "music-app-images".to_string());
        let suffix = std::env::var("BUCKET_SUFFIX").unwrap_or_else(|_| run_token());

        let catalog_file =
            std::env::var("CATALOG_FILE").unwrap_or_else(|_| "catalog.json".to_string());

        let config = Config {
            aws: AwsConfig {
                region,
                credentials,
            },
            backend,
            bucket: BucketConfig { base_name, suffix },
            catalog_file,
            policies: StagePolicies::default(),
            tables: TableNames::default(),
            waits: WaitConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.backend, StoreBackend::Aws) {
            if self.aws.credentials.access_key_id.is_empty()
                || self.aws.credentials.secret_access_key.is_empty()
            {
                return Err(ConfigError::ValidationError(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required when BACKEND=aws"
                        .to_string(),
                ));
            }
        }

        let bucket = self.bucket.name();
        if bucket.len() < 3 || bucket.len() > 63 {
            return Err(ConfigError::ValidationError(format!(
                "Bucket name '{bucket}' must be 3-63 characters"
            )));
        }
        if !bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::ValidationError(format!(
                "Bucket name '{bucket}' may only contain lowercase letters, digits, and hyphens"
            )));
        }

        if self.catalog_file.is_empty() {
            return Err(ConfigError::ValidationError(
                "CATALOG_FILE cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Short per-run token for the bucket suffix.
fn run_token() -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.truncate(8);
    token
}
