use std::sync::OnceLock;

use log::{debug, error, info};
use regex::Regex;

use flow_client::{ApiKey, FlowClient, FlowExecutor, FlowInput, FlowResponse};

pub mod export;
mod planner_config;
pub mod profile;
mod session;
pub mod validation;

pub use crate::export::{format_diet_plan_for_txt, write_diet_plan, ExportError, EXPORT_FILE_NAME};
pub use crate::planner_config::{FileConfig, FlowConfig, PlannerConfig};
pub use crate::profile::{DietaryPreference, Gender, Goal, Profile, ProfileForm};
pub use crate::session::PlanSession;
pub use crate::validation::{validate_input, ValidationError};

/// Field name to raw text, in the shape the diet flow expects.
pub type FieldMap = FlowInput;

/// Whatever the flow returned; `result()` holds the plan text.
pub type PlanResult = FlowResponse;

pub const FLOW_PREFIX: &str = "@mystery2000/advanced-diet-planner-/";
pub const DEFAULT_FLOW_VERSION: &str = "1.0.0";

/// A failed call to the diet flow. The transport's own error type never
/// leaves this crate; only its message does.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error getting diet plan: {message}")]
pub struct PlanRequestError {
    message: String,
}

impl PlanRequestError {
    pub fn new(message: impl Into<String>) -> PlanRequestError {
        PlanRequestError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<flow_client::Error> for PlanRequestError {
    fn from(e: flow_client::Error) -> PlanRequestError {
        PlanRequestError::new(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] PlanRequestError),
}

// ASCII digits only; `\d` would also take other scripts' digits.
const FLOW_VERSION_PATTERN: &str = r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$";

fn is_flow_version(version: &str) -> bool {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE
        .get_or_init(|| Regex::new(FLOW_VERSION_PATTERN).expect("flow version pattern is valid"))
        .is_match(version)
}

/// Fully qualified flow name for a `MAJOR.MINOR.PATCH` version.
pub fn flow_name(version: &str) -> Result<String, PlanRequestError> {
    if !is_flow_version(version) {
        return Err(PlanRequestError::new(format!(
            "invalid flow version '{}', expected MAJOR.MINOR.PATCH",
            version
        )));
    }
    Ok(format!("{}{}", FLOW_PREFIX, version))
}

/// Turns validated profile fields into a diet plan by running the remote
/// flow. The executor is injected, so nothing in here reads configuration
/// from the environment; see `from_config()` for wiring a real client.
///
/// Each call is independent: one outbound request, no retries, no caching.
pub struct PlanManager {
    executor: Box<dyn FlowExecutor>,
    version: String,
}

impl PlanManager {
    pub fn new(executor: Box<dyn FlowExecutor>) -> PlanManager {
        PlanManager {
            executor,
            version: String::from(DEFAULT_FLOW_VERSION),
        }
    }

    /// Builds a `FlowClient` from settings and the startup-loaded key.
    pub fn from_config(config: &PlannerConfig, api_key: ApiKey) -> PlanManager {
        let client = FlowClient::new(api_key, config.endpoint());
        PlanManager::new(Box::new(client)).with_version(&config.flow.version)
    }

    pub fn with_version(mut self, version: &str) -> PlanManager {
        self.version = String::from(version);
        self
    }

    /// Version used by `generate()`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Runs the diet flow at `version` with already validated fields and
    /// returns its response unchanged.
    pub async fn get_diet_plan(
        &self,
        fields: &FieldMap,
        version: &str,
    ) -> Result<PlanResult, PlanRequestError> {
        let flow = flow_name(version)?;
        debug!("Requesting diet plan from flow '{}'", flow);

        match self.executor.execute(&flow, fields).await {
            Ok(diet_plan) => {
                info!(
                    "Got diet plan from '{}' ({} bytes)",
                    flow,
                    diet_plan.result().len()
                );
                Ok(diet_plan)
            }
            Err(e) => {
                error!("Flow '{}' failed: {}", flow, e);
                Err(e.into())
            }
        }
    }

    /// Validates raw form fields, then requests a plan at the configured version.
    pub async fn generate(&self, fields: FieldMap) -> Result<PlanResult, PlannerError> {
        let validated = validate_input(fields)?;
        Ok(self.get_diet_plan(&validated, &self.version).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{DIETARY_PREFERENCE, FOOD_ALLERGY, MEDICAL_CONDITION};
    use flow_client::MockFlowExecutor;
    use mockall::predicate::{always, eq};
    use serde_json::json;

    fn example_form() -> ProfileForm {
        ProfileForm {
            age: Some(String::from("30")),
            gender: Some(String::from("Male")),
            height: Some(String::from("175")),
            weight: Some(String::from("70")),
            goal: Some(String::from("Weight Loss")),
            dietary_preference: Some(String::from("VEG")),
            food_allergies: Some(String::new()),
            medical_conditions: Some(String::new()),
        }
    }

    fn day_one() -> PlanResult {
        PlanResult::from_value(json!({ "result": "Day 1: ..." })).unwrap()
    }

    #[test]
    fn flow_name_appends_version() {
        assert_eq!(
            flow_name(DEFAULT_FLOW_VERSION).unwrap(),
            "@mystery2000/advanced-diet-planner-/1.0.0"
        );
        assert_eq!(
            flow_name("2.10.3").unwrap(),
            format!("{}2.10.3", FLOW_PREFIX)
        );
    }

    #[test]
    fn flow_name_rejects_non_semver() {
        for version in ["", "1.0", "v1.0.0", "1.0.0/../x", "01.0.0", "١.٢.٣", "1.0.٣"] {
            assert!(flow_name(version).is_err(), "version {:?}", version);
        }
    }

    #[tokio::test]
    async fn example_profile_end_to_end() {
        let expected = example_form().into_fields();
        assert_eq!(expected[FOOD_ALLERGY], "None");
        assert_eq!(expected[MEDICAL_CONDITION], "None");

        let mut executor = MockFlowExecutor::new();
        executor
            .expect_execute()
            .with(
                eq("@mystery2000/advanced-diet-planner-/1.0.0"),
                eq(expected.clone()),
            )
            .times(1)
            .returning(|_, _| Ok(day_one()));

        let manager = PlanManager::new(Box::new(executor));
        let diet_plan = manager.generate(example_form().into_fields()).await.unwrap();
        assert_eq!(diet_plan, day_one());
        assert_eq!(diet_plan.result(), "Day 1: ...");
    }

    #[test]
    fn flow_version_pattern_compiles() {
        assert!(Regex::new(FLOW_VERSION_PATTERN).is_ok());
        assert!(is_flow_version("0.10.2"));
    }

    #[tokio::test]
    async fn missing_dietary_preference_is_sent_as_default() {
        let mut form = example_form();
        form.dietary_preference = None;

        let mut executor = MockFlowExecutor::new();
        executor
            .expect_execute()
            .withf(|_, input| input.get(DIETARY_PREFERENCE).map(String::as_str) == Some("VEG"))
            .times(1)
            .returning(|_, _| Ok(day_one()));

        let manager = PlanManager::new(Box::new(executor));
        manager.generate(form.into_fields()).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_profile_never_reaches_flow() {
        let mut executor = MockFlowExecutor::new();
        executor.expect_execute().never();

        let mut form = example_form();
        form.age = Some(String::from("120"));
        let err = PlanManager::new(Box::new(executor))
            .generate(form.into_fields())
            .await
            .unwrap_err();
        match err {
            PlannerError::Validation(e) => assert_eq!(e.field(), "Age"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_failure_becomes_plan_request_error() {
        let mut executor = MockFlowExecutor::new();
        executor
            .expect_execute()
            .with(always(), always())
            .times(1)
            .returning(|_, _| Err(flow_client::Error::Communication(String::from("connection reset"))));

        let manager = PlanManager::new(Box::new(executor));
        let err = manager
            .get_diet_plan(&example_form().into_fields(), DEFAULT_FLOW_VERSION)
            .await
            .unwrap_err();
        assert!(!err.message().is_empty());
        assert!(err.message().contains("connection reset"));
        assert!(err.to_string().starts_with("Error getting diet plan: "));
    }

    #[tokio::test]
    async fn remote_rejection_becomes_plan_request_error() {
        let mut executor = MockFlowExecutor::new();
        executor.expect_execute().returning(|_, _| {
            Err(flow_client::Error::Request {
                status: 422,
                body: String::from("Gender not supported"),
            })
        });

        let err = PlanManager::new(Box::new(executor))
            .generate(example_form().into_fields())
            .await
            .unwrap_err();
        match err {
            PlannerError::Request(e) => assert!(e.message().contains("Gender not supported")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn requested_version_is_used() {
        let mut executor = MockFlowExecutor::new();
        executor
            .expect_execute()
            .with(eq("@mystery2000/advanced-diet-planner-/1.2.0"), always())
            .times(1)
            .returning(|_, _| Ok(day_one()));

        let manager = PlanManager::new(Box::new(executor)).with_version("1.2.0");
        assert_eq!(manager.version(), "1.2.0");
        manager.generate(example_form().into_fields()).await.unwrap();
    }

    #[tokio::test]
    async fn bad_version_fails_without_calling_flow() {
        let mut executor = MockFlowExecutor::new();
        executor.expect_execute().never();

        let err = PlanManager::new(Box::new(executor))
            .get_diet_plan(&example_form().into_fields(), "latest")
            .await
            .unwrap_err();
        assert!(err.message().contains("latest"));
    }

    #[test]
    fn manager_from_config_uses_configured_version() {
        let mut config = PlannerConfig::load(None).unwrap();
        config.flow.version = String::from("3.0.0");
        let manager = PlanManager::from_config(&config, ApiKey::new("k").unwrap());
        assert_eq!(manager.version(), "3.0.0");
    }
}
