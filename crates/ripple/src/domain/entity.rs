//! Tracked artifacts and their kind-specific payloads.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of an entity title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Unique identifier for an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create a new entity ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of tracked artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Project-level requirement
    ProjectRequirement,

    /// Product feature
    Feature,

    /// Reported defect
    Bug,

    /// A change set touching code
    CodeChange,

    /// Test case
    Test,

    /// Outcome of one test execution
    TestResult,

    /// Feedback from a user or stakeholder
    UserFeedback,

    /// Documentation artifact
    Document,

    /// Source file
    CodeFile,

    /// Coverage mapping of a test file
    TestCoverage,
}

impl EntityKind {
    /// Every entity kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::ProjectRequirement,
        Self::Feature,
        Self::Bug,
        Self::CodeChange,
        Self::Test,
        Self::TestResult,
        Self::UserFeedback,
        Self::Document,
        Self::CodeFile,
        Self::TestCoverage,
    ];

    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectRequirement => "project_requirement",
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::CodeChange => "code_change",
            Self::Test => "test",
            Self::TestResult => "test_result",
            Self::UserFeedback => "user_feedback",
            Self::Document => "document",
            Self::CodeFile => "code_file",
            Self::TestCoverage => "test_coverage",
        }
    }

    /// Prefix used for generated IDs of this kind.
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::ProjectRequirement => "req",
            Self::Feature => "feat",
            Self::Bug => "bug",
            Self::CodeChange => "chg",
            Self::Test => "test",
            Self::TestResult => "run",
            Self::UserFeedback => "fb",
            Self::Document => "doc",
            Self::CodeFile => "file",
            Self::TestCoverage => "cov",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let kind = match normalized.as_str() {
            "project_requirement" | "requirement" => Self::ProjectRequirement,
            "feature" => Self::Feature,
            "bug" => Self::Bug,
            "code_change" => Self::CodeChange,
            "test" => Self::Test,
            "test_result" => Self::TestResult,
            "user_feedback" | "feedback" => Self::UserFeedback,
            "document" | "document_entity" => Self::Document,
            "code_file" | "code_file_entity" => Self::CodeFile,
            "test_coverage" => Self::TestCoverage,
            _ => {
                return Err(Error::Validation(format!(
                    "unrecognized entity kind '{s}'"
                )));
            }
        };
        Ok(kind)
    }
}

/// Priority of a requirement, bug or feedback item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low priority
    Low,
    /// Medium priority
    Medium,
    /// High priority
    High,
    /// Critical priority
    Critical,
}

/// Workflow status of a tracked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not started
    Open,
    /// Being worked on
    InProgress,
    /// Under test
    Testing,
    /// Finished
    Done,
    /// Waiting on something else
    Blocked,
    /// Abandoned
    Cancelled,
}

/// Bug severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic
    Trivial,
    /// Minor inconvenience
    Minor,
    /// Broken functionality with a workaround
    Major,
    /// Broken functionality without a workaround
    Critical,
    /// Stops a release
    Blocker,
}

impl Severity {
    /// Base impact points, from 1 for trivial to 8 for blocker.
    #[must_use]
    pub fn impact_points(self) -> u32 {
        match self {
            Self::Trivial => 1,
            Self::Minor => 2,
            Self::Major => 4,
            Self::Critical => 6,
            Self::Blocker => 8,
        }
    }

    /// Wire name of the severity.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trivial => "trivial",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
            Self::Blocker => "blocker",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nature of a code change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Adds a feature
    NewFeature,
    /// Improves an existing feature
    Enhancement,
    /// Fixes a bug
    BugFix,
    /// Restructures code without changing behavior
    Refactor,
    /// Performance work
    Performance,
    /// Security work
    Security,
}

/// Category of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Unit test
    Unit,
    /// Integration test
    Integration,
    /// End-to-end test
    E2e,
    /// Performance test
    Performance,
    /// Security test
    Security,
    /// Regression test
    Regression,
}

/// Outcome of a test execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
    /// Test could not run
    Error,
}

/// Category of user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// Report of a defect
    BugReport,
    /// Request for new functionality
    FeatureRequest,
    /// Suggested improvement
    Improvement,
    /// Question
    Question,
    /// Praise
    Compliment,
}

/// Payload of a project requirement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequirementPayload {
    /// Owning project
    pub project_name: Option<String>,
    /// Priority
    pub priority: Option<Priority>,
    /// Status
    pub status: Option<Status>,
}

/// Payload of a feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeaturePayload {
    /// Module the feature lives in
    pub module: Option<String>,
    /// Status
    pub status: Option<Status>,
    /// Files implementing the feature
    pub file_paths: Vec<String>,
}

/// Payload of a bug
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BugPayload {
    /// Severity
    pub severity: Option<Severity>,
    /// Priority
    pub priority: Option<Priority>,
    /// Status
    pub status: Option<Status>,
}

/// Payload of a code change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeChangePayload {
    /// Nature of the change
    pub change_type: Option<ChangeType>,
    /// Files touched
    pub file_paths: Vec<String>,
    /// Lines added
    pub lines_added: u32,
    /// Lines removed
    pub lines_removed: u32,
    /// Whether the change breaks a public contract
    pub breaking: bool,
}

/// Payload of a test case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestPayload {
    /// Category
    pub test_type: Option<TestType>,
    /// File containing the test
    pub file_path: Option<String>,
    /// Typical execution time in seconds
    pub execution_secs: Option<f64>,
    /// Share of the target's code the test exercises, in percent
    pub coverage_percent: Option<f64>,
}

impl TestPayload {
    /// Coverage above which any test counts as critical.
    pub const CRITICAL_COVERAGE_PERCENT: f64 = 80.0;

    /// Integration, end-to-end and security tests are critical, as is any
    /// test covering more than 80 percent.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(
            self.test_type,
            Some(TestType::Integration | TestType::E2e | TestType::Security)
        ) || self
            .coverage_percent
            .is_some_and(|pct| pct > Self::CRITICAL_COVERAGE_PERCENT)
    }
}

/// Payload of a test result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestResultPayload {
    /// The test that produced this result
    pub test_id: Option<EntityId>,
    /// Outcome
    pub outcome: Option<TestOutcome>,
    /// Execution time in seconds
    pub execution_secs: Option<f64>,
}

/// Payload of a user feedback item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackPayload {
    /// Category
    pub feedback_type: Option<FeedbackType>,
    /// Priority
    pub priority: Option<Priority>,
}

/// How often a document is expected to be refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFrequency {
    /// Whenever the documented artifact changes
    #[default]
    OnChange,
    /// Weekly
    Weekly,
    /// Monthly
    Monthly,
}

/// Urgency of refreshing a stale document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePriority {
    /// Refresh when convenient
    Medium,
    /// Refresh with the change
    High,
}

impl fmt::Display for UpdatePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Payload of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentPayload {
    /// Location of the document
    pub file_path: Option<String>,
    /// Free-form type, e.g. `README` or `API_DOC`
    pub document_type: Option<String>,
    /// Expected refresh cadence; `on_change` when absent
    pub update_frequency: Option<UpdateFrequency>,
}

impl DocumentPayload {
    /// Highest staleness score.
    pub const MAX_STALENESS: f64 = 10.0;

    /// Staleness in `[0, 10]` for a document `days` behind the change.
    ///
    /// One point per week for `on_change` and `weekly` documents, one per
    /// thirty days for `monthly` ones.
    #[must_use]
    pub fn staleness(&self, days: i64) -> f64 {
        let period = match self.update_frequency.unwrap_or_default() {
            UpdateFrequency::OnChange | UpdateFrequency::Weekly => 7.0,
            UpdateFrequency::Monthly => 30.0,
        };
        #[allow(clippy::cast_precision_loss)]
        let days = days.max(0) as f64;
        (days / period).min(Self::MAX_STALENESS)
    }

    /// Documents kept in step with every change are high priority.
    #[must_use]
    pub fn update_priority(&self) -> UpdatePriority {
        match self.update_frequency.unwrap_or_default() {
            UpdateFrequency::OnChange => UpdatePriority::High,
            UpdateFrequency::Weekly | UpdateFrequency::Monthly => UpdatePriority::Medium,
        }
    }
}

/// Payload of a source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeFilePayload {
    /// Location of the file
    pub file_path: Option<String>,
    /// Implementation language
    pub language: Option<String>,
    /// Size in lines
    pub lines_of_code: Option<u32>,
}

/// Payload of a coverage mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoveragePayload {
    /// Test file the mapping belongs to
    pub test_file: Option<String>,
    /// Covered fraction in `[0, 1]`
    pub coverage_ratio: Option<f64>,
}

/// Kind-specific attributes of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// Requirement attributes
    ProjectRequirement(RequirementPayload),
    /// Feature attributes
    Feature(FeaturePayload),
    /// Bug attributes
    Bug(BugPayload),
    /// Code change attributes
    CodeChange(CodeChangePayload),
    /// Test attributes
    Test(TestPayload),
    /// Test result attributes
    TestResult(TestResultPayload),
    /// Feedback attributes
    UserFeedback(FeedbackPayload),
    /// Document attributes
    Document(DocumentPayload),
    /// Code file attributes
    CodeFile(CodeFilePayload),
    /// Coverage attributes
    TestCoverage(CoveragePayload),
}

impl Payload {
    /// Empty payload for the given kind.
    #[must_use]
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::ProjectRequirement => Self::ProjectRequirement(RequirementPayload::default()),
            EntityKind::Feature => Self::Feature(FeaturePayload::default()),
            EntityKind::Bug => Self::Bug(BugPayload::default()),
            EntityKind::CodeChange => Self::CodeChange(CodeChangePayload::default()),
            EntityKind::Test => Self::Test(TestPayload::default()),
            EntityKind::TestResult => Self::TestResult(TestResultPayload::default()),
            EntityKind::UserFeedback => Self::UserFeedback(FeedbackPayload::default()),
            EntityKind::Document => Self::Document(DocumentPayload::default()),
            EntityKind::CodeFile => Self::CodeFile(CodeFilePayload::default()),
            EntityKind::TestCoverage => Self::TestCoverage(CoveragePayload::default()),
        }
    }

    /// Build a payload of `kind` from a JSON object of its fields.
    ///
    /// `null` yields the empty payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for unknown fields or badly typed values.
    pub fn from_json(kind: EntityKind, fields: serde_json::Value) -> Result<Self> {
        if fields.is_null() {
            return Ok(Self::empty(kind));
        }
        let mut tagged = serde_json::Map::new();
        tagged.insert(kind.as_str().to_string(), fields);
        serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|e| Error::Validation(format!("invalid {kind} payload: {e}")))
    }

    /// The entity kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::ProjectRequirement(_) => EntityKind::ProjectRequirement,
            Self::Feature(_) => EntityKind::Feature,
            Self::Bug(_) => EntityKind::Bug,
            Self::CodeChange(_) => EntityKind::CodeChange,
            Self::Test(_) => EntityKind::Test,
            Self::TestResult(_) => EntityKind::TestResult,
            Self::UserFeedback(_) => EntityKind::UserFeedback,
            Self::Document(_) => EntityKind::Document,
            Self::CodeFile(_) => EntityKind::CodeFile,
            Self::TestCoverage(_) => EntityKind::TestCoverage,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::TestCoverage(CoveragePayload {
                coverage_ratio: Some(ratio),
                ..
            }) if !(0.0..=1.0).contains(ratio) => {
                Err(format!("coverage_ratio must be within [0, 1], got {ratio}"))
            }
            Self::Test(TestPayload {
                coverage_percent: Some(pct),
                ..
            }) if !(0.0..=100.0).contains(pct) => {
                Err(format!("coverage_percent must be within [0, 100], got {pct}"))
            }
            Self::Test(TestPayload {
                execution_secs: Some(secs),
                ..
            })
            | Self::TestResult(TestResultPayload {
                execution_secs: Some(secs),
                ..
            }) if !secs.is_finite() || *secs < 0.0 => Err(format!(
                "execution_secs must be a non-negative number, got {secs}"
            )),
            _ => Ok(()),
        }
    }
}

/// A tracked artifact node in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable, globally unique identifier
    pub id: EntityId,

    /// Declared kind; must match the payload
    pub kind: EntityKind,

    /// Short human-readable title
    pub title: String,

    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last time the artifact itself changed
    pub last_updated_at: DateTime<Utc>,

    /// Kind-specific attributes
    pub payload: Payload,
}

impl Entity {
    /// Check the entity's invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the title is empty or too long, if the
    /// payload belongs to a different kind, or if a payload value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(Error::Validation("entity id cannot be empty".to_string()));
        }
        validate_title(&self.title)?;
        if self.payload.kind() != self.kind {
            return Err(Error::Validation(format!(
                "payload of kind '{}' does not match entity kind '{}'",
                self.payload.kind(),
                self.kind
            )));
        }
        if self.last_updated_at < self.created_at {
            return Err(Error::Validation(format!(
                "entity {} was updated before it was created",
                self.id
            )));
        }
        self.payload
            .validate()
            .map_err(|reason| Error::Validation(format!("entity {}: {reason}", self.id)))
    }

    /// Whether `query` occurs (case-insensitively) in the title or description.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

/// Data for ingesting an entity
#[derive(Debug, Clone)]
pub struct NewEntity {
    /// Caller-assigned ID. Generated from the kind prefix when absent.
    pub id: Option<EntityId>,

    /// Entity kind
    pub kind: EntityKind,

    /// Title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Kind-specific attributes; an empty payload is used when absent
    pub payload: Option<Payload>,

    /// When the artifact last changed; defaults to the ingestion time
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewEntity {
    /// Minimal entity of the given kind with an empty payload.
    pub fn new(kind: EntityKind, title: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            title: title.into(),
            description: None,
            payload: None,
            updated_at: None,
        }
    }

    /// Set a caller-assigned ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the artifact's last-update timestamp.
    #[must_use]
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Validate the title and payload before an ID is assigned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for an empty or oversized title or a
    /// payload whose kind differs from `kind`.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if let Some(payload) = &self.payload {
            if payload.kind() != self.kind {
                return Err(Error::Validation(format!(
                    "payload of kind '{}' does not match entity kind '{}'",
                    payload.kind(),
                    self.kind
                )));
            }
            payload.validate().map_err(Error::Validation)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::Validation(format!(
            "title cannot exceed {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}
