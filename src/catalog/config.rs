//! Test catalog types
//!
//! Defines the data structures for deserializing the YAML test definitions.
//! Loosely shaped YAML (setup steps distinguished by which key is present,
//! verification maps keyed by `type`) is resolved into closed enums here, so
//! an unknown shape fails when the catalog is loaded rather than when a test
//! happens to reach it.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// A test file as written on disk
#[derive(Deserialize, Debug)]
pub struct TestFile {
    /// Category key (defaults to the file stem)
    pub category: Option<String>,
    /// Human readable category name (defaults to the category)
    pub display_name: Option<String>,
    /// Tests in this file
    pub tests: Option<Vec<TestDefinition>>,
}

/// A single manual test
#[derive(Deserialize, Debug, Clone)]
pub struct TestDefinition {
    /// Unique id, e.g. `MT-LOCAL-03`
    pub id: String,
    /// One-line title
    pub name: String,
    /// Category key, filled in by the loader
    #[serde(skip)]
    pub category: String,
    /// Category display name, filled in by the loader
    #[serde(skip)]
    pub display_name: String,
    /// Platforms this test applies to; `all` matches every platform
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    /// Pull request that introduced the behavior under test
    #[serde(default)]
    pub pr: Option<u32>,
    /// Infrastructure to bring up before the test is presented
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    /// Steps shown to the operator before the instructions
    #[serde(default)]
    pub setup: Vec<SetupAction>,
    /// Numbered instructions for the operator
    #[serde(default)]
    pub instructions: Vec<String>,
    /// Expected observations
    #[serde(default)]
    pub expected: Vec<String>,
    /// How the outcome can be checked automatically
    #[serde(default)]
    pub verification: Verification,
}

fn default_platforms() -> Vec<String> {
    vec![ALL_PLATFORMS.to_string()]
}

/// Platform tag that matches every platform
pub const ALL_PLATFORMS: &str = "all";

impl TestDefinition {
    /// Whether this test runs on `platform`
    pub fn applies_to(&self, platform: &str) -> bool {
        self.platforms
            .iter()
            .any(|p| p == ALL_PLATFORMS || p == platform)
    }

    /// Capabilities requested by the prerequisites, in declaration order
    pub fn required_capabilities(&self) -> Vec<Capability> {
        self.prerequisites
            .iter()
            .flat_map(Prerequisite::capabilities)
            .collect()
    }

    /// Connections this test asks to have pre-created
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionSpec> {
        self.setup.iter().filter_map(|step| match step {
            SetupAction::CreateConnection(spec) => Some(spec),
            _ => None,
        })
    }
}

/// Infrastructure a test can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The docker compose test stack
    Docker,
    /// A virtual serial port pair
    Serial,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Docker => write!(f, "docker"),
            Capability::Serial => write!(f, "serial"),
        }
    }
}

/// One prerequisite entry, e.g. `{docker: true}`
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Prerequisite {
    #[serde(default)]
    pub docker: bool,
    #[serde(default)]
    pub serial: bool,
}

impl Prerequisite {
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> {
        let docker = self.docker.then_some(Capability::Docker);
        let serial = self.serial.then_some(Capability::Serial);
        docker.into_iter().chain(serial)
    }
}

/// A connection the runner pre-creates in the generated config bundle
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionSpec {
    /// Connection name shown in the app's sidebar
    pub name: String,
    /// Connection type, e.g. `ssh`, `serial`, `local`
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific settings, passed through verbatim
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A setup step shown on the test card
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawSetupAction")]
pub enum SetupAction {
    /// Free-form information
    Info(String),
    /// Ask the operator to open a connection by name
    Connect(String),
    /// A connection to pre-create in the generated config bundle
    CreateConnection(ConnectionSpec),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSetupAction {
    Info(String),
    Connect { connect: String },
    CreateConnection { create_connection: ConnectionSpec },
}

impl From<RawSetupAction> for SetupAction {
    fn from(raw: RawSetupAction) -> Self {
        match raw {
            RawSetupAction::Info(text) => SetupAction::Info(text),
            RawSetupAction::Connect { connect } => SetupAction::Connect(connect),
            RawSetupAction::CreateConnection { create_connection } => {
                SetupAction::CreateConnection(create_connection)
            }
        }
    }
}

/// How a test outcome can be checked automatically
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(try_from = "RawVerification")]
pub enum Verification {
    /// Operator judgement only
    #[default]
    Manual,
    /// A regular file exists at `path`
    FileExists {
        path: PathBuf,
        description: Option<String>,
    },
    /// `path` is valid JSON and, when jq is available, `query` holds
    JsonCheck {
        path: PathBuf,
        query: Option<String>,
        description: Option<String>,
    },
    /// A process whose name matches is running
    ProcessRunning {
        name: String,
        description: Option<String>,
    },
    /// Something accepts TCP connections on `127.0.0.1:port`
    PortListening {
        port: u16,
        description: Option<String>,
    },
    /// Automated checks followed by a manual confirmation
    Combined {
        automated: Vec<Verification>,
        manual_prompt: Option<String>,
    },
}

/// Prompt used when a combined verification does not name one
pub const DEFAULT_MANUAL_PROMPT: &str = "Manual check passed?";

impl Verification {
    /// Tag recorded as `verification_type` in reports
    pub fn type_tag(&self) -> &'static str {
        match self {
            Verification::Manual => "manual",
            Verification::FileExists { .. } => "file_exists",
            Verification::JsonCheck { .. } => "json_check",
            Verification::ProcessRunning { .. } => "process_running",
            Verification::PortListening { .. } => "port_listening",
            Verification::Combined { .. } => "combined",
        }
    }

    /// Whether pressing Enter should run automated checks
    pub fn is_automated(&self) -> bool {
        !matches!(self, Verification::Manual)
    }

    /// The manual confirmation that follows automated checks, if any
    pub fn manual_prompt(&self) -> Option<&str> {
        match self {
            Verification::Combined { manual_prompt, .. } => {
                Some(manual_prompt.as_deref().unwrap_or(DEFAULT_MANUAL_PROMPT))
            }
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVerification {
    Keyword(String),
    Spec(VerificationSpec),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum VerificationSpec {
    Manual,
    FileExists {
        path: PathBuf,
        description: Option<String>,
    },
    JsonCheck {
        path: PathBuf,
        #[serde(alias = "query")]
        jq: Option<String>,
        description: Option<String>,
    },
    ProcessRunning {
        name: String,
        description: Option<String>,
    },
    PortListening {
        port: u16,
        description: Option<String>,
    },
    Combined {
        #[serde(default)]
        automated: Vec<Verification>,
        manual_prompt: Option<String>,
    },
}

impl TryFrom<RawVerification> for Verification {
    type Error = String;

    fn try_from(raw: RawVerification) -> std::result::Result<Self, Self::Error> {
        let spec = match raw {
            RawVerification::Keyword(word) if word == "manual" => return Ok(Verification::Manual),
            RawVerification::Keyword(word) => {
                return Err(format!(
                    "unknown verification '{}', expected 'manual' or a map with a 'type' key",
                    word
                ))
            }
            RawVerification::Spec(spec) => spec,
        };

        Ok(match spec {
            VerificationSpec::Manual => Verification::Manual,
            VerificationSpec::FileExists { path, description } => {
                Verification::FileExists { path, description }
            }
            VerificationSpec::JsonCheck {
                path,
                jq,
                description,
            } => Verification::JsonCheck {
                path,
                query: jq.filter(|q| !q.trim().is_empty()),
                description,
            },
            VerificationSpec::ProcessRunning { name, description } => {
                Verification::ProcessRunning { name, description }
            }
            VerificationSpec::PortListening { port, description } => {
                Verification::PortListening { port, description }
            }
            VerificationSpec::Combined {
                automated,
                manual_prompt,
            } => Verification::Combined {
                automated,
                manual_prompt,
            },
        })
    }
}
