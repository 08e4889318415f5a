//! `simrtc-types` – shared data model
//!
//! Commands, results and the [`BridgeError`] type used by every crate of the
//! simulator ↔ middleware bridge.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Correlates a [`Command`] with the [`CommandResult`] that answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The flavour of middleware component that a spawn command creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Joint-level robot component (position / velocity / force ports).
    Robot,
    /// Laser range finder.
    Range,
    /// Depth camera.
    Depth,
    /// Accelerometer.
    Accelerometer,
    /// Gyroscope.
    Gyro,
    /// Vision sensor.
    Camera,
    /// Free object exposing its pose.
    Object,
}

impl ComponentKind {
    /// Every kind, in menu order.
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Robot,
        ComponentKind::Range,
        ComponentKind::Depth,
        ComponentKind::Accelerometer,
        ComponentKind::Gyro,
        ComponentKind::Camera,
        ComponentKind::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Robot => "robot",
            ComponentKind::Range => "range",
            ComponentKind::Depth => "depth",
            ComponentKind::Accelerometer => "accelerometer",
            ComponentKind::Gyro => "gyro",
            ComponentKind::Camera => "camera",
            ComponentKind::Object => "object",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "robot" => Ok(ComponentKind::Robot),
            "range" => Ok(ComponentKind::Range),
            "depth" => Ok(ComponentKind::Depth),
            "accelerometer" | "accel" => Ok(ComponentKind::Accelerometer),
            "gyro" => Ok(ComponentKind::Gyro),
            "camera" => Ok(ComponentKind::Camera),
            "object" => Ok(ComponentKind::Object),
            other => Err(BridgeError::InvalidArgument(format!(
                "unknown component kind '{other}'"
            ))),
        }
    }
}

/// The operation a [`Command`] asks the executor to perform.
///
/// The meaning of the command's `key` / `arg` fields depends on the kind:
///
/// | Kind | `key` | `arg` |
/// |---|---|---|
/// | `LoadProject` | scene path | – |
/// | `Spawn(_)` | model name | component creation argument |
/// | `KillRtc`, `SyncRtc` | component name | – |
/// | `GetObjPose` | object name | – |
/// | `SetObjPose` | object name | `"x,y,z,roll,pitch,yaw"` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "component")]
pub enum CommandKind {
    Start,
    Stop,
    Pause,
    LoadProject,
    Spawn(ComponentKind),
    KillRtc,
    KillAllRtc,
    SyncRtc,
    GetSyncRtc,
    GetSimTime,
    GetSimStep,
    GetObjPose,
    SetObjPose,
}

impl CommandKind {
    /// Every kind the executor understands, with one entry per component kind.
    pub fn all() -> Vec<CommandKind> {
        let mut kinds = vec![
            CommandKind::Start,
            CommandKind::Stop,
            CommandKind::Pause,
            CommandKind::LoadProject,
        ];
        kinds.extend(ComponentKind::ALL.iter().copied().map(CommandKind::Spawn));
        kinds.extend([
            CommandKind::KillRtc,
            CommandKind::KillAllRtc,
            CommandKind::SyncRtc,
            CommandKind::GetSyncRtc,
            CommandKind::GetSimTime,
            CommandKind::GetSimStep,
            CommandKind::GetObjPose,
            CommandKind::SetObjPose,
        ]);
        kinds
    }
}

/// A typed request to run one operation on the executor thread.
///
/// Immutable once enqueued: the queue takes ownership on push and hands it to
/// the executor on pop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: RequestId,
    pub kind: CommandKind,
    pub key: String,
    pub arg: String,
    pub issued_at: DateTime<Utc>,
}

impl Command {
    /// Build a command with a fresh [`RequestId`].
    pub fn new(kind: CommandKind, key: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            key: key.into(),
            arg: arg.into(),
            issued_at: Utc::now(),
        }
    }

    /// A command whose kind needs neither `key` nor `arg`.
    pub fn bare(kind: CommandKind) -> Self {
        Self::new(kind, "", "")
    }
}

/// Status carried by every [`CommandResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReturnCode {
    /// The operation succeeded.
    Ok,
    /// The host API reported a recognised failure (e.g. refused to start).
    Failed,
    /// The host API returned an error, or an invariant was violated.
    Error,
}

impl From<&BridgeError> for ReturnCode {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Refused(_) => ReturnCode::Failed,
            _ => ReturnCode::Error,
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnCode::Ok => f.write_str("OK"),
            ReturnCode::Failed => f.write_str("FAILED"),
            ReturnCode::Error => f.write_str("ERROR"),
        }
    }
}

/// Position (metres) and orientation (radians, XYZ Euler) of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl FromStr for Pose {
    type Err = BridgeError;

    /// Parse six comma-separated numbers: `"x,y,z,roll,pitch,yaw"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|token| token.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::InvalidArgument(format!("bad pose '{s}': {e}")))?;
        match values.as_slice() {
            [x, y, z, roll, pitch, yaw] => Ok(Pose {
                x: *x,
                y: *y,
                z: *z,
                roll: *roll,
                pitch: *pitch,
                yaw: *yaw,
            }),
            _ => Err(BridgeError::InvalidArgument(format!(
                "pose needs 6 values, got {}",
                values.len()
            ))),
        }
    }
}

/// Optional data attached to a [`CommandResult`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ResultPayload {
    #[default]
    None,
    /// Simulation time or time step, in seconds.
    Float(f64),
    /// Names of synchronized components.
    Names(Vec<String>),
    Pose(Pose),
}

/// The typed outcome of exactly one [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub request_id: RequestId,
    pub status: ReturnCode,
    pub payload: ResultPayload,
    /// Human-readable reason for a non-`Ok` status.
    pub detail: Option<String>,
}

impl CommandResult {
    pub fn ok(request_id: RequestId) -> Self {
        Self::with_payload(request_id, ResultPayload::None)
    }

    pub fn with_payload(request_id: RequestId, payload: ResultPayload) -> Self {
        Self {
            request_id,
            status: ReturnCode::Ok,
            payload,
            detail: None,
        }
    }

    /// A `Failed` or `Error` result derived from `err`.
    pub fn from_error(request_id: RequestId, err: &BridgeError) -> Self {
        Self {
            request_id,
            status: ReturnCode::from(err),
            payload: ResultPayload::None,
            detail: Some(err.to_string()),
        }
    }

    /// An `Error` result with a free-form reason.
    pub fn error(request_id: RequestId, detail: impl Into<String>) -> Self {
        Self {
            request_id,
            status: ReturnCode::Error,
            payload: ResultPayload::None,
            detail: Some(detail.into()),
        }
    }

    /// Convert `Result<(), BridgeError>` from a host call into a result.
    pub fn from_outcome(request_id: RequestId, outcome: Result<(), BridgeError>) -> Self {
        match outcome {
            Ok(()) => Self::ok(request_id),
            Err(e) => Self::from_error(request_id, &e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReturnCode::Ok
    }

    /// The float payload, if any.
    pub fn float_value(&self) -> Option<f64> {
        match self.payload {
            ResultPayload::Float(v) => Some(v),
            _ => None,
        }
    }

    /// The name-list payload, if any.
    pub fn names(&self) -> Option<&[String]> {
        match &self.payload {
            ResultPayload::Names(names) => Some(names),
            _ => None,
        }
    }
}

/// Error type shared by the queues, the host collaborators and the bridge.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BridgeError {
    #[error("bridge channels are closed")]
    Closed,

    #[error("timed out waiting for result of request {0}")]
    Timeout(RequestId),

    #[error("request {0} was cancelled")]
    Cancelled(RequestId),

    #[error("host refused the operation: {0}")]
    Refused(String),

    #[error("host fault: {0}")]
    HostFault(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),
}
