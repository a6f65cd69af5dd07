// Gantry HTTP client
//
// Wraps `reqwest::Client` with session-header injection, endpoint path
// normalization, and response normalization. All typed endpoint wrappers
// are inherent methods on `GantryClient`; the raw `call` path is the single
// place request mechanics live.

use reqwest::Method;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::transport::TransportConfig;

/// Name of the authentication header carried on every request.
pub const SESSION_HEADER: &str = "session_id";

// ── Wire enums ───────────────────────────────────────────────────────

/// Device operating mode, as understood by the firmware.
///
/// The wire representation is a bare integer in a `{value: int}` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Record,
    Playback,
}

impl Mode {
    /// Integer value the firmware expects.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Record => 1,
            Self::Playback => 2,
        }
    }
}

/// One of the two motion axes of a gantry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Q0,
    Q1,
}

impl Axis {
    /// Path segment for per-axis endpoints (`position/q0`, ...).
    pub fn segment(self) -> &'static str {
        match self {
            Self::Q0 => "q0",
            Self::Q1 => "q1",
        }
    }
}

// ── PID addressing ───────────────────────────────────────────────────
//
// The firmware exposes one endpoint per (channel, loop, term) combination.
// Rather than one method per endpoint, the combination is an enumerated
// tuple and the endpoint is assembled from segment lookups.

/// Motor channel a PID parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidChannel {
    Ch0,
    Ch1,
}

impl PidChannel {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Ch0 => "ch0",
            Self::Ch1 => "ch1",
        }
    }
}

/// Which control loop the parameter tunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidLoop {
    Position,
    Velocity,
}

impl PidLoop {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
        }
    }
}

/// Individual PID term (or the low-pass filter constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidTerm {
    P,
    I,
    D,
    Lpf,
}

impl PidTerm {
    pub fn segment(self) -> &'static str {
        match self {
            Self::P => "p",
            Self::I => "i",
            Self::D => "d",
            Self::Lpf => "lpf",
        }
    }
}

// ── Response payload ─────────────────────────────────────────────────

/// Normalized response body from a successful request.
///
/// A 200 with a JSON content type decodes to [`Payload::Json`]; any other
/// success body is carried as opaque text. The firmware answers most reads
/// with bare text numbers, so the numeric accessors accept both shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Decode a float from a JSON number or a plain-text body.
    pub fn as_f64(&self) -> Result<f64, ApiError> {
        match self {
            Self::Json(serde_json::Value::Number(n)) => n.as_f64().ok_or_else(|| self.parse_err("float")),
            Self::Json(serde_json::Value::String(s)) => {
                s.trim().parse().map_err(|_| self.parse_err("float"))
            }
            Self::Text(s) => s.trim().parse().map_err(|_| self.parse_err("float")),
            Self::Json(_) => Err(self.parse_err("float")),
        }
    }

    /// Decode a non-negative integer from a JSON number or text body.
    pub fn as_u32(&self) -> Result<u32, ApiError> {
        match self {
            Self::Json(serde_json::Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| self.parse_err("integer")),
            Self::Json(serde_json::Value::String(s)) => {
                s.trim().parse().map_err(|_| self.parse_err("integer"))
            }
            Self::Text(s) => s.trim().parse().map_err(|_| self.parse_err("integer")),
            Self::Json(_) => Err(self.parse_err("integer")),
        }
    }

    /// Decode a boolean success marker.
    pub fn as_bool(&self) -> Result<bool, ApiError> {
        match self {
            Self::Json(serde_json::Value::Bool(b)) => Ok(*b),
            Self::Json(serde_json::Value::Number(n)) => {
                Ok(n.as_f64().is_some_and(|v| v != 0.0))
            }
            Self::Json(serde_json::Value::String(s)) => parse_bool_text(s)
                .ok_or_else(|| self.parse_err("boolean")),
            Self::Text(s) => parse_bool_text(s).ok_or_else(|| self.parse_err("boolean")),
            Self::Json(_) => Err(self.parse_err("boolean")),
        }
    }

    fn parse_err(&self, expected: &'static str) -> ApiError {
        let got = match self {
            Self::Json(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        };
        ApiError::Parse { expected, got }
    }
}

fn parse_bool_text(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

// ── Request bodies ───────────────────────────────────────────────────

#[derive(Serialize)]
struct ValueBody<T: Serialize> {
    value: T,
}

#[derive(Serialize)]
struct SessionBody<'a> {
    session_id: &'a str,
}

// ── GantryClient ─────────────────────────────────────────────────────

/// Authenticated request executor against one device's HTTP endpoint.
///
/// Holds the device base URL and the session token generated at connect
/// time; the token rides along as the `session_id` header on every call.
/// This layer never retries: retry policy belongs to the caller and is
/// never applied to state-mutating calls.
#[derive(Debug)]
pub struct GantryClient {
    http: reqwest::Client,
    base_url: Url,
    session_id: String,
}

/// Build a device base URL from a discovery record's address and port.
pub fn device_url(address: &str, port: u16) -> Result<Url, ApiError> {
    Ok(Url::parse(&format!("http://{address}:{port}"))?)
}

impl GantryClient {
    /// Create a client for one device from a `TransportConfig`.
    ///
    /// The `base_url` is the device root (e.g. `http://192.168.0.102:8080`).
    pub fn new(
        base_url: Url,
        session_id: String,
        transport: &TransportConfig,
    ) -> Result<Self, ApiError> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            session_id,
        })
    }

    /// The session token this client presents.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Request mechanics ────────────────────────────────────────────

    /// Execute one request and normalize its result.
    ///
    /// Strips a single leading `/` from `endpoint` so that `mode` and
    /// `/mode` address the same URL, attaches the session header, and maps
    /// the response: 200 + JSON content type decodes to [`Payload::Json`],
    /// any other success body becomes [`Payload::Text`], a non-success
    /// status becomes [`ApiError::Protocol`], and network-level failures
    /// become [`ApiError::Transport`].
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Payload, ApiError> {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let url = self.base_url.join(endpoint)?;

        debug!(%method, %url, "device request");

        let mut request = self
            .http
            .request(method, url)
            .header(SESSION_HEADER, &self.session_id);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(ApiError::Transport)?;
        Self::normalize(resp).await
    }

    async fn get(&self, endpoint: &str) -> Result<Payload, ApiError> {
        self.call(Method::GET, endpoint, None).await
    }

    async fn post(&self, endpoint: &str, body: &impl Serialize) -> Result<Payload, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Parse { expected: "serializable body", got: e.to_string() })?;
        self.call(Method::POST, endpoint, Some(&body)).await
    }

    async fn normalize(resp: reqwest::Response) -> Result<Payload, ApiError> {
        let status = resp.status();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let body = resp.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            return Err(ApiError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        if status == reqwest::StatusCode::OK && is_json {
            let value = serde_json::from_str(&body).map_err(|_| ApiError::Parse {
                expected: "JSON body",
                got: body.clone(),
            })?;
            return Ok(Payload::Json(value));
        }

        Ok(Payload::Text(body))
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Register this client's session token with the device.
    pub async fn open_session(&self) -> Result<(), ApiError> {
        self.post("session", &SessionBody { session_id: &self.session_id })
            .await?;
        Ok(())
    }

    /// Poll the liveness endpoint.
    ///
    /// Returns `Ok(true)` when the device acknowledges the session with a
    /// `{"status": "success"}` reply; any other 200 body is a failed poll.
    pub async fn heartbeat(&self) -> Result<bool, ApiError> {
        let payload = self.get("session").await?;
        let alive = matches!(
            &payload,
            Payload::Json(v) if v.get("status").and_then(|s| s.as_str()) == Some("success")
        );
        Ok(alive)
    }

    // ── Mode & waypoint index ────────────────────────────────────────

    pub async fn set_mode(&self, mode: Mode) -> Result<(), ApiError> {
        self.post("mode", &ValueBody { value: mode.wire_value() }).await?;
        Ok(())
    }

    pub async fn target_waypoint(&self) -> Result<u32, ApiError> {
        self.get("target_waypoint").await?.as_u32()
    }

    pub async fn set_target_waypoint(&self, index: u32) -> Result<(), ApiError> {
        self.post("target_waypoint", &ValueBody { value: index }).await?;
        Ok(())
    }

    // ── Position & waypoints ─────────────────────────────────────────

    /// Current position of both axes, q0 then q1.
    pub async fn position(&self) -> Result<(f64, f64), ApiError> {
        self.read_axis_pair("position").await
    }

    /// Position of the next waypoint in the stored trajectory.
    pub async fn next_waypoint(&self) -> Result<(f64, f64), ApiError> {
        self.read_axis_pair("next_waypoint").await
    }

    /// Position of the previous waypoint in the stored trajectory.
    pub async fn previous_waypoint(&self) -> Result<(f64, f64), ApiError> {
        self.read_axis_pair("previous_waypoint").await
    }

    async fn read_axis_pair(&self, prefix: &str) -> Result<(f64, f64), ApiError> {
        let q0 = self
            .get(&format!("{prefix}/{}", Axis::Q0.segment()))
            .await?
            .as_f64()?;
        let q1 = self
            .get(&format!("{prefix}/{}", Axis::Q1.segment()))
            .await?
            .as_f64()?;
        Ok((q0, q1))
    }

    // ── Trajectory ───────────────────────────────────────────────────

    pub async fn add_waypoint(&self) -> Result<bool, ApiError> {
        self.get("add_waypoint").await?.as_bool()
    }

    pub async fn save_trajectory(&self) -> Result<bool, ApiError> {
        self.get("save_trajectory").await?.as_bool()
    }

    pub async fn trajectory_length(&self) -> Result<u32, ApiError> {
        self.get("trajectory_length").await?.as_u32()
    }

    // ── Speed ────────────────────────────────────────────────────────

    pub async fn set_target_speed(&self, value: f64) -> Result<(), ApiError> {
        self.post("target_speed", &ValueBody { value }).await?;
        Ok(())
    }

    /// Write both per-axis speed multipliers, q0 strictly before q1.
    pub async fn set_speed_multipliers(&self, q0: f64, q1: f64) -> Result<(), ApiError> {
        self.post(
            &format!("speed_multiplier/{}", Axis::Q0.segment()),
            &ValueBody { value: q0 },
        )
        .await?;
        self.post(
            &format!("speed_multiplier/{}", Axis::Q1.segment()),
            &ValueBody { value: q1 },
        )
        .await?;
        Ok(())
    }

    // ── PID tuning ───────────────────────────────────────────────────

    /// Write one PID parameter, addressed by `(channel, loop, term)`.
    pub async fn set_pid(
        &self,
        channel: PidChannel,
        pid_loop: PidLoop,
        term: PidTerm,
        value: f64,
    ) -> Result<(), ApiError> {
        let endpoint = format!(
            "{}/{}/{}",
            channel.segment(),
            pid_loop.segment(),
            term.segment()
        );
        self.post(&endpoint, &ValueBody { value }).await?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
