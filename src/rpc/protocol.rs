//! Wire types for the gorund socket
//!
//! Each connection carries exactly one newline-terminated JSON request and
//! one newline-terminated JSON response.

use crate::build::BuildContext;
use crate::config::DIRECTORY_ENV_KEY;
use crate::error::{GorunError, GorunResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest message line accepted from a peer, newline included
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// A request sent to gorund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Return the cached executable, compiling on a miss
    GetExecutable(ExecutableRequest),
    /// Compile again and replace the cached executable
    RebuildExecutable(ExecutableRequest),
}

/// Package plus the caller's full environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableRequest {
    /// Package path as passed to `go build`
    pub package: String,

    /// Caller environment as `KEY=VALUE` entries
    pub env: Vec<String>,
}

impl ExecutableRequest {
    /// Create a request
    pub fn new(package: impl Into<String>, env: Vec<String>) -> Self {
        Self {
            package: package.into(),
            env,
        }
    }

    /// Build context: the package resolved in the caller's `PWD`
    pub fn context(&self) -> BuildContext {
        BuildContext::new(
            self.package.clone(),
            value_from_env(DIRECTORY_ENV_KEY, &self.env),
        )
    }
}

/// Reply to [`Request::GetExecutable`]
///
/// `executable` is empty on failure and `compilation_output` holds the
/// diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableResponse {
    pub executable: String,
    #[serde(default)]
    pub compilation_output: String,
}

/// Reply to [`Request::RebuildExecutable`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to a request the server could not parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Any reply the server writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Executable(ExecutableResponse),
    Rebuild(RebuildResponse),
    Error(ErrorResponse),
}

/// Value of `key` in a `KEY=VALUE` list.
///
/// The first match wins, values may themselves contain `=`, entries without
/// `=` are skipped and a missing key yields an empty string.
pub fn value_from_env<'a>(key: &str, env: &'a [String]) -> &'a str {
    env.iter()
        .filter_map(|entry| entry.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or("")
}

/// Serialize `message` as one JSON line
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> GorunResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .map_err(|e| GorunError::io("writing message", e))?;
    writer
        .flush()
        .await
        .map_err(|e| GorunError::io("flushing message", e))
}

/// Read one JSON line; `None` if the peer closed without sending anything
///
/// Lines longer than [`MAX_MESSAGE_BYTES`] are rejected without buffering
/// the rest.
pub async fn read_line<R>(reader: &mut R) -> GorunResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .take(MAX_MESSAGE_BYTES as u64 + 1)
        .read_line(&mut line)
        .await
        .map_err(|e| GorunError::io("reading message", e))?;

    if read > MAX_MESSAGE_BYTES {
        return Err(GorunError::Protocol(format!(
            "message exceeds {} bytes",
            MAX_MESSAGE_BYTES
        )));
    }
    Ok((read > 0).then_some(line))
}

/// Decode a reply, surfacing server-side [`ErrorResponse`]s as errors
pub fn decode_reply<T: DeserializeOwned>(line: &str) -> GorunResult<T> {
    match serde_json::from_str::<T>(line) {
        Ok(reply) => Ok(reply),
        Err(e) => match serde_json::from_str::<ErrorResponse>(line) {
            Ok(ErrorResponse { error }) => Err(GorunError::Server(error)),
            Err(_) => Err(GorunError::Protocol(format!("invalid reply: {}", e))),
        },
    }
}
