//! Client side of the gorund socket

use crate::error::{GorunError, GorunResult};
use crate::rpc::protocol::{
    decode_reply, read_line, write_message, ExecutableRequest, ExecutableResponse,
    RebuildResponse, Request,
};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tracing::debug;

/// Talks to gorund over its Unix socket
#[derive(Debug, Clone)]
pub struct Client {
    socket: PathBuf,
    timeout: Duration,
}

impl Client {
    /// Create a client for `socket` with the default request timeout
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Override the per-request timeout, which includes compilation time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Socket this client connects to
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Resolve `package` to an executable path, compiling on the server if needed
    pub async fn get_executable(&self, package: &str, env: Vec<String>) -> GorunResult<PathBuf> {
        let request = Request::GetExecutable(ExecutableRequest::new(package, env));
        let response: ExecutableResponse = self.call(&request).await?;

        if response.executable.is_empty() {
            return Err(GorunError::CompileFailed {
                output: response.compilation_output,
            });
        }
        Ok(PathBuf::from(response.executable))
    }

    /// Ask the server to compile `package` again
    pub async fn rebuild_executable(&self, package: &str, env: Vec<String>) -> GorunResult<()> {
        let request = Request::RebuildExecutable(ExecutableRequest::new(package, env));
        let response: RebuildResponse = self.call(&request).await?;

        if response.ok {
            debug!("Rebuilt {}", package);
            Ok(())
        } else {
            Err(GorunError::Server(response.error.unwrap_or_default()))
        }
    }

    /// Whether the server accepts connections
    pub async fn is_reachable(&self) -> bool {
        UnixStream::connect(&self.socket).await.is_ok()
    }

    async fn call<T: DeserializeOwned>(&self, request: &Request) -> GorunResult<T> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| GorunError::Timeout(self.timeout))?
    }

    async fn exchange<T: DeserializeOwned>(&self, request: &Request) -> GorunResult<T> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::ConnectionRefused => GorunError::ChannelUnreachable {
                    socket: self.socket.clone(),
                    source: e,
                },
                _ => GorunError::io(format!("connecting to {}", self.socket.display()), e),
            })?;

        let (read, mut write) = stream.into_split();
        write_message(&mut write, request).await?;

        let mut reader = BufReader::new(read);
        let line = read_line(&mut reader)
            .await?
            .ok_or_else(|| GorunError::Protocol("server closed connection without reply".into()))?;

        decode_reply(&line)
    }
}
