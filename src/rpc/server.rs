//! Unix-socket server exposing the build cache
//!
//! Every connection is served on its own task. The server does no locking
//! of its own; concurrent requests for one build key are serialized by the
//! cache.

use crate::build::BuildCache;
use crate::error::{GorunError, GorunResult};
use crate::rpc::protocol::{
    read_line, write_message, ErrorResponse, ExecutableRequest, ExecutableResponse,
    RebuildResponse, Request, Response,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Serves build cache requests on a Unix socket
pub struct Server {
    socket: PathBuf,
    cache: Arc<BuildCache>,
}

/// A server running on a background task
pub struct ServerHandle {
    socket: PathBuf,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<GorunResult<()>>,
}

impl ServerHandle {
    /// Socket the server listens on
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Stop accepting connections and wait for the accept loop to exit
    pub async fn stop(self) -> GorunResult<()> {
        // The loop may already have exited on an accept error
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|e| GorunError::Internal(format!("server task failed: {}", e)))?
    }
}

impl Server {
    /// Create a server for `cache` listening on `socket`
    pub fn new(socket: impl Into<PathBuf>, cache: Arc<BuildCache>) -> Self {
        Self {
            socket: socket.into(),
            cache,
        }
    }

    /// Serve until `shutdown` completes
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> GorunResult<()> {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    /// Bind the socket and serve on a background task
    ///
    /// The socket accepts connections as soon as this returns.
    pub async fn start(self) -> GorunResult<ServerHandle> {
        let listener = self.bind()?;
        let socket = self.socket.clone();
        let (shutdown, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            self.serve(listener, async move {
                let _ = stopped.await;
            })
            .await
        });

        Ok(ServerHandle {
            socket,
            shutdown,
            task,
        })
    }

    fn bind(&self) -> GorunResult<UnixListener> {
        // A socket left behind by a crashed server would make bind fail
        match std::fs::remove_file(&self.socket) {
            Ok(()) => debug!("Removed stale socket {}", self.socket.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GorunError::io(
                    format!("removing stale socket {}", self.socket.display()),
                    e,
                ))
            }
        }

        if let Some(parent) = self.socket.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GorunError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        let listener = UnixListener::bind(&self.socket).map_err(|e| {
            GorunError::io(format!("binding socket {}", self.socket.display()), e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.socket, perms)
                .map_err(|e| GorunError::io("setting socket permissions", e))?;
        }

        info!("Starting server at {}", self.socket.display());
        Ok(listener)
    }

    async fn serve(
        self,
        listener: UnixListener,
        shutdown: impl Future<Output = ()>,
    ) -> GorunResult<()> {
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let cache = self.cache.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(&cache, stream).await {
                                warn!("Connection failed: {}", e);
                            }
                        });
                    }
                    Err(e) => break Err(GorunError::io("accepting connection", e)),
                },
                _ = &mut shutdown => break Ok(()),
            }
        };

        drop(listener);
        if let Err(e) = std::fs::remove_file(&self.socket) {
            debug!("Could not remove socket {}: {}", self.socket.display(), e);
        }
        info!("Server at {} stopped", self.socket.display());
        result
    }
}

async fn handle_connection(cache: &BuildCache, stream: UnixStream) -> GorunResult<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    let line = match read_line(&mut reader).await {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!("Client closed connection without a request");
            return Ok(());
        }
        Err(GorunError::Protocol(reason)) => {
            let response = Response::Error(ErrorResponse { error: reason });
            return write_message(&mut write, &response).await;
        }
        Err(e) => return Err(e),
    };

    let response = match serde_json::from_str::<Request>(&line) {
        Ok(request) => handle_request(cache, request).await,
        Err(e) => Response::Error(ErrorResponse {
            error: format!("Failed to parse json: {}", e),
        }),
    };

    write_message(&mut write, &response).await
}

/// Answer one request
pub async fn handle_request(cache: &BuildCache, request: Request) -> Response {
    match request {
        Request::GetExecutable(request) => Response::Executable(get_executable(cache, &request).await),
        Request::RebuildExecutable(request) => {
            Response::Rebuild(rebuild_executable(cache, &request).await)
        }
    }
}

async fn get_executable(cache: &BuildCache, request: &ExecutableRequest) -> ExecutableResponse {
    let context = request.context();
    info!("Requested translation of {}", context);

    match cache.resolve(&context).await {
        Ok(path) => ExecutableResponse {
            executable: path.to_string_lossy().into_owned(),
            compilation_output: String::new(),
        },
        Err(GorunError::CompileFailed { output }) => ExecutableResponse {
            executable: String::new(),
            compilation_output: output,
        },
        Err(e) => ExecutableResponse {
            executable: String::new(),
            compilation_output: e.to_string(),
        },
    }
}

async fn rebuild_executable(cache: &BuildCache, request: &ExecutableRequest) -> RebuildResponse {
    let context = request.context();
    info!("Requested rebuild of {}", context);

    match cache.rebuild(&context).await {
        Ok(path) => {
            debug!("Rebuilt {} to {}", context, path.display());
            RebuildResponse {
                ok: true,
                error: None,
            }
        }
        Err(GorunError::CompileFailed { output }) => RebuildResponse {
            ok: false,
            error: Some(output),
        },
        Err(e) => RebuildResponse {
            ok: false,
            error: Some(e.to_string()),
        },
    }
}
