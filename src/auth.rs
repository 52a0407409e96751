use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{0}")]
    Stderr(String),

    #[error("`{0}` printed an empty token")]
    Empty(String),
}

/// Source of bearer tokens for the Discovery Engine API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, TokenError>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn access_token(&self) -> Result<String, TokenError> {
        (**self).access_token().await
    }
}

/// Runs an external credential command (e.g. `gcloud auth print-access-token`)
/// once per call. Every call spawns its own process.
#[derive(Debug, Clone)]
pub struct CommandTokenProvider {
    program: String,
    args: Vec<String>,
}

impl CommandTokenProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl TokenProvider for CommandTokenProvider {
    async fn access_token(&self) -> Result<String, TokenError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TokenError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            log::error!(
                "error getting access token: {} exited with {}",
                self.program,
                output.status
            );
            return Err(TokenError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            log::error!("stderr: {stderr}");
            return Err(TokenError::Stderr(stderr));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(TokenError::Empty(self.program.clone()));
        }
        Ok(token)
    }
}

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// Time-bounded cache in front of another provider.
///
/// The lock is held across the refresh, so concurrent callers that find the
/// token stale wait for a single refresh instead of each spawning one.
/// Failed refreshes are not cached.
pub struct CachedTokenProvider<P> {
    inner: P,
    ttl: Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl<P: TokenProvider> CachedTokenProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slot: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachedTokenProvider<P> {
    async fn access_token(&self) -> Result<String, TokenError> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.token.clone());
            }
        }

        let token = self.inner.access_token().await?;
        log::debug!("refreshed cached access token");
        *slot = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }
}
