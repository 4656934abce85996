// src/probes/cache.rs
use super::{ProbeSetupError, NOT_CONFIGURED};
use crate::health::{DependencyProbe, ProbeContext, ProbeOutcome};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, ErrorKind, RedisError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Sends `PING` to Redis and expects `PONG`.
///
/// One multiplexed connection is opened on first use and shared by every
/// check; it is dropped and reopened after a connection-level failure.
#[derive(Clone)]
pub struct RedisProbe {
    client: Option<Client>,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisProbe {
    pub fn unconfigured() -> Self {
        Self {
            client: None,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Parses the url; no connection is made until the first probe.
    pub fn open(url: &str) -> Result<Self, ProbeSetupError> {
        let client = Client::open(url).map_err(|_| ProbeSetupError::InvalidEndpoint("redis"))?;
        Ok(Self {
            client: Some(client),
            connection: Arc::new(Mutex::new(None)),
        })
    }

    pub fn from_endpoint(url: Option<&str>) -> Result<Self, ProbeSetupError> {
        match url {
            Some(url) => Self::open(url),
            None => Ok(Self::unconfigured()),
        }
    }

    async fn connection(&self, client: &Client) -> Result<MultiplexedConnection, RedisError> {
        let mut cached = self.connection.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }

        let conn = client.get_multiplexed_async_connection().await?;
        debug!("opened redis connection");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn ping(&self, client: &Client) -> Result<String, RedisError> {
        let mut conn = self.connection(client).await?;
        let reply: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;

        if let Err(e) = &reply {
            if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                self.connection.lock().await.take();
            }
        }
        reply
    }
}

impl std::fmt::Debug for RedisProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisProbe")
            .field("configured", &self.client.is_some())
            .finish()
    }
}

#[async_trait]
impl DependencyProbe for RedisProbe {
    async fn probe(&self, ctx: &ProbeContext) -> ProbeOutcome {
        let Some(client) = &self.client else {
            return ProbeOutcome::unhealthy(NOT_CONFIGURED);
        };

        match ctx.run(self.ping(client)).await {
            Some(Ok(reply)) if reply == "PONG" => ProbeOutcome::Healthy,
            Some(Ok(_)) => ProbeOutcome::unhealthy("unexpected PING reply"),
            Some(Err(e)) => {
                warn!(dependency = %ctx.dependency, error = %e, "cache probe failed");
                ProbeOutcome::unhealthy(describe(&e))
            }
            None => ProbeOutcome::TimedOut,
        }
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}

fn describe(err: &RedisError) -> &'static str {
    if err.is_connection_refusal() {
        "connection refused"
    } else if err.kind() == ErrorKind::AuthenticationFailed {
        "authentication failed"
    } else if err.is_timeout() {
        "connection timed out"
    } else if err.is_io_error() || err.is_connection_dropped() {
        "connection failed"
    } else {
        "command failed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::DependencyName;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    fn ctx(deadline: Duration) -> ProbeContext {
        ProbeContext::new(DependencyName::from("redis"), Instant::now() + deadline)
    }

    #[tokio::test]
    async fn test_unconfigured_reports_not_configured() {
        let probe = RedisProbe::from_endpoint(None).unwrap();

        let outcome = probe.probe(&ctx(Duration::from_secs(1))).await;
        assert_eq!(outcome.to_string(), "unhealthy: not configured");
    }

    #[test]
    fn test_rejects_malformed_url() {
        let err = RedisProbe::open("ftp://cache:21").unwrap_err();
        assert!(matches!(err, ProbeSetupError::InvalidEndpoint("redis")));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy_without_leaking_credentials() {
        let probe = RedisProbe::open("redis://:hunter2@127.0.0.1:1").unwrap();

        let outcome = probe.probe(&ctx(Duration::from_millis(500))).await;

        assert!(!outcome.is_healthy());
        assert!(!outcome.to_string().contains("hunter2"));
    }

    /// Minimal RESP server answering `PING` with `PONG` and anything else
    /// with `OK`. Returns its url and the number of accepted connections.
    async fn fake_redis() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        while let Some((command, used)) = parse_command(&buf) {
                            buf.drain(..used);
                            let reply: &[u8] = if command.eq_ignore_ascii_case("PING") {
                                b"+PONG\r\n"
                            } else {
                                b"+OK\r\n"
                            };
                            if socket.write_all(reply).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        (format!("redis://{}", addr), accepted)
    }

    fn parse_command(buf: &[u8]) -> Option<(String, usize)> {
        let mut pos = 0;
        let count: usize = read_line(buf, &mut pos)?.strip_prefix('*')?.parse().ok()?;
        let mut command = String::new();
        for i in 0..count {
            let len: usize = read_line(buf, &mut pos)?.strip_prefix('$')?.parse().ok()?;
            let end = pos + len;
            if buf.len() < end + 2 {
                return None;
            }
            if i == 0 {
                command = String::from_utf8_lossy(&buf[pos..end]).into_owned();
            }
            pos = end + 2;
        }
        Some((command, pos))
    }

    fn read_line<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a str> {
        let rest = &buf[*pos..];
        let end = rest.windows(2).position(|w| w == b"\r\n")?;
        let line = std::str::from_utf8(&rest[..end]).ok()?;
        *pos += end + 2;
        Some(line)
    }

    #[tokio::test]
    async fn test_checks_share_one_connection() {
        let (url, accepted) = fake_redis().await;
        let probe = RedisProbe::open(&url).unwrap();

        for _ in 0..5 {
            let outcome = probe.probe(&ctx(Duration::from_secs(2))).await;
            assert_eq!(outcome, ProbeOutcome::Healthy);
        }

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_one_connection() {
        let (url, accepted) = fake_redis().await;
        let probe = RedisProbe::open(&url).unwrap();

        let outcomes = futures::future::join_all(
            (0..10).map(|_| {
                let probe = probe.clone();
                async move { probe.probe(&ctx(Duration::from_secs(2))).await }
            }),
        )
        .await;

        assert!(outcomes.iter().all(ProbeOutcome::is_healthy));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
