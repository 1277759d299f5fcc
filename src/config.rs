// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_bind_addr: String,
    pub sse_heartbeat: Duration,
    pub sse_poll: Duration,
    /// Upper bound on rows returned by one `/v1/rows` request.
    pub page_limit: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let http_bind_addr = std::env::var("PROXY_HISTORY_HTTP_ADDR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "127.0.0.1:9011".to_string());
        let sse_heartbeat =
            Duration::from_secs(env_u64("PROXY_HISTORY_SSE_HEARTBEAT_SECS", 20).max(1));
        let sse_poll =
            Duration::from_millis(env_u64("PROXY_HISTORY_SSE_POLL_MILLIS", 5000).clamp(10, 60_000));
        let page_limit = env_u64("PROXY_HISTORY_PAGE_LIMIT", 500).clamp(1, 100_000) as usize;
        Self {
            http_bind_addr,
            sse_heartbeat,
            sse_poll,
            page_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:9011".to_string(),
            sse_heartbeat: Duration::from_secs(20),
            sse_poll: Duration::from_secs(5),
            page_limit: 500,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
