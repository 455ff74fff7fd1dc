// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Testcontainers setup for Redis and MongoDB.

use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};

/// Create a vanilla Redis container.
pub fn redis_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));
    docker.run(image)
}

/// Get the Redis URL for a container.
pub fn redis_url(container: &Container<'_, GenericImage>) -> String {
    let port = container.get_host_port_ipv4(6379);
    format!("redis://127.0.0.1:{}", port)
}

/// Create a single-node MongoDB container.
pub fn mongo_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("mongo", "7")
        .with_exposed_port(27017)
        .with_wait_for(WaitFor::message_on_stdout("Waiting for connections"));
    docker.run(image)
}

/// Get the MongoDB connection string for a container.
pub fn mongo_url(container: &Container<'_, GenericImage>) -> String {
    let port = container.get_host_port_ipv4(27017);
    format!("mongodb://127.0.0.1:{}", port)
}

/// Both backends, kept alive for the test's duration.
pub struct TestBackends<'a> {
    #[allow(dead_code)] // Kept alive for container lifetime
    redis: Container<'a, GenericImage>,
    #[allow(dead_code)]
    mongo: Container<'a, GenericImage>,
    pub redis_url: String,
    pub mongo_url: String,
}

impl<'a> TestBackends<'a> {
    pub fn start(docker: &'a Cli) -> Self {
        let redis = redis_container(docker);
        let mongo = mongo_container(docker);
        let redis_url = redis_url(&redis);
        let mongo_url = mongo_url(&mongo);
        Self {
            redis,
            mongo,
            redis_url,
            mongo_url,
        }
    }

    /// Raw Redis GET, bypassing the crate.
    pub async fn redis_get(&self, key: &str) -> redis::RedisResult<Option<String>> {
        use redis::AsyncCommands;
        let client = redis::Client::open(self.redis_url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }

    /// Raw Redis SET, bypassing the crate.
    pub async fn redis_set(&self, key: &str, value: &str) -> redis::RedisResult<()> {
        use redis::AsyncCommands;
        let client = redis::Client::open(self.redis_url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        conn.set(key, value).await
    }

    /// Number of keys in the Redis database.
    pub async fn redis_dbsize(&self) -> redis::RedisResult<usize> {
        let client = redis::Client::open(self.redis_url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("DBSIZE").query_async(&mut conn).await
    }
}
