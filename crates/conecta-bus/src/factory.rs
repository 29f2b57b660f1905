// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the messaging backends named in configuration.

use std::sync::Arc;

use conecta_config::model::{BrokerConfig, BrokerKind, RedisConfig};
use tracing::info;

use crate::broker::{Broker, ChannelBroker};
use crate::cache::{MemoryCache, ResultCache};
use crate::error::BusError;
use crate::pubsub::{LocalPubSub, PubSub};

/// Pub/sub and result cache, shared or in-process.
pub struct Messaging {
    pub pubsub: Arc<dyn PubSub>,
    pub cache: Arc<dyn ResultCache>,
}

pub async fn connect_broker(config: &BrokerConfig) -> Result<Arc<dyn Broker>, BusError> {
    match config.kind {
        BrokerKind::Memory => {
            info!("using in-process broker");
            Ok(Arc::new(ChannelBroker::new()))
        }
        #[cfg(feature = "amqp")]
        BrokerKind::Amqp => {
            let broker = crate::broker::AmqpBroker::connect(&config.url, config.prefetch).await?;
            Ok(Arc::new(broker))
        }
        #[cfg(not(feature = "amqp"))]
        BrokerKind::Amqp => Err(BusError::Connection(
            "built without AMQP support".to_string(),
        )),
    }
}

pub async fn connect_messaging(config: &RedisConfig) -> Result<Messaging, BusError> {
    match config.url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => {
            let pubsub = crate::pubsub::RedisPubSub::connect(url).await?;
            let cache = crate::cache::RedisCache::new(pubsub.connection());
            Ok(Messaging {
                pubsub: Arc::new(pubsub),
                cache: Arc::new(cache),
            })
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => Err(BusError::Connection(
            "built without Redis support".to_string(),
        )),
        None => {
            info!("no Redis configured, using in-process pub/sub and cache");
            Ok(Messaging {
                pubsub: Arc::new(LocalPubSub::new()),
                cache: Arc::new(MemoryCache::new()),
            })
        }
    }
}
