use serde::{Deserialize, Serialize};

/// Runtime options for the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Port the WebSocket listener binds to.
    pub port: u16,
    /// Outbound queue depth per connection; frames past it are dropped for
    /// that recipient instead of stalling the room.
    pub queue_capacity: usize,
    /// Leave the sender out of its own room broadcasts.
    pub exclude_sender: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            queue_capacity: 256,
            exclude_sender: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_echo_the_sender() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.queue_capacity, 256);
        assert!(!config.exclude_sender);
    }
}
