//! Configuration and limits for the WebSocket engine.

use crate::error::{Error, Result};
use crate::protocol::frame::MAX_HEADER_SIZE;

/// Resource limits for incoming frames and messages.
///
/// These limits prevent resource exhaustion attacks and ensure
/// bounded memory usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of a complete text message in bytes.
    ///
    /// Checked against the running total while fragments arrive, whether or
    /// not the message is being buffered.
    ///
    /// Default: 64 KB (65536)
    pub max_text_message_size: usize,

    /// Maximum size of a complete binary message in bytes.
    ///
    /// Default: 64 KB (65536)
    pub max_binary_message_size: usize,

    /// Maximum number of fragments in a single message.
    ///
    /// Default: 128
    pub max_fragment_count: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_text_message_size: 64 * 1024,
            max_binary_message_size: 64 * 1024,
            max_fragment_count: 128,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(
        max_frame_size: usize,
        max_text_message_size: usize,
        max_binary_message_size: usize,
        max_fragment_count: usize,
    ) -> Self {
        Self {
            max_frame_size,
            max_text_message_size,
            max_binary_message_size,
            max_fragment_count,
        }
    }

    /// Limits suitable for small embedded systems.
    ///
    /// - Max frame: 64 KB
    /// - Max text / binary message: 256 KB
    /// - Max fragments: 16
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_text_message_size: 256 * 1024,
            max_binary_message_size: 256 * 1024,
            max_fragment_count: 16,
        }
    }

    /// Set the maximum frame payload size.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the maximum text message size.
    #[must_use]
    pub const fn with_max_text_message_size(mut self, size: usize) -> Self {
        self.max_text_message_size = size;
        self
    }

    /// Set the maximum binary message size.
    #[must_use]
    pub const fn with_max_binary_message_size(mut self, size: usize) -> Self {
        self.max_binary_message_size = size;
        self
    }

    /// Validate that a text message of `size` bytes is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_text_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_text_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_text_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a binary message of `size` bytes is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_binary_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_binary_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_binary_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that frame size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: usize) -> Result<()> {
        if size > self.max_frame_size {
            Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that fragment count is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFragments`] if `count` exceeds the configured maximum.
    pub const fn check_fragment_count(&self, count: usize) -> Result<()> {
        if count > self.max_fragment_count {
            Err(Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            })
        } else {
            Ok(())
        }
    }
}

/// WebSocket engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource limits for incoming data.
    pub limits: Limits,

    /// Largest chunk the write queue hands to the transport in one write.
    ///
    /// Frames bigger than this are drained over several writes.
    ///
    /// Default: 2 KB (2048)
    pub output_buffer_size: usize,

    /// Fragment size for outgoing messages (in bytes).
    ///
    /// Messages sent through a [`Session`](crate::Session) that are larger
    /// than this are split into CONTINUATION frames.
    ///
    /// Default: 16 KB (16 * 1024)
    pub fragment_size: usize,

    /// Read buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub read_buffer_size: usize,

    /// Accept unmasked frames from clients (server only).
    ///
    /// RFC 6455 requires clients to mask all frames. Setting this to `true`
    /// breaks that rule but may be useful for testing.
    ///
    /// Default: false
    pub accept_unmasked_frames: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            output_buffer_size: 2048,
            fragment_size: 16 * 1024,
            read_buffer_size: 8192,
            accept_unmasked_frames: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the outbound chunk size.
    #[must_use]
    pub const fn with_output_buffer_size(mut self, size: usize) -> Self {
        self.output_buffer_size = size;
        self
    }

    /// Set fragment size for outgoing messages.
    #[must_use]
    pub const fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size;
        self
    }

    /// Set read buffer size.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Accept unmasked client frames (testing only).
    #[must_use]
    pub const fn with_accept_unmasked_frames(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the output buffer cannot hold a
    /// maximal frame header, or if a size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.output_buffer_size < MAX_HEADER_SIZE {
            return Err(Error::InvalidConfig(format!(
                "output_buffer_size must be at least {MAX_HEADER_SIZE} bytes, got {}",
                self.output_buffer_size
            )));
        }
        if self.fragment_size == 0 {
            return Err(Error::InvalidConfig("fragment_size must be non-zero".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "read_buffer_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(limits.max_text_message_size, 64 * 1024);
        assert_eq!(limits.max_binary_message_size, 64 * 1024);
        assert_eq!(limits.max_fragment_count, 128);
    }

    #[test]
    fn test_limits_checks() {
        let limits = Limits::new(100, 10, 20, 2);
        assert!(limits.check_frame_size(100).is_ok());
        assert!(limits.check_frame_size(101).is_err());
        assert!(limits.check_text_message_size(10).is_ok());
        assert!(matches!(
            limits.check_text_message_size(11),
            Err(Error::MessageTooLarge { size: 11, max: 10 })
        ));
        assert!(limits.check_binary_message_size(20).is_ok());
        assert!(limits.check_binary_message_size(21).is_err());
        assert!(limits.check_fragment_count(2).is_ok());
        assert!(limits.check_fragment_count(3).is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.output_buffer_size, 2048);
        assert_eq!(config.fragment_size, 16 * 1024);
        assert!(!config.accept_unmasked_frames);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_limits(Limits::embedded())
            .with_output_buffer_size(512)
            .with_fragment_size(4096)
            .with_read_buffer_size(1024)
            .with_accept_unmasked_frames(true);

        assert!(config.accept_unmasked_frames);
        assert_eq!(config.output_buffer_size, 512);
        assert_eq!(config.fragment_size, 4096);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.limits.max_frame_size, 64 * 1024);

        let limits = Limits::default().with_max_text_message_size(10);
        assert_eq!(limits.max_text_message_size, 10);
        assert!(limits.check_text_message_size(11).is_err());
        assert_eq!(limits.max_binary_message_size, 64 * 1024);
    }

    #[test]
    fn test_config_validate_rejects_tiny_output_buffer() {
        let config = Config::new().with_output_buffer_size(8);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config::new().with_fragment_size(0);
        assert!(config.validate().is_err());
    }
}
