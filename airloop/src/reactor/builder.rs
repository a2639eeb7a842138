use super::Reactor;

/// Events reported by a single wait, unless configured otherwise.
pub const DEFAULT_BATCH_CAPACITY: usize = 16;

/// Shortest interval the loop arms its timer for, in seconds.
pub const DEFAULT_MIN_ARM_DELAY: f64 = 1e-6;

/// Builder for configuring and creating a [`Reactor`].
///
/// # Examples
///
/// ```rust
/// use airloop::ReactorBuilder;
///
/// let reactor = ReactorBuilder::new()
///     .batch_capacity(32)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReactorBuilder {
    /// Maximum number of readiness events handled per iteration.
    batch_capacity: usize,

    /// Floor applied to the interval timer so every wait is bounded.
    min_arm_delay: f64,
}

impl ReactorBuilder {
    /// Creates a new `ReactorBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            min_arm_delay: DEFAULT_MIN_ARM_DELAY,
        }
    }

    /// Sets how many ready descriptors one wait may report.
    ///
    /// Descriptors ready beyond this bound are reported by the next wait.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn batch_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "batch_capacity must be > 0");

        self.batch_capacity = n;
        self
    }

    /// Sets the shortest delay the interval timer is armed for.
    ///
    /// A deadline that is due (or rounds to zero) is armed with this delay
    /// instead. Values under one microsecond are raised to one microsecond.
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative or not finite.
    pub fn min_arm_delay(mut self, seconds: f64) -> Self {
        assert!(
            seconds.is_finite() && seconds >= 0.0,
            "min_arm_delay must be finite and >= 0"
        );

        self.min_arm_delay = seconds;
        self
    }

    /// Builds the reactor.
    ///
    /// The readiness multiplexer is not created yet; see
    /// [`Reactor::init`].
    pub fn build(self) -> Reactor {
        Reactor::with_config(self.batch_capacity, self.min_arm_delay)
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
