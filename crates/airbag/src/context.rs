// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use tick::Clock;

pub(crate) const DEFAULT_PIPELINE_NAME: &str = "default";

/// Shared configuration and dependencies for the components of one resilience pipeline.
///
/// Pass a single `ResilienceContext` to the hedging engine and the fault injector of a
/// pipeline to share a clock and logging configuration.
///
/// # Examples
///
/// ```rust
/// use airbag::ResilienceContext;
/// use tick::Clock;
///
/// # fn example(clock: &Clock) {
/// let context = ResilienceContext::new(clock).name("catalog_client");
/// # let _ = context;
/// # }
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ResilienceContext {
    clock: Clock,
    name: Cow<'static, str>,
    logs_enabled: bool,
}

impl ResilienceContext {
    /// Create a context with a clock. Initializes with `name = "default"`.
    pub fn new(clock: impl AsRef<Clock>) -> Self {
        Self {
            clock: clock.as_ref().clone(),
            name: Cow::Borrowed(DEFAULT_PIPELINE_NAME),
            logs_enabled: false,
        }
    }

    /// Set the pipeline name used to correlate log events. Prefer `snake_case`.
    #[must_use]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable structured logging for resilience events.
    #[must_use]
    #[cfg(any(feature = "logs", test))]
    pub fn enable_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Returns the clock every component of this pipeline waits on.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "unused when logs are not compiled in")
    )]
    pub(crate) fn create_telemetry(&self, strategy_name: Cow<'static, str>) -> crate::utils::TelemetryHelper {
        crate::utils::TelemetryHelper {
            #[cfg(any(feature = "logs", test))]
            pipeline_name: self.name.clone(),
            #[cfg(any(feature = "logs", test))]
            strategy_name,
            #[cfg(any(feature = "logs", test))]
            logs_enabled: self.logs_enabled,
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_pipeline_name() {
        let ctx = ResilienceContext::new(Clock::new_frozen());
        let telemetry = ctx.create_telemetry("hedging".into());

        assert_eq!(telemetry.pipeline_name.as_ref(), DEFAULT_PIPELINE_NAME);
        assert_eq!(telemetry.strategy_name.as_ref(), "hedging");
        assert!(!telemetry.logs_enabled);
    }

    #[test]
    fn name_accepts_owned_values() {
        let ctx = ResilienceContext::new(Clock::new_frozen()).name(String::from("orders"));
        let telemetry = ctx.create_telemetry("chaos".into());

        assert_eq!(telemetry.pipeline_name.as_ref(), "orders");
        assert!(matches!(telemetry.pipeline_name, Cow::Owned(_)));
    }

    #[test]
    fn enable_logs_propagates_to_telemetry() {
        let ctx = ResilienceContext::new(Clock::new_frozen()).enable_logs();

        assert!(ctx.create_telemetry("chaos".into()).logs_enabled);
        assert!(ctx.clone().create_telemetry("hedging".into()).logs_enabled);
    }

    #[test]
    fn clock_is_shared() {
        let clock = Clock::new_frozen();
        let ctx = ResilienceContext::new(&clock);

        assert_eq!(ctx.clock().system_time(), clock.system_time());
    }
}
