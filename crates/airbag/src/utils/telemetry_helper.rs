// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Names and switches attached to the log events of a single strategy instance.
#[derive(Debug, Clone)]
pub(crate) struct TelemetryHelper {
    #[cfg(any(feature = "logs", test))]
    pub(crate) pipeline_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "logs", test))]
    pub(crate) strategy_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "logs", test))]
    pub(crate) logs_enabled: bool,
}
