//! Timed scan sessions.
//!
//! [`ScanController`] starts and stops the radio scan and arms an optional
//! deferred stop. Two things can end a scan: an explicit [`stop_scan`] and the
//! timeout. They race, and a timeout armed for an old scan may fire while a
//! newer scan is running. Every start and explicit stop advances the session
//! counter; the deferred task captures the session it was armed for and only
//! acts if that session is still current when it wakes up. The task itself is
//! never cancelled.
//!
//! Driver commands are serialized through one async mutex that also holds the
//! scan phase, so the staleness check and the stop command of a deferred task
//! cannot interleave with a newer start.
//!
//! [`stop_scan`]: ScanController::stop_scan

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::driver::{Advertisement, DiscoveryHandler, RadioDriver};
use crate::error::ScanError;
use crate::events::{EventSink, ScanEvent};
use crate::registry::DiscoveryRegistry;
use crate::session::{SessionCounter, SessionId};
use crate::types::{RadioState, ScanRequest, ScanStatus};

/// Where the controller is in its `Idle -> Scanning -> Idle` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    Idle,
    Scanning {
        session: SessionId,
        started_at_utc: DateTime<Utc>,
        timeout_secs: u32,
    },
}

/// Owns the session counter and drives the radio.
///
/// Cloning is cheap; clones share the same sessions and driver.
#[derive(Clone)]
pub struct ScanController {
    inner: Arc<Inner>,
}

struct Inner {
    driver: Arc<dyn RadioDriver>,
    registry: Arc<DiscoveryRegistry>,
    sink: Arc<dyn EventSink>,
    sessions: Arc<SessionCounter>,
    phase: Mutex<ScanPhase>,
}

impl ScanController {
    /// Create a controller feeding discoveries into `registry` and emitting
    /// scan lifecycle events to `sink`.
    pub fn new(
        driver: Arc<dyn RadioDriver>,
        registry: Arc<DiscoveryRegistry>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                driver,
                registry,
                sink,
                sessions: Arc::new(SessionCounter::new()),
                phase: Mutex::new(ScanPhase::Idle),
            }),
        }
    }

    /// Start a scan.
    ///
    /// Advances the session before the radio is touched, so discoveries and
    /// timers from earlier scans already see themselves as stale. Requesting
    /// service filters from a radio that cannot filter only logs a warning;
    /// the scan runs unfiltered. With a non-zero `timeout_secs` a deferred
    /// stop is armed for the new session. Returns as soon as the radio has
    /// accepted the start command.
    ///
    /// Starting while a scan is running is not an error; the radio is simply
    /// restarted under the new session. If the radio rejects the restart,
    /// the scan that was running is stopped as well and the controller is idle.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::DriverUnavailable`] if the adapter is off or
    /// absent and [`ScanError::DriverCommandFailed`] if the radio rejected the
    /// start command.
    pub async fn start_scan(&self, mut request: ScanRequest) -> Result<SessionId, ScanError> {
        let mut phase = self.inner.phase.lock().await;
        let session = self.inner.sessions.advance();

        if request.is_filtered() && !self.inner.driver.supports_service_filter() {
            warn!(
                session = %session,
                filters = request.service_uuids.len(),
                "radio cannot filter by service, scanning unfiltered"
            );
            request.service_uuids.clear();
        }

        let handler = Arc::new(SessionScopedHandler {
            session,
            sessions: Arc::clone(&self.inner.sessions),
            registry: Arc::clone(&self.inner.registry),
        });

        if let Err(err) = self.inner.driver.start_scan(&request, handler).await {
            warn!(session = %session, error = %err, "scan start rejected by radio");
            // The previous scan's timeout is stale now, so nothing else would stop it.
            if let ScanPhase::Scanning { session: running, .. } =
                std::mem::replace(&mut *phase, ScanPhase::Idle)
            {
                self.inner.stop_superseded(running).await;
            }
            return Err(err.into());
        }

        *phase = ScanPhase::Scanning {
            session,
            started_at_utc: Utc::now(),
            timeout_secs: request.timeout_secs,
        };
        info!(
            session = %session,
            timeout_secs = request.timeout_secs,
            filters = request.service_uuids.len(),
            "scan started"
        );

        if request.timeout_secs > 0 {
            self.arm_deferred_stop(session, Duration::from_secs(u64::from(request.timeout_secs)));
        }

        Ok(session)
    }

    /// Stop the running scan.
    ///
    /// Advances the session first, which turns any armed deferred stop into a
    /// no-op whether or not it has fired yet. Stopping an idle radio is fine.
    /// No [`ScanEvent::ScanStopped`] is emitted here; only the timeout path
    /// emits it.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::DriverCommandFailed`] if the radio rejected the
    /// stop command while scanning.
    pub async fn stop_scan(&self) -> Result<(), ScanError> {
        let mut phase = self.inner.phase.lock().await;
        let session = self.inner.sessions.advance();
        if let ScanPhase::Scanning { session: running, .. } =
            std::mem::replace(&mut *phase, ScanPhase::Idle)
        {
            debug!(running = %running, "stopping running scan");
        }

        match self.inner.driver.stop_scan().await {
            Ok(()) => {
                info!(session = %session, "scan stopped");
                Ok(())
            }
            Err(err) if err.leaves_radio_idle() => {
                debug!(session = %session, error = %err, "stop on idle radio ignored");
                Ok(())
            }
            Err(err) => {
                warn!(session = %session, error = %err, "scan stop rejected by radio");
                Err(err.into())
            }
        }
    }

    /// Current scan state.
    pub async fn status(&self) -> ScanStatus {
        let phase = *self.inner.phase.lock().await;
        let session_id = self.inner.sessions.current();
        match phase {
            ScanPhase::Idle => ScanStatus {
                scanning: false,
                session_id,
                started_at_utc: None,
                timeout_secs: None,
            },
            ScanPhase::Scanning {
                started_at_utc,
                timeout_secs,
                ..
            } => ScanStatus {
                scanning: true,
                session_id,
                started_at_utc: Some(started_at_utc),
                timeout_secs: Some(timeout_secs),
            },
        }
    }

    /// Start time of `session`, if that session is the scan currently running.
    pub async fn started_at(&self, session: SessionId) -> Option<DateTime<Utc>> {
        match *self.inner.phase.lock().await {
            ScanPhase::Scanning {
                session: running,
                started_at_utc,
                ..
            } if running == session => Some(started_at_utc),
            _ => None,
        }
    }

    /// Whether a scan is running.
    pub async fn is_scanning(&self) -> bool {
        matches!(*self.inner.phase.lock().await, ScanPhase::Scanning { .. })
    }

    /// Latest session handed out.
    #[must_use]
    pub fn current_session(&self) -> SessionId {
        self.inner.sessions.current()
    }

    /// Adapter power state.
    pub async fn radio_state(&self) -> RadioState {
        self.inner.driver.state().await
    }

    /// Registry the controller feeds.
    #[must_use]
    pub fn registry(&self) -> &Arc<DiscoveryRegistry> {
        &self.inner.registry
    }

    fn arm_deferred_stop(&self, session: SessionId, after: Duration) {
        let inner = Arc::clone(&self.inner);
        let span = info_span!("deferred_stop", session = %session);
        debug!(session = %session, after_secs = after.as_secs(), "deferred stop armed");

        tokio::spawn(
            async move {
                tokio::time::sleep(after).await;
                inner.stop_if_current(session).await;
            }
            .instrument(span),
        );
    }
}

impl Inner {
    /// Stop the radio scan left over from `running` after a failed restart.
    async fn stop_superseded(&self, running: SessionId) {
        match self.driver.stop_scan().await {
            Ok(()) => info!(running = %running, "previous scan stopped after failed restart"),
            Err(err) if err.leaves_radio_idle() => {
                debug!(running = %running, error = %err, "previous scan already idle");
            }
            Err(err) => {
                warn!(running = %running, error = %err, "failed to stop previous scan");
            }
        }
    }

    /// Timeout path: stop and announce, but only for the session we were armed for.
    async fn stop_if_current(&self, session: SessionId) {
        let mut phase = self.phase.lock().await;

        if !self.sessions.is_current(session) {
            debug!(
                current = %self.sessions.current(),
                "timeout for superseded session ignored"
            );
            return;
        }

        if self.driver.state().await == RadioState::On {
            if let Err(err) = self.driver.stop_scan().await {
                warn!(error = %err, "stop after timeout failed");
            }
        }

        *phase = ScanPhase::Idle;
        info!("scan stopped after timeout");
        self.sink.emit(ScanEvent::ScanStopped {
            session_id: session,
        });
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("session", &self.inner.sessions.current())
            .finish_non_exhaustive()
    }
}

/// Forwards advertisements to the registry while its session is current.
///
/// Drivers may deliver a few callbacks after a stop or restart; those belong
/// to a session that no longer exists and are dropped.
struct SessionScopedHandler {
    session: SessionId,
    sessions: Arc<SessionCounter>,
    registry: Arc<DiscoveryRegistry>,
}

impl DiscoveryHandler for SessionScopedHandler {
    fn on_discovered(&self, advertisement: Advertisement) {
        if self.sessions.is_current(self.session) {
            self.registry.on_discovered(advertisement);
        } else {
            debug!(
                session = %self.session,
                identity = %advertisement.identity,
                "advertisement from superseded session dropped"
            );
        }
    }
}
