use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::scheduler::policy::should_show;
use crate::scheduler::state::PopupState;
use crate::store::TrackingStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

/// One scroll -> delay -> decision pipeline per page session.
///
/// The whole pipeline lives on a single task: the store read and the
/// subsequent write are sequenced here, so there is no shared mutable state
/// beyond the session's `PopupState`. Cancelling the token at any point
/// tears the pipeline down without residual side effects.
pub(super) async fn session_loop(
    session_id: String,
    fingerprint: String,
    config: SchedulerConfig,
    store: Arc<dyn TrackingStore>,
    state: Arc<Mutex<PopupState>>,
    show_tx: Arc<watch::Sender<bool>>,
    mut scroll_rx: watch::Receiver<f64>,
    cancel_token: CancellationToken,
) {
    // Idle: wait for the first scroll past the threshold. The arm transition
    // is sticky; once taken, this loop never runs again for the session.
    loop {
        if *scroll_rx.borrow_and_update() > config.scroll_threshold_px {
            break;
        }

        tokio::select! {
            changed = scroll_rx.changed() => {
                if changed.is_err() {
                    // Scroll source went away before anyone scrolled
                    log_info!("scroll source closed while idle, session {session_id}");
                    state.lock().await.suppress();
                    return;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("session {session_id} torn down while idle");
                return;
            }
        }
    }

    state.lock().await.arm(Utc::now());
    log_info!("session {session_id} armed, deciding in {}ms", config.arm_delay_ms);

    // Armed: the delay timer. Teardown here cancels the pending decision and
    // leaves the store untouched.
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(config.arm_delay_ms)) => {}
        _ = cancel_token.cancelled() => {
            log_info!("session {session_id} torn down before decision");
            return;
        }
    }

    state.lock().await.begin_decision();

    let now = Utc::now();
    let show = match store.latest_for_fingerprint(&fingerprint).await {
        Ok(record) => should_show(record.as_ref(), now, config.cooldown_ms),
        Err(err) => {
            // Best effort: a failed read suppresses silently, no retry
            log_error!("tracking read failed for session {session_id}: {err:?}");
            false
        }
    };

    if !show {
        log_info!("session {session_id} suppressed");
        state.lock().await.suppress();
        return;
    }

    state.lock().await.show(now);
    if show_tx.send(true).is_err() {
        log_warn!("show signal has no receivers, session {session_id}");
    }

    // Fire-and-forget: a failed write is logged and the popup stays shown
    if let Err(err) = store.record_shown(&fingerprint, now).await {
        log_error!("tracking write failed for session {session_id} (popup stays shown): {err:?}");
    }
}
