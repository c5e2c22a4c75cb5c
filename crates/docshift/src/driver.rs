//! Process-level handling of a run outcome
//!
//! Maps a [`RunOutcome`] onto log output, an operator notification on
//! failure, and the process exit code.

use tracing::{error, info, warn};

use crate::notify::Notifier;
use crate::pipeline::RunOutcome;

/// Exit code of a successful or empty run.
pub const SUCCESS_EXIT_CODE: u8 = 0;

/// Exit code of any failed run.
pub const FAILURE_EXIT_CODE: u8 = 43;

/// Report the outcome and return the exit code
///
/// A failure is logged once at ERROR and produces exactly one notification
/// attempt. If the notification itself fails, that is logged at WARN and the
/// run still exits with [`FAILURE_EXIT_CODE`].
pub async fn conclude(outcome: &RunOutcome, notifier: &dyn Notifier) -> u8 {
    match outcome {
        RunOutcome::Loaded(summary) => {
            info!(
                table = %summary.table,
                rows = summary.rows,
                columns = summary.columns.len(),
                "Collection successfully loaded"
            );
            SUCCESS_EXIT_CODE
        },
        RunOutcome::Empty => {
            info!("Run finished with nothing to load");
            SUCCESS_EXIT_CODE
        },
        RunOutcome::Failed(failure) => {
            error!(
                collection = %failure.collection,
                stage = %failure.stage,
                error = ?failure.error,
                "Pipeline run failed: {}", failure.error
            );

            if let Err(e) = notifier.notify(&failure.notice()).await {
                warn!(error = %e, "Failure notification could not be sent");
            }

            FAILURE_EXIT_CODE
        },
    }
}
