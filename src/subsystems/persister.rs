use bon::Builder;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::errors::CancelledByShutdown;
use tokio_graceful_shutdown::{FutureExt, SubsystemHandle};
use tracing::{error, info};

use crate::models::types::ScrapedRecord;
use crate::services::persister::{PersistOutcome, Persister};

#[derive(Builder)]
pub struct PersistSubsystem {
    pub(crate) persister: Persister,
    pub(crate) receiver: mpsc::Receiver<ScrapedRecord>,
}

impl PersistSubsystem {
    pub async fn run(self, subsys: SubsystemHandle) -> std::io::Result<()> {
        info!("Starting persist subsystem");

        let mut persister = self.persister;
        let mut rx = self.receiver;
        let fut = async {
            let (mut inserted, mut duplicates, mut failed) = (0u64, 0u64, 0u64);
            while let Some(record) = rx.recv().await {
                match persister.persist(&record).await {
                    Ok(PersistOutcome::Inserted(_)) => inserted += 1,
                    Ok(PersistOutcome::Duplicate(_)) => duplicates += 1,
                    Err(e) => {
                        error!(title = record.title(), url = record.source_url(), error = %e, "persist: save failed");
                        failed += 1;
                    }
                }
            }
            persister.flush().await;
            info!(inserted, duplicates, failed, "persist: channel closed");
            Ok::<(), std::io::Error>(())
        };

        match fut.cancel_on_shutdown(&subsys).await {
            Ok(Ok(())) => {
                info!("Persist subsystem finished");
                subsys.request_shutdown();
            }
            Ok(Err(e)) => return Err(e),
            Err(CancelledByShutdown) => info!("Persist subsystem cancelled by shutdown"),
        }

        Ok(())
    }
}
