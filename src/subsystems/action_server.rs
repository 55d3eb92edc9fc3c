use bon::Builder;
use tokio::net::TcpListener;
use tokio_graceful_shutdown::SubsystemHandle;
use tracing::info;

use crate::actions::server::{ActionServerState, router};

#[derive(Builder)]
pub struct ActionServerSubsystem {
    pub(crate) bind: String,
    pub(crate) state: ActionServerState,
}

impl ActionServerSubsystem {
    pub async fn run(self, subsys: SubsystemHandle) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.bind).await?;
        info!(addr = %listener.local_addr()?, "Action server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move { subsys.on_shutdown_requested().await })
            .await?;

        info!("Action server stopped");
        Ok(())
    }
}
