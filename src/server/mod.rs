//! HTTP surface for the session: the produced interface over JSON.
//!
//! | Route | Method | Description |
//! |-------|--------|-------------|
//! | `/health` | GET | Liveness and wallet presence |
//! | `/state` | GET | Full session snapshot |
//! | `/connect` | POST | Establish (or re-validate) the binding |
//! | `/entries` | GET | Cached registry entries |
//! | `/entries` | POST | Register `{ownerName, carModel}` |
//! | `/refresh` | POST | Reload the registry |
//! | `/scrolls`, `/scroll/*path` | GET | Registry namespace as scrolls |

mod routes;

pub use routes::{create_router, create_router_with_name, ApiError, AppState};

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::ledger::Connector;
use crate::runtime::Shutdown;
use crate::session::SessionManager;
use crate::wallet::Wallet;

/// Serve until `shutdown` fires.
pub async fn serve<W, C>(session: Arc<SessionManager<W, C>>, addr: SocketAddr, shutdown: Shutdown) -> anyhow::Result<()>
where
    W: Wallet + 'static,
    C: Connector + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "registry server listening");
    axum::serve(listener, create_router(session))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;
    Ok(())
}
