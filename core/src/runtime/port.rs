use tokio::net::TcpListener;

use crate::error::RuntimeError;

/// Resolve the port for a new process: `0` asks the OS for a free one,
/// anything else must currently be free.
pub async fn allocate_port(requested: u16) -> Result<u16, RuntimeError> {
    if requested == 0 {
        return find_free_port().await;
    }
    if !is_port_free(requested).await {
        return Err(RuntimeError::PortInUse(requested));
    }
    Ok(requested)
}

pub async fn find_free_port() -> Result<u16, RuntimeError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(RuntimeError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(RuntimeError::PortAllocation)?
        .port();
    Ok(port)
}

pub async fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).await.is_ok()
}
