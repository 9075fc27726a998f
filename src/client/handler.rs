use log::info;
use std::net::SocketAddr;
use tokio::net::TcpStream;

use crate::client::registry::shared_writer;
use crate::client::session::{Session, SessionContext};
use crate::error::handlers::handle_error;

/// Handles one producer connection using Tokio async runtime.
///
/// - Splits the stream so the registry can broadcast on the write half.
/// - Runs the session protocol until it terminates.
/// - Logs how the session ended; faults never leave this connection.
pub async fn handle_client(stream: TcpStream, client_addr: SocketAddr, ctx: SessionContext) {
    let peer = client_addr.to_string();
    let (read_half, write_half) = stream.into_split();

    let session = Session::new(read_half, shared_writer(write_half), peer.clone(), ctx);

    match session.run().await {
        Ok(end) => info!("Client {} {}", peer, end),
        Err(e) => handle_error(&peer, &e),
    }
}
