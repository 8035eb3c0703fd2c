use crate::{
    dns::DNSPacket,
    error::DnsError,
    zone::{AuthoritativeResponder, ZoneLoader, ZoneRegistry},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

/// Sockets bound for every configured address plus the responder they share
pub struct DnsServer {
    responder: Arc<AuthoritativeResponder>,
    listeners: Vec<(Arc<UdpSocket>, TcpListener)>,
    udp_payload_size: usize,
    tcp_idle_timeout: Duration,
}

impl DnsServer {
    /// Bind a UDP socket and a TCP listener for each registry address
    pub async fn bind(registry: Arc<ZoneRegistry>) -> Result<Self, DnsError> {
        let loader = Arc::new(ZoneLoader::new(Arc::clone(&registry)));
        let responder = Arc::new(AuthoritativeResponder::new(loader));

        let mut listeners = Vec::with_capacity(registry.addresses().len());
        for addr in registry.addresses() {
            let udp = UdpSocket::bind(addr).await?;
            // Same port for TCP, also when the configured port is 0
            let tcp = TcpListener::bind(udp.local_addr()?).await?;
            listeners.push((Arc::new(udp), tcp));
        }

        Ok(Self {
            responder,
            listeners,
            udp_payload_size: registry.udp_payload_size(),
            tcp_idle_timeout: registry.tcp_idle_timeout(),
        })
    }

    /// Addresses actually bound, in configuration order
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|(udp, _)| udp.local_addr().ok())
            .collect()
    }

    pub fn loader(&self) -> Arc<ZoneLoader> {
        Arc::clone(self.responder.loader())
    }

    /// Serve until `shutdown_rx` fires or a fatal zone error occurs.
    ///
    /// A fatal error stops every listener and is returned to the caller,
    /// which is expected to terminate the process.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), DnsError> {
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<DnsError>(1);
        let (stop_tx, _) = broadcast::channel::<()>(1);
        let mut tasks = Vec::with_capacity(self.listeners.len() * 2);

        for (udp, tcp) in self.listeners {
            tasks.push(tokio::spawn(supervise(
                run_udp_server(
                    udp,
                    Arc::clone(&self.responder),
                    self.udp_payload_size,
                    fatal_tx.clone(),
                    stop_tx.subscribe(),
                ),
                fatal_tx.clone(),
            )));
            tasks.push(tokio::spawn(supervise(
                run_tcp_server(
                    tcp,
                    Arc::clone(&self.responder),
                    self.tcp_idle_timeout,
                    fatal_tx.clone(),
                    stop_tx.subscribe(),
                ),
                fatal_tx.clone(),
            )));
        }
        drop(fatal_tx);

        let outcome = wait_for_stop(&mut shutdown_rx, &mut fatal_rx).await;

        let _ = stop_tx.send(());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Listener task failed: {}", e);
            }
        }

        info!("Server shutdown complete");
        outcome
    }
}

/// Resolve on the shutdown signal or on the first fatal error
async fn wait_for_stop(
    shutdown_rx: &mut broadcast::Receiver<()>,
    fatal_rx: &mut mpsc::Receiver<DnsError>,
) -> Result<(), DnsError> {
    tokio::select! {
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
            Ok(())
        }
        fatal = fatal_rx.recv() => {
            match fatal {
                Some(e) => {
                    error!("Fatal error, stopping server: {}", e);
                    Err(e)
                }
                None => Ok(()),
            }
        }
    }
}

/// Await a listener loop; an error exit is reported as fatal
async fn supervise<F>(listener: F, fatal_tx: mpsc::Sender<DnsError>)
where
    F: Future<Output = Result<(), DnsError>>,
{
    if let Err(e) = listener.await {
        error!("Listener stopped with error: {}", e);
        // A full channel already holds an error that will stop the server
        if let Err(mpsc::error::TrySendError::Full(e)) = fatal_tx.try_send(e) {
            warn!("Listener error not reported, server already stopping: {}", e);
        }
    }
}

/// Run UDP server with graceful shutdown support
pub async fn run_udp_server(
    sock: Arc<UdpSocket>,
    responder: Arc<AuthoritativeResponder>,
    payload_size: usize,
    fatal_tx: mpsc::Sender<DnsError>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DnsError> {
    let local_addr = sock.local_addr()?;
    info!("UDP DNS server listening on {}", local_addr);

    let mut buf = vec![0u8; payload_size];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("UDP server on {} shutting down", local_addr);
                break;
            }

            result = sock.recv_from(&mut buf) => {
                let (read_bytes, src_addr) = result?;
                trace!("Received {} bytes over UDP from {}", read_bytes, src_addr);

                let query_data = buf[..read_bytes].to_vec();
                let sock = Arc::clone(&sock);
                let responder = Arc::clone(&responder);
                let fatal_tx = fatal_tx.clone();

                tokio::spawn(async move {
                    match handle_message(responder, query_data).await {
                        Ok(Some(response)) => {
                            if let Err(e) = sock.send_to(&response, src_addr).await {
                                error!("Failed to send UDP response to {}: {}", src_addr, e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => report_failure(&fatal_tx, src_addr, e).await,
                    }
                });
            }
        }
    }

    Ok(())
}

/// Run TCP server with graceful shutdown support
pub async fn run_tcp_server(
    listener: TcpListener,
    responder: Arc<AuthoritativeResponder>,
    idle_timeout: Duration,
    fatal_tx: mpsc::Sender<DnsError>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DnsError> {
    let local_addr = listener.local_addr()?;
    info!("TCP DNS server listening on {}", local_addr);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("TCP server on {} shutting down", local_addr);
                break;
            }

            result = listener.accept() => {
                let (stream, src_addr) = result?;
                let responder = Arc::clone(&responder);
                let fatal_tx = fatal_tx.clone();

                tokio::spawn(async move {
                    if let Err(e) =
                        handle_tcp_connection(stream, src_addr, responder, idle_timeout, fatal_tx).await
                    {
                        debug!("TCP connection error from {}: {}", src_addr, e);
                    }
                });
            }
        }
    }

    Ok(())
}

async fn handle_tcp_connection(
    mut stream: TcpStream,
    src_addr: SocketAddr,
    responder: Arc<AuthoritativeResponder>,
    idle_timeout: Duration,
    fatal_tx: mpsc::Sender<DnsError>,
) -> Result<(), DnsError> {
    let mut length_buf = [0u8; 2];

    loop {
        match timeout(idle_timeout, stream.read_exact(&mut length_buf)).await {
            Err(_) => {
                debug!("Closing idle TCP connection from {}", src_addr);
                break;
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("TCP connection closed by client {}", src_addr);
                break;
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(_)) => {}
        }

        let message_length = u16::from_be_bytes(length_buf) as usize;
        let mut message = vec![0u8; message_length];
        match timeout(idle_timeout, stream.read_exact(&mut message)).await {
            Err(_) => {
                debug!("Timed out reading TCP message from {}", src_addr);
                break;
            }
            Ok(result) => {
                result?;
            }
        }

        match handle_message(Arc::clone(&responder), message).await {
            Ok(Some(response)) => {
                let prefix = tcp_length_prefix(&response)?;
                stream.write_all(&prefix).await?;
                stream.write_all(&response).await?;
                stream.flush().await?;
            }
            Ok(None) => break,
            Err(e) => {
                report_failure(&fatal_tx, src_addr, e).await;
                break;
            }
        }
    }

    Ok(())
}

/// Two-byte big-endian length that frames a message on a TCP stream
fn tcp_length_prefix(message: &[u8]) -> Result<[u8; 2], DnsError> {
    u16::try_from(message.len())
        .map(u16::to_be_bytes)
        .map_err(|_| DnsError::MessageTooLarge(message.len()))
}

/// Decode one wire message, answer it and encode the reply.
///
/// Returns `Ok(None)` for messages that should be dropped without a reply.
pub async fn handle_message(
    responder: Arc<AuthoritativeResponder>,
    message: Vec<u8>,
) -> Result<Option<Vec<u8>>, DnsError> {
    let query = match DNSPacket::parse(&message) {
        Ok(packet) => packet,
        Err(e) => {
            debug!(
                "Dropping malformed message ({} bytes): {}",
                message.len(),
                e
            );
            return Ok(None);
        }
    };

    if !query.is_query() {
        debug!("Dropping response message id={}", query.header.id);
        return Ok(None);
    }

    // Zone switches read files synchronously
    let response = tokio::task::spawn_blocking(move || responder.handle(&query))
        .await
        .map_err(|e| DnsError::Task(e.to_string()))??;

    Ok(Some(response.serialize()?))
}

async fn report_failure(fatal_tx: &mpsc::Sender<DnsError>, src_addr: SocketAddr, e: DnsError) {
    if e.is_fatal() {
        error!("Fatal error while answering {}: {}", src_addr, e);
        let _ = fatal_tx.send(e).await;
    } else {
        warn!("Failed to answer query from {}: {}", src_addr, e);
    }
}
