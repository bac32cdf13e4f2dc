//! Transport: one framed TCP link per peer, reconnecting on a fixed delay.
//!
//! ```text
//!  Link::spawn(source, addr)
//!      │
//!      ▼
//!  connect ──fail──► sleep(delay) ──► connect …
//!      │ ok
//!      ▼
//!  Open ──► read frames ──► Message(m)…      outbound rx ──► write frames
//!      │ EOF / error
//!      ▼
//!  Closed ──► sleep(delay) ──► connect …
//! ```
//!
//! Messages queued while the link is down are dropped when it comes back:
//! they were meant for a session that no longer exists.

use std::time::Duration;

use mediatree_proto::message::frame_len;
use mediatree_proto::{Message, ProtoError};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::Source;

/// Link lifecycle and traffic, delivered to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Open,
    Message(Message),
    Closed,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol: {0}")]
    Proto(#[from] ProtoError),
    #[error("event loop is gone")]
    EventLoopClosed,
}

/// Handle to a running link.  Dropping it stops the task.
pub struct Link {
    outbound: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl Link {
    pub fn spawn(
        source: Source,
        address: String,
        reconnect_delay: Duration,
        events: mpsc::Sender<(Source, TransportEvent)>,
    ) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_link(source, address, reconnect_delay, rx, events));
        Self { outbound, task }
    }

    pub fn send(&self, msg: Message) {
        if self.outbound.send(msg).is_err() {
            debug!("link task has ended, message dropped");
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl crate::outbox::MessageSink for Link {
    fn send(&mut self, msg: Message) {
        Link::send(self, msg);
    }
}

async fn run_link(
    source: Source,
    address: String,
    reconnect_delay: Duration,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::Sender<(Source, TransportEvent)>,
) {
    loop {
        match TcpStream::connect(&address).await {
            Ok(stream) => {
                info!("{:?} link connected to {}", source, address);
                // stale requests from the previous session
                let mut stale = 0usize;
                while outbound.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    debug!("dropped {} messages queued while disconnected", stale);
                }
                if events.send((source, TransportEvent::Open)).await.is_err() {
                    return;
                }
                let result = session(source, stream, &mut outbound, &events).await;
                match result {
                    Ok(()) => info!("{:?} link to {} closed", source, address),
                    Err(ClientError::EventLoopClosed) => return,
                    Err(e) => warn!("{:?} link to {} failed: {}", source, address, e),
                }
                if events.send((source, TransportEvent::Closed)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("{:?} link: cannot reach {}: {}", source, address, e);
            }
        }
        if outbound.is_closed() {
            return;
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

/// One connected session.  `Ok` on orderly EOF.
async fn session(
    source: Source,
    stream: TcpStream,
    outbound: &mut mpsc::UnboundedReceiver<Message>,
    events: &mpsc::Sender<(Source, TransportEvent)>,
) -> Result<(), ClientError> {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut read_buf: Vec<u8> = Vec::with_capacity(8192);

    loop {
        tokio::select! {
            result = read_half.read_buf(&mut read_buf) => {
                if result? == 0 {
                    return Ok(());
                }
                loop {
                    match Message::decode(&read_buf) {
                        Ok((msg, consumed)) => {
                            read_buf.drain(..consumed);
                            if events.send((source, TransportEvent::Message(msg))).await.is_err() {
                                return Err(ClientError::EventLoopClosed);
                            }
                        }
                        Err(ProtoError::Incomplete) => break,
                        Err(ProtoError::Json(e)) => {
                            // frame boundary is intact; skip just this one
                            warn!("{:?} link: undecodable message dropped: {}", source, e);
                            let len = frame_len(&read_buf)?.unwrap_or(read_buf.len());
                            read_buf.drain(..len);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }

            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    return Ok(());
                };
                match msg.encode() {
                    Ok(frame) => write_half.write_all(&frame).await?,
                    Err(e) => warn!("{:?} link: cannot encode message: {}", source, e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_proto::Payload;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn next(rx: &mut mpsc::Receiver<(Source, TransportEvent)>) -> TransportEvent {
        let (source, ev) = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(source, Source::Server);
        ev
    }

    #[tokio::test]
    async fn test_frames_in_both_directions_and_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, mut rx) = mpsc::channel(16);
        let link = Link::spawn(Source::Server, addr, Duration::from_millis(20), tx);

        let (mut peer, _) = listener.accept().await.unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Open);

        // two frames in one write, the second split across writes
        let a = Payload::RescanDone.to_message().with_context("/");
        let b = Payload::Play.to_message();
        let mut bytes = a.encode().unwrap();
        let fb = b.encode().unwrap();
        bytes.extend_from_slice(&fb[..3]);
        peer.write_all(&bytes).await.unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Message(a));
        peer.write_all(&fb[3..]).await.unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Message(b));

        let out = Payload::Stop.to_message();
        link.send(out.clone());
        let mut buf = Vec::new();
        loop {
            peer.read_buf(&mut buf).await.unwrap();
            if let Ok((msg, _)) = Message::decode(&buf) {
                assert_eq!(msg, out);
                break;
            }
        }

        drop(peer);
        assert_eq!(next(&mut rx).await, TransportEvent::Closed);
        let (_peer, _) = listener.accept().await.unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Open);
    }
}
