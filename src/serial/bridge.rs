//! Moves frame slots between a byte stream and the channels behind a
//! [`ChannelTransport`](crate::link::ChannelTransport).
//!
//! The adapter forwards whole 32-byte slots. A slot is only handed on when
//! it starts with a known packet type and carries a matching checksum;
//! otherwise the bridge drops one byte and looks again, so a lost or extra
//! byte on the line costs a single frame instead of every later one.
//! Version checks are left to the codec.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{RcLinkError, Result};
use crate::protocol::crc::crc8;
use crate::protocol::{FrameSlot, FrameView, PacketType, FRAME_SIZE};

/// Counters reported when the bridge stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Slots read from the port and handed to the link
    pub slots_in: u64,
    /// Slots written to the port
    pub slots_out: u64,
    /// Inbound slots dropped because the link was not keeping up
    pub slots_dropped: u64,
    /// Bytes discarded while searching for a frame boundary
    pub bytes_skipped: u64,
}

/// True if `window` starts with something that frames like a packet
fn is_frame_start(window: &[u8]) -> bool {
    let Some(view) = FrameView::new(window) else {
        return false;
    };

    if PacketType::try_from(view.packet_type()).is_err() {
        return false;
    }

    match (view.checked_bytes(), view.checksum()) {
        (Some(checked), Some(stored)) => crc8(checked) == stored,
        _ => false,
    }
}

/// Run until the port reaches EOF, the link side hangs up, or I/O fails.
///
/// # Arguments
///
/// * `port` - Serial stream (or any duplex byte stream)
/// * `outbound` - Slots the link wants transmitted
/// * `inbound` - Where received slots are delivered
///
/// # Errors
///
/// Returns `Serial` if reading from or writing to the port fails
pub async fn run_bridge<P>(
    port: P,
    mut outbound: mpsc::Receiver<FrameSlot>,
    inbound: mpsc::Sender<FrameSlot>,
) -> Result<BridgeStats>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(port);
    let mut buf = BytesMut::with_capacity(FRAME_SIZE * 4);
    let mut stats = BridgeStats::default();
    let mut resyncing = false;

    loop {
        tokio::select! {
            read = reader.read_buf(&mut buf) => {
                let n = read.map_err(|e| RcLinkError::Serial(format!("Failed to read from port: {}", e)))?;
                if n == 0 {
                    if !buf.is_empty() {
                        debug!("Discarding {} trailing bytes at EOF", buf.len());
                    }
                    info!("Serial port closed");
                    break;
                }

                while buf.len() >= FRAME_SIZE {
                    if !is_frame_start(&buf[..FRAME_SIZE]) {
                        if !resyncing {
                            debug!("Lost frame alignment, resynchronizing");
                        }
                        resyncing = true;
                        buf.advance(1);
                        stats.bytes_skipped += 1;
                        continue;
                    }
                    resyncing = false;

                    let mut slot: FrameSlot = [0u8; FRAME_SIZE];
                    buf.copy_to_slice(&mut slot);

                    match inbound.try_send(slot) {
                        Ok(()) => stats.slots_in += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            stats.slots_dropped += 1;
                            warn!("Inbound queue full, dropping slot");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            info!("Link receiver closed, stopping bridge");
                            return Ok(stats);
                        }
                    }
                }
            }
            slot = outbound.recv() => {
                let Some(slot) = slot else {
                    info!("Link transmitter closed, stopping bridge");
                    break;
                };

                writer
                    .write_all(&slot)
                    .await
                    .map_err(|e| RcLinkError::Serial(format!("Failed to write slot: {}", e)))?;
                writer
                    .flush()
                    .await
                    .map_err(|e| RcLinkError::Serial(format!("Failed to flush serial port: {}", e)))?;
                stats.slots_out += 1;
            }
        }
    }

    Ok(stats)
}
