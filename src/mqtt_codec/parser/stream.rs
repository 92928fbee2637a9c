use bytes::BytesMut;

use crate::mqtt_codec::control_packet::MqttPacket;
use crate::mqtt_codec::parser::{parse_remaining_length, CodecError, DecodeOk};

/// A framing failure reported by [`MqttParser::next_packet`].
///
/// `Malformed` means one frame could not be parsed; the frame has already
/// been discarded and the stream remains usable. `Desynced` means the length
/// prefix itself was invalid, so packet boundaries are lost and the
/// connection must be torn down.
#[derive(Debug, PartialEq)]
pub enum FrameError {
    Malformed(CodecError),
    Desynced(CodecError),
}

/// A stateful parser for a stream of MQTT data.
/// It internally buffers arbitrary-sized chunks and yields complete packets,
/// leaving any partial trailing packet buffered for the next feed.
#[derive(Debug)]
pub struct MqttParser {
    buffer: BytesMut,
}

impl Default for MqttParser {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl MqttParser {
    pub fn new(buffer_size: usize) -> Self {
        MqttParser {
            buffer: BytesMut::with_capacity(buffer_size),
        }
    }

    /// Appends new data from the stream to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed by a complete packet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Attempts to parse a single MQTT packet from the internal buffer.
    ///
    /// - `Ok(Some(packet))`: a full packet was parsed and its bytes removed.
    /// - `Ok(None)`: the buffer does not yet hold a full packet.
    /// - `Err(FrameError::Malformed(_))`: one full frame was discarded.
    /// - `Err(FrameError::Desynced(_))`: the byte stream is unrecoverable.
    pub fn next_packet(&mut self) -> Result<Option<MqttPacket>, FrameError> {
        // Need at least the first header byte plus one length byte.
        if self.buffer.len() < 2 {
            return Ok(None);
        }

        let (remaining, vbi_len) = match parse_remaining_length(&self.buffer[1..]) {
            Ok(v) => v,
            Err(CodecError::PrematureEndOfData) => return Ok(None),
            Err(e) => return Err(FrameError::Desynced(e)),
        };

        let total = 1 + vbi_len + remaining as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        // The frame boundary is known; consume it whether or not the body
        // parses, so one bad packet cannot wedge the stream.
        let frame = self.buffer.split_to(total);
        self.buffer.reserve(frame.len());

        match MqttPacket::decode(&frame) {
            Ok(DecodeOk::Packet(packet, consumed)) => {
                debug_assert_eq!(consumed, total);
                Ok(Some(packet))
            }
            Ok(DecodeOk::Incomplete(_)) => {
                // Cannot happen for a full frame.
                Err(FrameError::Malformed(CodecError::PrematureEndOfData))
            }
            Err(e) => Err(FrameError::Malformed(e)),
        }
    }
}
