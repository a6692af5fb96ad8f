//! Message envelopes and their binary framing.
//!
//! An [`Envelope`] is the unit of ordered session traffic: one drawing
//! command, one meta message, or one JSON-encoded server command. Envelopes
//! are immutable once built; the payload is shared through [`Bytes`] so that
//! cloning an envelope into the history and into every outbound queue is
//! cheap.
//!
//! # Wire format
//!
//! ```text
//! +----------------+--------+------------+-----------------+
//! | len: u16 (BE)  | kind   | context id | payload (len B) |
//! +----------------+--------+------------+-----------------+
//! ```
//!
//! The length field counts payload bytes only. [`Envelope::length`] reports
//! the full framed size, which is what history size accounting uses.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the frame header preceding every payload.
pub const HEADER_LEN: usize = 4;

/// Largest payload a single envelope can carry.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Type tag of an envelope.
///
/// Kinds below 32 are transport-level control messages, 32..=127 are meta
/// messages and 128 and above are drawing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageKind(pub u8);

impl MessageKind {
	/// JSON-encoded server command or reply.
	pub const SERVER_COMMAND: Self = Self(0);
	/// Disconnect notification.
	pub const DISCONNECT: Self = Self(1);
	/// Keepalive ping.
	pub const PING: Self = Self(2);
	/// A user joined the session.
	pub const JOIN: Self = Self(32);
	/// A user left the session.
	pub const LEAVE: Self = Self(33);
	/// Chat message.
	pub const CHAT: Self = Self(35);

	/// Returns true for transport-level control messages.
	#[must_use]
	pub const fn is_control(self) -> bool {
		self.0 < 32
	}

	/// Returns true for meta messages.
	#[must_use]
	pub const fn is_meta(self) -> bool {
		self.0 >= 32 && self.0 < 128
	}

	/// Returns true for drawing commands.
	#[must_use]
	pub const fn is_command(self) -> bool {
		self.0 >= 128
	}
}

/// Errors produced while building or decoding envelopes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
	/// Payload does not fit in the 16-bit length field.
	#[error("payload too large: {len} bytes (max {MAX_PAYLOAD_LEN})")]
	PayloadTooLarge {
		/// Rejected payload length.
		len: usize,
	},
	/// Buffer ended inside a frame.
	#[error("truncated frame: need {needed} bytes, have {available}")]
	Truncated {
		/// Bytes required to finish the frame.
		needed: usize,
		/// Bytes present in the buffer.
		available: usize,
	},
}

/// Result alias for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

/// Immutable unit of session traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
	kind: MessageKind,
	context_id: u8,
	payload: Bytes,
}

impl Envelope {
	/// Builds an envelope, rejecting payloads that cannot be framed.
	pub fn new(kind: MessageKind, context_id: u8, payload: impl Into<Bytes>) -> Result<Self> {
		let payload = payload.into();
		if payload.len() > MAX_PAYLOAD_LEN {
			return Err(EnvelopeError::PayloadTooLarge { len: payload.len() });
		}
		Ok(Self {
			kind,
			context_id,
			payload,
		})
	}

	/// Builds a server command envelope carrying a serialized JSON document.
	pub fn server_command(context_id: u8, json: &serde_json::Value) -> Result<Self> {
		let text = json.to_string();
		Self::new(MessageKind::SERVER_COMMAND, context_id, text.into_bytes())
	}

	/// Type tag.
	#[must_use]
	pub fn kind(&self) -> MessageKind {
		self.kind
	}

	/// Originating participant (0 is the server).
	#[must_use]
	pub fn context_id(&self) -> u8 {
		self.context_id
	}

	/// Raw payload bytes.
	#[must_use]
	pub fn payload(&self) -> &Bytes {
		&self.payload
	}

	/// Framed size in bytes, header included.
	#[must_use]
	pub fn length(&self) -> usize {
		HEADER_LEN + self.payload.len()
	}

	/// Appends the framed envelope to `dst`.
	pub fn encode(&self, dst: &mut BytesMut) {
		dst.reserve(self.length());
		dst.put_u16(self.payload.len() as u16);
		dst.put_u8(self.kind.0);
		dst.put_u8(self.context_id);
		dst.put_slice(&self.payload);
	}

	/// Returns the framed envelope as a standalone buffer.
	#[must_use]
	pub fn to_bytes(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(self.length());
		self.encode(&mut buf);
		buf.freeze()
	}

	/// Decodes one frame from the front of `src`.
	///
	/// Returns `Ok(None)` when `src` does not yet hold a complete frame; the
	/// buffer is left untouched in that case so the caller can read more
	/// bytes and retry.
	pub fn decode(src: &mut BytesMut) -> Result<Option<Self>> {
		if src.len() < HEADER_LEN {
			return Ok(None);
		}
		let len = u16::from_be_bytes([src[0], src[1]]) as usize;
		if src.len() < HEADER_LEN + len {
			return Ok(None);
		}
		let kind = MessageKind(src[2]);
		let context_id = src[3];
		src.advance(HEADER_LEN);
		let payload = src.split_to(len).freeze();
		Ok(Some(Self {
			kind,
			context_id,
			payload,
		}))
	}

	/// Decodes exactly one frame from a complete buffer.
	pub fn decode_exact(mut src: &[u8]) -> Result<Self> {
		if src.len() < HEADER_LEN {
			return Err(EnvelopeError::Truncated {
				needed: HEADER_LEN,
				available: src.len(),
			});
		}
		let len = src.get_u16() as usize;
		let kind = MessageKind(src.get_u8());
		let context_id = src.get_u8();
		if src.len() < len {
			return Err(EnvelopeError::Truncated {
				needed: HEADER_LEN + len,
				available: HEADER_LEN + src.len(),
			});
		}
		Ok(Self {
			kind,
			context_id,
			payload: Bytes::copy_from_slice(&src[..len]),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn length_includes_header() {
		let env = Envelope::new(MessageKind::CHAT, 3, &b"hello"[..]).unwrap();
		assert_eq!(env.length(), 9);
		assert_eq!(env.to_bytes().len(), 9);
	}

	#[test]
	fn oversized_payload_is_rejected() {
		let err = Envelope::new(MessageKind(200), 1, vec![0u8; MAX_PAYLOAD_LEN + 1]).unwrap_err();
		assert_eq!(
			err,
			EnvelopeError::PayloadTooLarge {
				len: MAX_PAYLOAD_LEN + 1
			}
		);
		assert!(Envelope::new(MessageKind(200), 1, vec![0u8; MAX_PAYLOAD_LEN]).is_ok());
	}

	#[test]
	fn frame_layout_is_big_endian() {
		let env = Envelope::new(MessageKind(130), 7, vec![0xAA; 258]).unwrap();
		let bytes = env.to_bytes();
		assert_eq!(&bytes[..4], &[0x01, 0x02, 130, 7]);
	}

	#[test]
	fn decode_waits_for_complete_frame() {
		let env = Envelope::new(MessageKind::CHAT, 2, &b"partial"[..]).unwrap();
		let full = env.to_bytes();

		let mut buf = BytesMut::from(&full[..6]);
		assert_eq!(Envelope::decode(&mut buf).unwrap(), None);
		assert_eq!(buf.len(), 6);

		buf.extend_from_slice(&full[6..]);
		assert_eq!(Envelope::decode(&mut buf).unwrap(), Some(env));
		assert!(buf.is_empty());
	}

	#[test]
	fn decode_consumes_frames_in_order() {
		let a = Envelope::new(MessageKind::JOIN, 1, &b"a"[..]).unwrap();
		let b = Envelope::new(MessageKind::LEAVE, 1, Bytes::new()).unwrap();
		let mut buf = BytesMut::new();
		a.encode(&mut buf);
		b.encode(&mut buf);

		assert_eq!(Envelope::decode(&mut buf).unwrap(), Some(a));
		assert_eq!(Envelope::decode(&mut buf).unwrap(), Some(b));
		assert_eq!(Envelope::decode(&mut buf).unwrap(), None);
	}

	#[test]
	fn decode_exact_reports_truncation() {
		let err = Envelope::decode_exact(&[0, 5, 0, 0, b'x']).unwrap_err();
		assert_eq!(
			err,
			EnvelopeError::Truncated {
				needed: 9,
				available: 5
			}
		);
	}

	#[test]
	fn kind_ranges() {
		assert!(MessageKind::SERVER_COMMAND.is_control());
		assert!(MessageKind::CHAT.is_meta());
		assert!(MessageKind(128).is_command());
		assert!(!MessageKind(127).is_command());
	}
}
