use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;
use crate::legacy_pickle;

/// Guards against a corrupt or hostile length prefix causing an unbounded
/// allocation.
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Payload framing used over a device connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMode {
    /// `len(u32 BE) || utf8-json` — the mode this crate speaks by default.
    Json,
    /// `len(u32 BE) || pickle.dumps(json_text)` — decodes frames from a
    /// peer still running the original double-wrapped protocol.
    LegacyPickleText,
}

/// Writes one length-prefixed frame carrying `value` as JSON.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    mode: WireMode,
    value: &serde_json::Value,
) -> Result<(), WireError> {
    let json_text = serde_json::to_string(value)?;
    let payload = match mode {
        WireMode::Json => json_text.into_bytes(),
        WireMode::LegacyPickleText => legacy_pickle::encode(&json_text),
    };
    if payload.len() as u64 > MAX_FRAME_SIZE as u64 {
        return Err(WireError::FrameTooLarge(payload.len() as u32));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame and decodes it as JSON.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    mode: WireMode,
) -> Result<serde_json::Value, WireError> {
    let len = match reader.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;

    let json_text = match mode {
        WireMode::Json => {
            String::from_utf8(buf).map_err(|e| WireError::MalformedPickleText(e.to_string()))?
        }
        WireMode::LegacyPickleText => legacy_pickle::decode(&buf)?,
    };
    Ok(serde_json::from_str(&json_text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn json_frame_round_trips() {
        let value = serde_json::json!({"door": {"get_door_state": {}}});
        let mut buf = Vec::new();
        write_frame(&mut buf, WireMode::Json, &value).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = read_frame(&mut cursor, WireMode::Json).await.unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn legacy_pickle_frame_round_trips() {
        let value = serde_json::json!({"system": {"get_sysinfo": {"entity_id": "d1"}}});
        let mut buf = Vec::new();
        write_frame(&mut buf, WireMode::LegacyPickleText, &value).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = read_frame(&mut cursor, WireMode::LegacyPickleText).await.unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_SIZE + 1).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let err = read_frame(&mut cursor, WireMode::Json).await.unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge(_)));
    }

    #[tokio::test]
    async fn empty_stream_reports_connection_closed() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut cursor, WireMode::Json).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }
}
