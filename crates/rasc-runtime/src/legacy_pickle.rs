//! Minimal encode/decode for the pickle opcode sequence a Python peer
//! produces when it calls `pickle.dumps(json_text)` on a plain `str`
//! before length-prefixing it on the wire. Only the opcodes a bare string
//! ever triggers are supported: `PROTO`, `BINUNICODE`/`SHORT_BINUNICODE`,
//! and `STOP`.

use crate::error::WireError;

const PROTO: u8 = 0x80;
const BINUNICODE: u8 = b'X';
const SHORT_BINUNICODE: u8 = 0x8c;
const STOP: u8 = b'.';
const PROTOCOL_VERSION: u8 = 2;

/// Wraps `text` the way `pickle.dumps(text, protocol=2)` would.
pub fn encode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() + 8);
    out.push(PROTO);
    out.push(PROTOCOL_VERSION);
    out.push(BINUNICODE);
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
    out.push(STOP);
    out
}

/// Unwraps a pickle-framed string back to UTF-8 text.
pub fn decode(buf: &[u8]) -> Result<String, WireError> {
    let mut i = 0usize;
    if buf.get(i) == Some(&PROTO) {
        i += 2; // PROTO opcode + version byte
    }
    let opcode = *buf
        .get(i)
        .ok_or_else(|| WireError::MalformedPickleText("truncated before string opcode".into()))?;
    i += 1;

    let len = match opcode {
        BINUNICODE => {
            let len_bytes: [u8; 4] = buf
                .get(i..i + 4)
                .ok_or_else(|| WireError::MalformedPickleText("truncated BINUNICODE length".into()))?
                .try_into()
                .unwrap();
            i += 4;
            u32::from_le_bytes(len_bytes) as usize
        }
        SHORT_BINUNICODE => {
            let len = *buf
                .get(i)
                .ok_or_else(|| WireError::MalformedPickleText("truncated SHORT_BINUNICODE length".into()))?
                as usize;
            i += 1;
            len
        }
        other => {
            return Err(WireError::MalformedPickleText(format!(
                "unsupported pickle opcode 0x{other:02x}"
            )))
        }
    };

    let text_bytes = buf
        .get(i..i + len)
        .ok_or_else(|| WireError::MalformedPickleText("truncated string payload".into()))?;
    String::from_utf8(text_bytes.to_vec())
        .map_err(|e| WireError::MalformedPickleText(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let text = r#"{"system": {"get_sysinfo": {}}}"#;
        let encoded = encode(text);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(decode(&[PROTO, PROTOCOL_VERSION, BINUNICODE]).is_err());
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert!(decode(&[PROTO, PROTOCOL_VERSION, 0xFF]).is_err());
    }
}
