//! Frame codec — 4-byte big-endian length prefix followed by a UTF-8 JSON payload
//! (spec.md §4.1, §6). Grounded on the AlphaPulse `UnixSocketProducer`/`Consumer`
//! length-prefix-then-payload shape, switched from little-endian binary frames to
//! big-endian length + JSON per the wire format this spec names.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Serialize `value` to JSON and write it as one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(value).map_err(std::io::Error::other)?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Distinguishes a transport failure (connection is no longer usable) from a
/// bad payload (spec.md §4.1: "parse failures log and drop the frame — the
/// connection remains open").
#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "io error: {e}"),
            FrameError::Parse(e) => write!(f, "parse error: {e}"),
        }
    }
}

/// Read one length-prefixed frame and parse it as JSON.
///
/// Returns `Ok(None)` on a clean EOF between frames (no bytes read at all);
/// an EOF in the middle of a frame is an `UnexpectedEof` error, which the caller
/// treats as a dropped/incomplete frame (spec.md §4.1 failure semantics).
/// Unparseable JSON surfaces as `FrameError::Parse`, distinct from a transport
/// error, so the caller can keep the connection open and just drop the frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(FrameError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(FrameError::Io)?;

    let value = serde_json::from_slice(&payload).map_err(FrameError::Parse)?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        a: u32,
        b: String,
    }

    #[tokio::test]
    async fn round_trips_through_a_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let sample = Sample {
            a: 7,
            b: "hello".to_string(),
        };
        write_frame(&mut client, &sample).await.unwrap();
        let decoded: Sample = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(decoded, sample);
    }

    #[tokio::test]
    async fn clean_eof_yields_none() {
        let (client, mut server) = tokio::io::duplex(4096);
        drop(client);
        let decoded: Option<Sample> = read_frame(&mut server).await.unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn unparseable_payload_is_a_parse_error_not_an_io_error() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let garbage = b"not json";
        client.write_all(&(garbage.len() as u32).to_be_bytes()).await.unwrap();
        client.write_all(garbage).await.unwrap();
        client.flush().await.unwrap();

        let result: Result<Option<Sample>, FrameError> = read_frame(&mut server).await;
        assert!(matches!(result, Err(FrameError::Parse(_))));
    }
}
