//! Release discovery against the patch server.
//!
//! One transient TCP exchange: send a fixed 2-byte request, read back a
//! binary message carrying the CDN path of the current release, and keep
//! the last path segment as the version token.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Well-known patch server endpoint.
pub const PATCH_SERVER: &str = "patch.pathofexile.com:12995";

const REQUEST: [u8; 2] = [0x01, 0x06];
/// Offset of the 8-bit code-unit count within the response.
const LEN_OFFSET: usize = 34;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Ask `addr` for the current release and return its version token. The
/// connection is closed on every exit path; errors are not retried.
pub async fn discover_version(addr: &str) -> Result<String> {
    let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|e| Error::Io(e.into()))??;
    debug!(%addr, "connected to patch server");

    timeout(EXCHANGE_TIMEOUT, exchange(&mut stream))
        .await
        .map_err(|e| Error::Io(e.into()))?
}

async fn exchange(stream: &mut TcpStream) -> Result<String> {
    stream.write_all(&REQUEST).await?;

    // the response may arrive in several deliveries; keep reading until
    // the whole token is present
    let mut buf = Vec::with_capacity(256);
    let mut chunk = [0u8; 512];
    loop {
        if let Some(need) = wanted_len(&buf) {
            if buf.len() >= need {
                break;
            }
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::ShortResponse { len: buf.len() });
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let token = parse_version_response(&buf)?;
    info!(token = %token, "patch server reports release");
    Ok(token)
}

/// Total bytes the token needs, once the length byte is in.
fn wanted_len(buf: &[u8]) -> Option<usize> {
    (buf.len() > LEN_OFFSET).then(|| LEN_OFFSET + 1 + buf[LEN_OFFSET] as usize * 2)
}

/// Extract the version token from a complete response message: the byte
/// at offset 34 counts UTF-16 code units, the text itself starts at 35.
/// The token is the last `/`-separated segment that isn't blank.
pub fn parse_version_response(buf: &[u8]) -> Result<String> {
    let need = wanted_len(buf).ok_or(Error::ShortResponse { len: buf.len() })?;
    if buf.len() < need {
        return Err(Error::ShortResponse { len: buf.len() });
    }

    let units: Vec<u16> = buf[LEN_OFFSET + 1..need]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16_lossy(&units);

    text.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_owned)
        .ok_or(Error::TokenNotFound)
}
