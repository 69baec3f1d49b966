use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::constants::*;
use crate::protocol::{RtspChunk, RtspData, RtspMessage};
use crate::utils::BufferPool;
use crate::{Error, Result};

/// Reader states; every produced chunk is one pass from `NewCommand` to `End`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ReaderState {
    /// At a frame boundary; the next byte decides text vs interleaved
    NewCommand,
    /// Reading `Name: Value` lines until an empty line
    Headers,
    /// Reading exactly Content-Length bytes of message body
    Body,
    /// Consuming channel and length after the `$` marker
    InterleavedHeader,
    /// Reading exactly `length` bytes of binary payload
    InterleavedPayload,
    /// Chunk complete
    End,
}

/// The multiplexed read path: discriminates text RTSP messages from
/// `$`-framed interleaved binary on a single byte stream.
///
/// Not re-entrant; exactly one read task drives a reader per stream.
pub struct FrameReader {
    max_line_length: usize,
    pool: BufferPool,
}

impl FrameReader {
    /// Create a reader renting interleaved payloads from `pool`
    pub fn new(pool: BufferPool) -> Self {
        FrameReader::with_max_line_length(pool, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a reader with a custom header line cap
    pub fn with_max_line_length(pool: BufferPool, max_line_length: usize) -> Self {
        FrameReader {
            max_line_length,
            pool,
        }
    }

    /// Read exactly one chunk off the stream.
    ///
    /// Returns `Ok(None)` when the peer closed the connection at a frame
    /// boundary, or when a frame was truncated by EOF (the partial chunk is
    /// discarded, never delivered).
    pub async fn read_one_chunk<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<RtspChunk>> {
        let mut state = ReaderState::NewCommand;
        let mut line: Vec<u8> = Vec::new();
        let mut message: Option<RtspMessage> = None;
        let mut body: Vec<u8> = Vec::new();
        let mut data: Option<RtspData> = None;

        loop {
            match state {
                ReaderState::NewCommand => {
                    let mut byte = [0u8; 1];
                    if reader.read(&mut byte).await? == 0 {
                        if !line.is_empty() {
                            debug!("EOF with {} unterminated start-line bytes", line.len());
                        }
                        return Ok(None);
                    }
                    match byte[0] {
                        // `$` marks interleaved data only at a frame boundary
                        INTERLEAVED_MARKER if line.is_empty() => {
                            state = ReaderState::InterleavedHeader;
                        }
                        b'\r' => {}
                        b'\n' => {
                            // Stray blank lines between messages are skipped
                            if line.is_empty() {
                                continue;
                            }
                            let text = String::from_utf8_lossy(&line).into_owned();
                            message = Some(RtspMessage::parse_start_line(&text)?);
                            line.clear();
                            state = ReaderState::Headers;
                        }
                        other => {
                            if line.len() >= self.max_line_length {
                                return Err(Error::framing("Start-line exceeds maximum length"));
                            }
                            line.push(other);
                        }
                    }
                }

                ReaderState::Headers => {
                    let header_line = match self.read_line(reader, &mut line).await? {
                        Some(text) => text,
                        None => {
                            debug!("EOF inside message headers, discarding partial message");
                            return Ok(None);
                        }
                    };

                    let msg = message
                        .as_mut()
                        .ok_or_else(|| Error::framing("Headers without a start-line"))?;

                    if header_line.is_empty() {
                        // Blank line terminates the header block
                        msg.refresh_cseq();
                        let content_length = msg.headers().content_length()?;
                        body = vec![0u8; content_length];
                        state = ReaderState::Body;
                    } else {
                        let (name, value) = header_line
                            .split_once(':')
                            .ok_or_else(|| {
                                Error::framing(format!("Header without colon: {:?}", header_line))
                            })?;
                        msg.headers_mut().insert(name.trim(), value.trim());
                    }
                }

                ReaderState::Body => {
                    if !body.is_empty() && !fill(reader, &mut body).await? {
                        debug!("EOF inside message body, discarding partial message");
                        return Ok(None);
                    }
                    if let Some(msg) = message.as_mut() {
                        msg.set_body(std::mem::take(&mut body));
                    }
                    state = ReaderState::End;
                }

                ReaderState::InterleavedHeader => {
                    // After the `$` marker: channel byte, then the payload
                    // length as an unsigned 16-bit big-endian
                    let mut header = [0u8; INTERLEAVED_HEADER_LEN - 1];
                    if !fill(reader, &mut header).await? {
                        debug!("EOF inside interleaved frame header, discarding");
                        return Ok(None);
                    }
                    let channel = header[0];
                    let mut length_bytes = &header[1..];
                    let length = ReadBytesExt::read_u16::<BigEndian>(&mut length_bytes)? as usize;

                    data = Some(RtspData {
                        channel,
                        payload: self.pool.take(length),
                        source: None,
                    });
                    state = ReaderState::InterleavedPayload;
                }

                ReaderState::InterleavedPayload => {
                    let frame = data
                        .as_mut()
                        .ok_or_else(|| Error::framing("Payload without a frame header"))?;
                    if !frame.payload.is_empty() && !fill(reader, &mut frame.payload).await? {
                        debug!("EOF inside interleaved payload, discarding");
                        return Ok(None);
                    }
                    state = ReaderState::End;
                }

                ReaderState::End => {
                    let chunk = match (message.take(), data.take()) {
                        (Some(msg), None) => RtspChunk::Message(msg),
                        (None, Some(frame)) => RtspChunk::Data(frame),
                        _ => return Err(Error::framing("Reader finished without a chunk")),
                    };
                    return Ok(Some(chunk));
                }
            }
        }
    }

    /// Byte-at-a-time line reader: `\n`-terminated, `\r` silently skipped.
    ///
    /// Returns `Ok(None)` on EOF before the terminator.
    async fn read_line<R: AsyncRead + Unpin>(
        &self,
        reader: &mut R,
        line: &mut Vec<u8>,
    ) -> Result<Option<String>> {
        loop {
            let mut byte = [0u8; 1];
            if reader.read(&mut byte).await? == 0 {
                return Ok(None);
            }
            match byte[0] {
                b'\r' => {}
                b'\n' => {
                    let text = String::from_utf8_lossy(line).into_owned();
                    line.clear();
                    return Ok(Some(text));
                }
                other => {
                    if line.len() >= self.max_line_length {
                        return Err(Error::framing("Header line exceeds maximum length"));
                    }
                    line.push(other);
                }
            }
        }
    }
}

/// Bulk-read until `buf` is full; `Ok(false)` when EOF arrives first.
async fn fill<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RtspMessage;

    fn reader() -> FrameReader {
        FrameReader::new(BufferPool::new(4))
    }

    async fn read_all(input: &[u8]) -> Vec<RtspChunk> {
        let mut rd = reader();
        let mut stream = input;
        let mut chunks = Vec::new();
        while let Some(chunk) = rd.read_one_chunk(&mut stream).await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_mixed_text_and_binary() {
        let mut input = b"OPTIONS rtsp://x RTSP/1.0\r\nCSeq: 7\r\n\r\n".to_vec();
        input.extend_from_slice(&[0x24, 0x00, 0x00, 0x04, 0xDE, 0xAD, 0xBE, 0xEF]);

        let chunks = read_all(&input).await;
        assert_eq!(chunks.len(), 2);

        match &chunks[0] {
            RtspChunk::Message(RtspMessage::Request(req)) => {
                assert_eq!(req.method, "OPTIONS");
                assert_eq!(req.cseq, 7);
                assert!(req.body.is_empty());
            }
            other => panic!("expected request, got {:?}", other),
        }

        match &chunks[1] {
            RtspChunk::Data(data) => {
                assert_eq!(data.channel, 0);
                assert_eq!(data.payload.as_slice(), &[0xDE, 0xAD, 0xBE, 0xEF]);
            }
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_with_body() {
        let input = b"ANNOUNCE rtsp://x RTSP/1.0\r\nCSeq: 2\r\nContent-Length: 5\r\n\r\nv=0\r\n";
        let chunks = read_all(input).await;
        assert_eq!(chunks.len(), 1);

        match &chunks[0] {
            RtspChunk::Message(RtspMessage::Request(req)) => {
                assert_eq!(req.method, "ANNOUNCE");
                assert_eq!(req.body, b"v=0\r\n");
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_response_with_spaced_reason() {
        let input = b"RTSP/1.0 454 Session Not Found\r\nCSeq: 3\r\n\r\n";
        let chunks = read_all(input).await;

        match &chunks[0] {
            RtspChunk::Message(RtspMessage::Response(resp)) => {
                assert_eq!(resp.status_code, 454);
                assert_eq!(resp.reason, "Session Not Found");
                assert_eq!(resp.cseq, 3);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dollar_inside_header_is_literal() {
        let input = b"OPTIONS rtsp://x RTSP/1.0\r\nX-Price: $12\r\nCSeq: 1\r\n\r\n";
        let chunks = read_all(input).await;

        match &chunks[0] {
            RtspChunk::Message(RtspMessage::Request(req)) => {
                assert_eq!(req.headers.get("X-Price"), Some("$12"));
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_length_interleaved_frame() {
        let input = [0x24, 0x05, 0x00, 0x00];
        let chunks = read_all(&input).await;

        match &chunks[0] {
            RtspChunk::Data(data) => {
                assert_eq!(data.channel, 5);
                assert!(data.payload.is_empty());
            }
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eof_at_boundary() {
        let mut rd = reader();
        let mut stream: &[u8] = b"";
        assert!(rd.read_one_chunk(&mut stream).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_body_discards_partial() {
        let input = b"ANNOUNCE rtsp://x RTSP/1.0\r\nContent-Length: 10\r\n\r\n12345";
        let mut rd = reader();
        let mut stream: &[u8] = input;
        assert!(rd.read_one_chunk(&mut stream).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_interleaved_header_discards() {
        let input = [0x24, 0x00];
        let mut rd = reader();
        let mut stream: &[u8] = &input;
        assert!(rd.read_one_chunk(&mut stream).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_interleaved_payload_discards() {
        let input = [0x24, 0x00, 0x00, 0x08, 0x01, 0x02];
        let mut rd = reader();
        let mut stream: &[u8] = &input;
        assert!(rd.read_one_chunk(&mut stream).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_header_without_colon_is_framing_fault() {
        let input = b"OPTIONS rtsp://x RTSP/1.0\r\nBadHeader\r\n\r\n";
        let mut rd = reader();
        let mut stream: &[u8] = input;
        match rd.read_one_chunk(&mut stream).await {
            Err(Error::Framing(_)) => {}
            other => panic!("expected framing error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_line_length_cap() {
        let mut input = Vec::new();
        input.extend_from_slice(&vec![b'A'; 100]);
        input.extend_from_slice(b" rtsp://x RTSP/1.0\r\n\r\n");

        let mut rd = FrameReader::with_max_line_length(BufferPool::new(1), 64);
        let mut stream: &[u8] = &input;
        match rd.read_one_chunk(&mut stream).await {
            Err(Error::Framing(_)) => {}
            other => panic!("expected framing error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bare_newlines_accepted() {
        let input = b"OPTIONS rtsp://x RTSP/1.0\nCSeq: 4\n\n";
        let chunks = read_all(input).await;

        match &chunks[0] {
            RtspChunk::Message(RtspMessage::Request(req)) => assert_eq!(req.cseq, 4),
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_lines_between_messages_skipped() {
        let input = b"\r\n\r\nOPTIONS rtsp://x RTSP/1.0\r\nCSeq: 1\r\n\r\n";
        let chunks = read_all(input).await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_message());
    }

    #[tokio::test]
    async fn test_max_payload_length() {
        let mut input = vec![0x24, 0x01, 0xFF, 0xFF];
        input.extend_from_slice(&vec![0xABu8; 65535]);

        let chunks = read_all(&input).await;
        match &chunks[0] {
            RtspChunk::Data(data) => {
                assert_eq!(data.payload.len(), 65535);
                assert_eq!(data.channel, 1);
            }
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_back_to_back_messages() {
        let input =
            b"OPTIONS rtsp://x RTSP/1.0\r\nCSeq: 1\r\n\r\nRTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n";
        let chunks = read_all(input).await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_message());
        assert!(chunks[1].is_message());
    }
}
