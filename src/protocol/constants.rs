// Interleaved framing (RFC 2326 §10.12)
pub const INTERLEAVED_MARKER: u8 = 0x24; // '$'
pub const INTERLEAVED_HEADER_LEN: usize = 4;
pub const MAX_INTERLEAVED_LEN: usize = 65535;

// Protocol version
pub const RTSP_VERSION: &str = "RTSP/1.0";

// Well-known headers
pub const HEADER_CSEQ: &str = "CSeq";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";

// Default values
pub const DEFAULT_RTSP_PORT: u16 = 554;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;
pub const DEFAULT_POOL_MAX_IDLE: usize = 16;
