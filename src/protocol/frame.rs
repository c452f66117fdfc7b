use std::io;

use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Control frame codes, requests and responses alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Code {
    CreatePool = 0x01,
    JoinPool = 0x02,
    DeletePool = 0x03,
    Success = 0x10,
    AuthError = 0x11,
    MaxConnectionsReached = 0x12,
}

impl Code {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Code::CreatePool),
            0x02 => Some(Code::JoinPool),
            0x03 => Some(Code::DeletePool),
            0x10 => Some(Code::Success),
            0x11 => Some(Code::AuthError),
            0x12 => Some(Code::MaxConnectionsReached),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed before a full frame was read")]
    Truncated,

    #[error("unknown frame code {0:#04x}")]
    UnknownCode(u8),

    #[error("frame {0} field is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("frame {0} field is longer than {max} bytes", max = u16::MAX)]
    FieldTooLong(&'static str),

    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(err)
        }
    }
}

/// One request or response exchanged with the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub code: Code,
    /// Raw shared key on CreatePool, session key everywhere else
    pub key: String,
    /// Slot id as decimal text on JoinPool, empty otherwise
    pub message: String,
}

impl ControlFrame {
    pub fn new(code: Code) -> Self {
        Self {
            code,
            key: String::new(),
            message: String::new(),
        }
    }

    pub fn create_pool(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::new(Code::CreatePool)
        }
    }

    pub fn join_pool(session_key: impl Into<String>, slot: usize) -> Self {
        Self {
            code: Code::JoinPool,
            key: session_key.into(),
            message: slot.to_string(),
        }
    }

    pub fn delete_pool(session_key: impl Into<String>) -> Self {
        Self {
            key: session_key.into(),
            ..Self::new(Code::DeletePool)
        }
    }

    pub fn encode(&self) -> Result<BytesMut, FrameError> {
        let key_len = u16::try_from(self.key.len()).map_err(|_| FrameError::FieldTooLong("key"))?;
        let msg_len =
            u16::try_from(self.message.len()).map_err(|_| FrameError::FieldTooLong("message"))?;

        let mut buf = BytesMut::with_capacity(5 + self.key.len() + self.message.len());
        buf.put_u8(self.code as u8);
        buf.put_u16(key_len);
        buf.put_slice(self.key.as_bytes());
        buf.put_u16(msg_len);
        buf.put_slice(self.message.as_bytes());
        Ok(buf)
    }

    /// Writes the frame and returns the number of bytes written.
    pub async fn write_to<W>(&self, stream: &mut W) -> Result<usize, FrameError>
    where
        W: AsyncWrite + Unpin,
    {
        let buf = self.encode()?;
        stream.write_all(&buf).await?;
        stream.flush().await?;
        Ok(buf.len())
    }

    /// Reads exactly one frame, blocking until it is complete.
    pub async fn read_from<R>(stream: &mut R) -> Result<Self, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let raw_code = stream.read_u8().await?;
        let code = Code::from_u8(raw_code).ok_or(FrameError::UnknownCode(raw_code))?;
        let key = read_field(stream, "key").await?;
        let message = read_field(stream, "message").await?;

        Ok(Self { code, key, message })
    }
}

async fn read_field<R>(stream: &mut R, name: &'static str) -> Result<String, FrameError>
where
    R: AsyncRead + Unpin,
{
    let len = stream.read_u16().await? as usize;
    let mut raw = vec![0u8; len];
    stream.read_exact(&mut raw).await?;
    String::from_utf8(raw).map_err(|_| FrameError::InvalidUtf8(name))
}
