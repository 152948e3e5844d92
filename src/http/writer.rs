use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes a serialized CONNECT request to the proxy, tracking partial writes.
pub struct RequestWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl RequestWriter {
    pub fn new(request: impl Into<Vec<u8>>) -> Self {
        Self {
            buffer: request.into(),
            written: 0,
        }
    }

    /// Bytes already accepted by the stream.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn is_done(&self) -> bool {
        self.written >= self.buffer.len()
    }

    pub async fn write_to_stream<S>(
        &mut self,
        stream: &mut S,
    ) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream
                .write(&self.buffer[self.written..])
                .await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;

        Ok(())
    }
}
