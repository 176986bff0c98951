//! Snapshot output: encode each published snapshot and write it to a sink.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flock_config::{SenderConfig, SerializerType, TransportConfig};
use flock_simulation::Snapshot;
use log::{debug, info};
use thiserror::Error;

mod output;

pub use output::{ChannelObserver, OutputStats, OutputWorker};

// --- Error Type ---
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Binary serialization failed: {0}")]
    Binary(#[from] bincode::Error),

    #[error("Output channel failure: {0}")]
    Channel(String),
}

// --- Traits ---
/// Encodes a snapshot into one self-delimiting frame.
pub trait Serializer: Send {
    fn serialize(&self, snapshot: &Snapshot) -> Result<Vec<u8>, TransportError>;
}

/// Writes encoded frames to a destination.
pub trait Sender: Send {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

// --- Serializers ---

/// One JSON object per line.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, snapshot: &Snapshot) -> Result<Vec<u8>, TransportError> {
        let mut frame = serde_json::to_vec(snapshot)?;
        frame.push(b'\n');
        Ok(frame)
    }
}

/// `bincode` payload preceded by its length as a little-endian u32.
pub struct BinarySerializer;

impl BinarySerializer {
    /// Splits the first frame off `bytes`, returning the snapshot and the
    /// remaining input.
    pub fn decode(bytes: &[u8]) -> Result<(Snapshot, &[u8]), TransportError> {
        let truncated = || {
            TransportError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated frame"))
        };
        let header: [u8; 4] = bytes.get(..4).and_then(|h| h.try_into().ok()).ok_or_else(truncated)?;
        let len = u32::from_le_bytes(header) as usize;
        let payload = bytes.get(4..4 + len).ok_or_else(truncated)?;
        Ok((bincode::deserialize(payload)?, &bytes[4 + len..]))
    }
}

impl Serializer for BinarySerializer {
    fn serialize(&self, snapshot: &Snapshot) -> Result<Vec<u8>, TransportError> {
        let payload = bincode::serialize(snapshot)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "snapshot frame exceeds u32 length")
        })?;

        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}

// --- Senders ---

/// Sends frames to standard output.
pub struct StdioSender {
    stdout: io::Stdout,
}

impl StdioSender {
    pub fn new() -> Self {
        StdioSender { stdout: io::stdout() }
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for StdioSender {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let mut out = self.stdout.lock();
        out.write_all(frame)?;
        out.flush()?;
        Ok(())
    }
}

/// Appends frames to a file, truncating it on creation.
pub struct FileSender {
    writer: BufWriter<File>,
}

impl FileSender {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("Writing snapshots to {}", path.display());
        Ok(Self { writer: BufWriter::new(file) })
    }
}

impl Sender for FileSender {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(frame)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards frames.
#[derive(Debug, Default)]
pub struct NullSender;

impl Sender for NullSender {
    fn send(&mut self, _frame: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }
}

// --- Controller ---

/// Serializer and sender pair with output throttling.
pub struct TransportController {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    output_frequency: u32,
    seen: u64,
    published: u64,
}

impl TransportController {
    pub fn new(
        serializer: Box<dyn Serializer>,
        sender: Box<dyn Sender>,
        output_frequency: u32,
    ) -> Self {
        Self {
            serializer,
            sender,
            output_frequency: output_frequency.max(1),
            seen: 0,
            published: 0,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let serializer: Box<dyn Serializer> = match config.serializer {
            SerializerType::Json => Box::new(JsonSerializer),
            SerializerType::Binary => Box::new(BinarySerializer),
        };
        let sender: Box<dyn Sender> = match &config.sender {
            SenderConfig::Stdio => Box::new(StdioSender::new()),
            SenderConfig::File(file) => Box::new(FileSender::create(&file.output_path)?),
            SenderConfig::Null => Box::new(NullSender),
        };
        debug!(
            "Transport: {:?} serializer, every {} snapshot(s)",
            config.serializer, config.output_frequency
        );
        Ok(Self::new(serializer, sender, config.output_frequency))
    }

    /// Sends every `output_frequency`-th snapshot it is given, starting
    /// with the first. Returns whether this one was sent.
    pub fn publish(&mut self, snapshot: &Snapshot) -> Result<bool, TransportError> {
        let due = self.seen % u64::from(self.output_frequency) == 0;
        self.seen += 1;
        if !due {
            return Ok(false);
        }

        let frame = self.serializer.serialize(snapshot)?;
        self.sender.send(&frame)?;
        self.published += 1;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.sender.flush()
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}
