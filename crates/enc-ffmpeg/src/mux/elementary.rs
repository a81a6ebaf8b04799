use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use tracing::{debug, info};

use crate::EncodedPacket;

/// Terminates MPEG-1/MPEG-2 video elementary streams.
pub const SEQUENCE_END_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xB7];

/// Writes packet payloads back to back, with no container around them.
pub struct ElementaryStreamWriter<W: Write> {
    sink: W,
    packets_written: u64,
    bytes_written: u64,
}

impl ElementaryStreamWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("Writing elementary stream to '{}'", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ElementaryStreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            packets_written: 0,
            bytes_written: 0,
        }
    }

    pub fn write(&mut self, packet: &EncodedPacket) -> io::Result<()> {
        self.sink.write_all(packet.data())?;
        self.packets_written += 1;
        self.bytes_written += packet.size() as u64;
        Ok(())
    }

    /// Writes `packets` in the order given.
    pub fn write_all<'a>(
        &mut self,
        packets: impl IntoIterator<Item = &'a EncodedPacket>,
    ) -> io::Result<()> {
        for packet in packets {
            self.write(packet)?;
        }
        Ok(())
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Appends [`SEQUENCE_END_CODE`] when `end_code` is set, flushes, and
    /// returns the sink.
    pub fn finalize(mut self, end_code: bool) -> io::Result<W> {
        if end_code {
            self.sink.write_all(&SEQUENCE_END_CODE)?;
            self.bytes_written += SEQUENCE_END_CODE.len() as u64;
            debug!("Appended sequence end code");
        }

        self.sink.flush()?;

        info!(
            "Finalized stream: {} packets, {} bytes",
            self.packets_written, self.bytes_written
        );

        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg::Packet;

    fn packet(data: &[u8]) -> EncodedPacket {
        EncodedPacket::from(Packet::copy(data))
    }

    #[test]
    fn preserves_emission_order() {
        let mut writer = ElementaryStreamWriter::new(Vec::new());
        let packets = [packet(&[1, 2]), packet(&[3]), packet(&[4, 5, 6])];

        writer.write_all(&packets).unwrap();

        assert_eq!(writer.packets_written(), 3);
        assert_eq!(writer.bytes_written(), 6);
        assert_eq!(writer.finalize(false).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn appends_end_code_only_on_request() {
        let mut writer = ElementaryStreamWriter::new(Vec::new());
        writer.write(&packet(&[9, 9])).unwrap();

        assert_eq!(
            writer.finalize(true).unwrap(),
            vec![9, 9, 0x00, 0x00, 0x01, 0xB7]
        );

        let writer = ElementaryStreamWriter::new(Vec::new());
        assert!(writer.finalize(false).unwrap().is_empty());
    }

    #[test]
    fn create_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.m1v");

        let mut writer = ElementaryStreamWriter::create(&path).unwrap();
        writer.write(&packet(&[7, 8])).unwrap();
        writer.finalize(true).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![7, 8, 0, 0, 1, 0xB7]);
    }
}
