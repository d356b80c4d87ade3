//! Splits a byte stream of back-to-back HFP mSBC packets into 60-byte frames.

use std::io::{self, ErrorKind, Read};

use crate::audio::MSBC_PACKET_LEN;

pub type Packet = [u8; MSBC_PACKET_LEN];

/// Iterator over fixed-size mSBC packets read from `R`.
///
/// A clean end of stream stops the iteration. A trailing partial packet is
/// logged and dropped.
pub struct PacketReader<R: Read> {
    inner: R,
    packets: u64,
    done: bool,
}

impl<R: Read> PacketReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            packets: 0,
            done: false,
        }
    }

    /// Number of complete packets returned so far.
    pub fn packets_read(&self) -> u64 {
        self.packets
    }

    /// Fill `buf`, returning how many bytes were read before EOF.
    fn fill(&mut self, buf: &mut Packet) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = io::Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut packet = [0u8; MSBC_PACKET_LEN];
        match self.fill(&mut packet) {
            Ok(n) if n == MSBC_PACKET_LEN => {
                self.packets += 1;
                Some(Ok(packet))
            }
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                log::warn!(
                    "Dropping trailing partial packet: {} of {} bytes after {} packets",
                    n,
                    MSBC_PACKET_LEN,
                    self.packets
                );
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
