use std::io;
use std::sync::{Arc, Mutex};

use ijvm_core::image::Image;
use ijvm_core::machine::Machine;

/// Build a constant pool from 32-bit words, big-endian, matching the image
/// format's `constant(i)` addressing (word i lives at byte offset `i*4`).
pub fn constant_pool(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// Build a machine directly from in-memory constant-pool words and text
/// bytes, skipping the on-disk image format entirely.
pub fn machine_from(words: &[u32], text: &[u8]) -> Machine {
    Machine::from_image(Image {
        constant_pool: constant_pool(words),
        text: text.to_vec(),
    })
}

/// A `Write` sink whose bytes can be inspected after being moved into a
/// machine via `set_output`, and a `Read` source preloaded with bytes for
/// `set_input`.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for SharedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut data = self.0.lock().unwrap();
        let n = buf.len().min(data.len());
        buf[..n].copy_from_slice(&data[..n]);
        data.drain(..n);
        Ok(n)
    }
}

pub fn input_with(bytes: &[u8]) -> SharedBuffer {
    let sink = SharedBuffer::new();
    sink.0.lock().unwrap().extend_from_slice(bytes);
    sink
}
