use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::Error;

/// Small staging buffer used to bring a few words from the GPU back to the
/// host without stalling the frame.
///
/// Each frame copies into whichever slot is idle; slots are mapped only
/// after the frame has been submitted, so results are at least one frame
/// stale.
#[derive(Debug)]
pub struct ReadbackBuffer {
    slots: Vec<ReadbackSlot>,
    size: usize,
    next_serial: AtomicU64,

    /// Serial of the copy the words come from, and the words themselves
    last: Option<(u64, Vec<u32>)>,
}

#[derive(Debug)]
struct ReadbackSlot {
    buffer: wgpu::Buffer,
    state: Arc<AtomicU32>,

    /// Serial of the copy recorded into this slot; later copies get larger
    /// serials
    serial: AtomicU64,
}

impl ReadbackSlot {
    const IDLE: u32 = 0;
    const COPIED: u32 = 1;
    const MAPPING: u32 = 2;
    const MAPPED: u32 = 3;
    const FAILED: u32 = 4;

    fn state(&self) -> u32 {
        self.state.load(Ordering::Acquire)
    }

    fn set_state(&self, state: u32) {
        self.state.store(state, Ordering::Release);
    }
}

impl ReadbackBuffer {
    const SLOTS: usize = 2;

    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
    ) -> Self {
        let label = label.as_ref();

        info!(
            "Allocating readback buffer `{label}`; size={size}, slots={}",
            Self::SLOTS
        );

        assert!(size > 0 && size % 4 == 0);

        let slots = (0..Self::SLOTS)
            .map(|slot| ReadbackSlot {
                buffer: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{label}_{slot}")),
                    usage: wgpu::BufferUsages::MAP_READ
                        | wgpu::BufferUsages::COPY_DST,
                    size: size as _,
                    mapped_at_creation: false,
                }),
                state: Arc::new(AtomicU32::new(ReadbackSlot::IDLE)),
                serial: AtomicU64::new(0),
            })
            .collect();

        Self {
            slots,
            size,
            next_serial: AtomicU64::new(0),
            last: None,
        }
    }

    /// Records a copy of `size` bytes, starting at `offset`, into an idle
    /// slot; does nothing if all slots are still in flight.
    pub fn copy_from(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::Buffer,
        offset: u64,
    ) {
        let Some(slot) = self
            .slots
            .iter()
            .find(|slot| slot.state() == ReadbackSlot::IDLE)
        else {
            debug!("Skipping readback; all slots are busy");
            return;
        };

        encoder.copy_buffer_to_buffer(
            source,
            offset,
            &slot.buffer,
            0,
            self.size as _,
        );

        slot.serial.store(
            self.next_serial.fetch_add(1, Ordering::Relaxed),
            Ordering::Relaxed,
        );

        slot.set_state(ReadbackSlot::COPIED);
    }

    /// Must be called after the encoder passed to [`Self::copy_from()`] has
    /// been submitted.
    pub fn poll(&mut self, device: &wgpu::Device) -> Result<(), Error> {
        for slot in &self.slots {
            if slot.state() != ReadbackSlot::COPIED {
                continue;
            }

            slot.set_state(ReadbackSlot::MAPPING);

            let state = Arc::clone(&slot.state);

            slot.buffer
                .slice(..)
                .map_async(wgpu::MapMode::Read, move |result| {
                    let new_state = if result.is_ok() {
                        ReadbackSlot::MAPPED
                    } else {
                        ReadbackSlot::FAILED
                    };

                    state.store(new_state, Ordering::Release);
                });
        }

        device.poll(wgpu::Maintain::Poll);

        let mut failed = false;

        for slot in &self.slots {
            match slot.state() {
                ReadbackSlot::MAPPED => {
                    let words = {
                        let view = slot.buffer.slice(..).get_mapped_range();

                        bytemuck::cast_slice::<u8, u32>(&view).to_vec()
                    };

                    slot.buffer.unmap();
                    slot.set_state(ReadbackSlot::IDLE);

                    keep_newest(
                        &mut self.last,
                        slot.serial.load(Ordering::Relaxed),
                        words,
                    );
                }

                ReadbackSlot::FAILED => {
                    slot.set_state(ReadbackSlot::IDLE);
                    failed = true;
                }

                _ => (),
            }
        }

        if failed {
            Err(Error::ReadbackFailed)
        } else {
            Ok(())
        }
    }

    /// Returns words of the most recent copy that has been mapped, if any.
    pub fn last(&self) -> Option<&[u32]> {
        self.last.as_ref().map(|(_, words)| words.as_slice())
    }
}

/// Slots can get mapped out of order (e.g. two of them within the same
/// poll), so older copies must not override newer ones.
fn keep_newest(
    last: &mut Option<(u64, Vec<u32>)>,
    serial: u64,
    words: Vec<u32>,
) {
    if last.as_ref().map_or(true, |(last, _)| serial > *last) {
        *last = Some((serial, words));
    }
}
