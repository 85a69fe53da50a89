// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Kernel-shared frame buffers.
//!
//! The [`BufferPool`] owns every mapping for the lifetime of an allocation.
//! Between [`dequeue`](crate::capture::CaptureDevice::dequeue) and
//! [`enqueue`](crate::capture::CaptureDevice::enqueue) a buffer is lent to the
//! application as a [`FrameBuffer`], a moved value that cannot be cloned, so
//! handing the same frame back twice does not compile:
//!
//! ```compile_fail
//! # use framegrab::capture::CaptureDevice;
//! # fn demo(dev: &mut CaptureDevice) -> Result<(), framegrab::Error> {
//! let frame = dev.dequeue()?;
//! dev.enqueue(frame)?;
//! dev.enqueue(frame)?; // use of moved value
//! # Ok(())
//! # }
//! ```
//!
//! Stale handles (from a pool that has since been released and reallocated)
//! are detected at runtime through a per-allocation generation number.

use std::{
    fmt, io,
    os::fd::RawFd,
    ptr::NonNull,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use unix_ts::Timestamp;

use crate::{adapter::ProtocolAdapter, Error};

enum Backing {
    Mmap,
    Heap,
}

/// A contiguous memory region shared with the device.
///
/// Device buffers are `mmap`ed from the device file and unmapped on drop.
/// Heap regions stand in for device memory in the simulator.
pub struct MappedRegion {
    ptr: NonNull<u8>,
    len: usize,
    backing: Backing,
}

// The region is plain memory; access is serialised by the buffer state machine.
unsafe impl Send for MappedRegion {}
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// Maps `len` bytes of device memory at `offset` of the device file.
    pub fn map(fd: RawFd, len: usize, offset: i64) -> io::Result<MappedRegion> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map an empty buffer",
            ));
        }

        // SAFETY: a fresh shared mapping at a kernel-chosen address does not
        // alias any existing Rust object.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::other("mmap returned null"))?;
        Ok(MappedRegion {
            ptr,
            len,
            backing: Backing::Mmap,
        })
    }

    /// Allocates a zeroed heap region of `len` bytes.
    pub fn heap(len: usize) -> MappedRegion {
        let boxed = vec![0u8; len.max(1)].into_boxed_slice();
        let len = boxed.len();
        let raw = Box::into_raw(boxed) as *mut u8;
        MappedRegion {
            // SAFETY: Box::into_raw never returns null.
            ptr: unsafe { NonNull::new_unchecked(raw) },
            len,
            backing: Backing::Heap,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        match self.backing {
            Backing::Mmap => {
                // SAFETY: ptr and len are exactly what mmap returned.
                let ret = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) };
                if ret == -1 {
                    log::error!("munmap failed: {}", io::Error::last_os_error());
                }
            }
            Backing::Heap => {
                // SAFETY: ptr and len came from Box::into_raw of a boxed slice.
                unsafe {
                    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                        self.ptr.as_ptr(),
                        self.len,
                    )))
                };
            }
        }
    }
}

impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// One buffer's window into a mapped region.
///
/// V2 devices map each buffer separately; V1 devices map one region that
/// holds every frame, so several mappings may share a region.
#[derive(Clone, Debug)]
pub struct Mapping {
    region: Arc<MappedRegion>,
    offset: usize,
    len: usize,
}

impl Mapping {
    /// A mapping covering the whole region.
    pub fn whole(region: MappedRegion) -> Mapping {
        let len = region.len();
        Mapping {
            region: Arc::new(region),
            offset: 0,
            len,
        }
    }

    /// A mapping of `len` bytes at `offset` within a shared region.
    pub fn slice(region: &Arc<MappedRegion>, offset: usize, len: usize) -> io::Result<Mapping> {
        match offset.checked_add(len) {
            Some(end) if end <= region.len() => Ok(Mapping {
                region: region.clone(),
                offset,
                len,
            }),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "buffer {}+{} outside mapped region of {} bytes",
                    offset,
                    len,
                    region.len()
                ),
            )),
        }
    }

    /// Capacity in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn region(&self) -> &Arc<MappedRegion> {
        &self.region
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        // SAFETY: offset + len was checked against the region at construction.
        unsafe { self.region.as_ptr().add(self.offset) }
    }
}

/// Ownership state of one pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Mapped but not handed to the device
    Idle,
    /// Owned jointly with the device, waiting to be filled
    Queued,
    /// Lent to the application as a [`FrameBuffer`]
    Dequeued,
}

#[derive(Debug)]
struct Slot {
    mapping: Mapping,
    state: SlotState,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A fixed set of mapped frame buffers.
#[derive(Debug)]
pub struct BufferPool {
    slots: Vec<Slot>,
    requested: u32,
    generation: u64,
}

impl BufferPool {
    /// Reserves up to `count` buffers and maps every granted one.
    ///
    /// The device may grant fewer buffers than requested; fewer than two is
    /// [`Error::InvalidBufferCount`]. If any buffer fails to map, the ones
    /// already mapped are unmapped again and the reservation is returned to
    /// the device, so either every granted buffer is mapped or none is.
    pub fn allocate(adapter: &mut dyn ProtocolAdapter, count: u32) -> Result<BufferPool, Error> {
        let granted = adapter
            .request_buffers(count)
            .map_err(Error::BufferAllocationFailed)?;
        log::debug!("requested {} buffers, granted {}", count, granted);

        if granted < 2 {
            if let Err(err) = adapter.release_buffers() {
                log::warn!("cannot return buffer reservation: {}", err);
            }
            return Err(Error::InvalidBufferCount {
                requested: count,
                granted,
            });
        }

        let mut slots = Vec::with_capacity(granted as usize);
        for index in 0..granted {
            match adapter.map_buffer(index) {
                Ok(mapping) => slots.push(Slot {
                    mapping,
                    state: SlotState::Idle,
                }),
                Err(err) => {
                    log::error!("cannot map buffer {} of {}: {}", index, granted, err);
                    drop(slots);
                    if let Err(err) = adapter.release_buffers() {
                        log::warn!("cannot return buffer reservation: {}", err);
                    }
                    return Err(Error::BufferAllocationFailed(err));
                }
            }
        }

        Ok(BufferPool {
            slots,
            requested: count,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Unmaps every buffer and returns the reservation to the device.
    ///
    /// Consuming the pool makes a second release impossible. The caller must
    /// have stopped streaming.
    pub fn release(self, adapter: &mut dyn ProtocolAdapter) -> Result<(), Error> {
        log::debug!("releasing {} buffers", self.slots.len());
        drop(self.slots);
        adapter.release_buffers().map_err(Error::Io)
    }

    /// Number of granted buffers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buffers originally asked for.
    pub fn requested(&self) -> u32 {
        self.requested
    }

    pub fn state(&self, index: u32) -> Option<SlotState> {
        self.slots.get(index as usize).map(|slot| slot.state)
    }

    /// Capacity of buffer `index` in bytes.
    pub fn capacity(&self, index: u32) -> Option<usize> {
        self.slots.get(index as usize).map(|slot| slot.mapping.len())
    }

    /// Number of buffers currently lent out as [`FrameBuffer`]s.
    pub fn outstanding(&self) -> usize {
        self.count(SlotState::Dequeued)
    }

    pub fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|slot| slot.state == state).count()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_state(&mut self, index: u32, state: SlotState) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            slot.state = state;
        }
    }

    /// Moves every slot in state `from` to `to`.
    pub(crate) fn reset(&mut self, from: SlotState, to: SlotState) {
        for slot in self.slots.iter_mut().filter(|slot| slot.state == from) {
            slot.state = to;
        }
    }

    pub(crate) fn indices(&self, state: SlotState) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == state)
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Lends buffer `index` to the application.
    pub(crate) fn lend(
        &mut self,
        index: u32,
        bytes_used: u32,
        sequence: u32,
        timestamp: Timestamp,
    ) -> io::Result<FrameBuffer> {
        let generation = self.generation;
        let slot = self
            .slots
            .get_mut(index as usize)
            .filter(|slot| slot.state == SlotState::Queued)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("device returned buffer {} which was not queued", index),
                )
            })?;
        slot.state = SlotState::Dequeued;
        Ok(FrameBuffer {
            index,
            generation,
            bytes_used: (bytes_used as usize).min(slot.mapping.len()),
            sequence,
            timestamp,
            mapping: slot.mapping.clone(),
        })
    }
}

/// A filled frame, exclusively owned by the application until it is handed
/// back with [`enqueue`](crate::capture::CaptureDevice::enqueue).
pub struct FrameBuffer {
    index: u32,
    generation: u64,
    bytes_used: usize,
    sequence: u32,
    timestamp: Timestamp,
    mapping: Mapping,
}

impl FrameBuffer {
    /// Device buffer index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Frame counter reported by the device.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Bytes of image data in the buffer.
    pub fn len(&self) -> usize {
        self.bytes_used
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_used == 0
    }

    /// Full size of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.mapping.len()
    }

    pub fn data(&self) -> &[u8] {
        // SAFETY: the slot is in the Dequeued state, so the device does not
        // write to it until this handle is enqueued, and bytes_used is clamped
        // to the mapping length.
        unsafe { std::slice::from_raw_parts(self.mapping.as_ptr(), self.bytes_used) }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        // SAFETY: as for data(); &mut self makes this the only view.
        unsafe { std::slice::from_raw_parts_mut(self.mapping.as_ptr(), self.bytes_used) }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("index", &self.index)
            .field("sequence", &self.sequence)
            .field("bytes_used", &self.bytes_used)
            .field("capacity", &self.mapping.len())
            .finish()
    }
}

impl fmt::Display for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "buffer {} seq {} {}/{} bytes",
            self.index,
            self.sequence,
            self.bytes_used,
            self.mapping.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedDevice;

    #[test]
    fn test_allocate_granted_count() -> Result<(), Error> {
        for granted in 2..8 {
            let mut sim = SimulatedDevice::new().with_granted_buffers(granted);
            let pool = BufferPool::allocate(&mut sim, 8)?;
            assert_eq!(pool.len(), granted as usize);
            assert_eq!(pool.requested(), 8);
            assert_eq!(sim.live_mappings(), granted as usize);
            assert_eq!(pool.count(SlotState::Idle), granted as usize);

            pool.release(&mut sim)?;
            assert_eq!(sim.live_mappings(), 0);
        }
        Ok(())
    }

    #[test]
    fn test_allocate_too_few() {
        let mut sim = SimulatedDevice::new().with_granted_buffers(1);
        let err = BufferPool::allocate(&mut sim, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBufferCount {
                requested: 4,
                granted: 1
            }
        ));
        assert_eq!(sim.live_mappings(), 0);
        assert_eq!(sim.reserved_buffers(), 0);
    }

    #[test]
    fn test_mapping_failure_unwinds() {
        let mut sim = SimulatedDevice::new()
            .with_granted_buffers(4)
            .fail_map_at(2);
        let err = BufferPool::allocate(&mut sim, 4).unwrap_err();
        assert!(matches!(err, Error::BufferAllocationFailed(_)));
        assert_eq!(sim.live_mappings(), 0);
        assert_eq!(sim.reserved_buffers(), 0);
    }

    #[test]
    fn test_heap_region_slices() -> io::Result<()> {
        let region = Arc::new(MappedRegion::heap(300));
        let a = Mapping::slice(&region, 0, 100)?;
        let b = Mapping::slice(&region, 100, 200)?;
        assert_eq!(a.len(), 100);
        assert_eq!(b.len(), 200);
        assert!(Mapping::slice(&region, 250, 100).is_err());
        assert_eq!(Arc::strong_count(&region), 3);
        Ok(())
    }
}
