//! Platform hooks the conv2d driver is generic over.
//!
//! A board supplies an [`InstQueue`] for the MMIOX1 wrapper and a
//! [`CacheFlush`] barrier. The software fallback additionally needs a
//! [`MatrixMemory`] to read operands and write results.

use core::sync::atomic::{Ordering, fence};

use crate::{ConvError, DriverConfig, InstructionRecord, MemRegion};

/// Instruction queue in front of an accelerator.
pub trait InstQueue {
    /// Appends `insts` to the instruction FIFO and commits them with `flags`.
    fn push(&self, insts: &[InstructionRecord], flags: u32) -> Result<(), ConvError>;

    /// Raw status word, used for diagnostics.
    fn status(&self) -> u32;

    fn is_busy(&self) -> bool;

    /// Spins until the device reports idle or `config.poll_budget` polls
    /// have elapsed.
    fn wait_busy(&self, config: &DriverConfig) -> Result<(), ConvError> {
        for iteration in 0..config.poll_budget {
            if !self.is_busy() {
                fence(Ordering::Acquire);
                return Ok(());
            }

            if config.log_interval != 0 && iteration % config.log_interval == 0 {
                debug!("wait_busy: iter={} status={:#x}", iteration, self.status());
            }

            core::hint::spin_loop();
        }

        error!(
            "wait_busy timeout: polls={} status={:#x}",
            config.poll_budget,
            self.status()
        );
        Err(ConvError::DeviceTimeout {
            polls: config.poll_budget,
        })
    }
}

impl<Q: InstQueue + ?Sized> InstQueue for &Q {
    fn push(&self, insts: &[InstructionRecord], flags: u32) -> Result<(), ConvError> {
        (**self).push(insts, flags)
    }

    fn status(&self) -> u32 {
        (**self).status()
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn wait_busy(&self, config: &DriverConfig) -> Result<(), ConvError> {
        (**self).wait_busy(config)
    }
}

/// Makes CPU writes visible to a bus master outside the cache hierarchy.
pub trait CacheFlush {
    /// `regions` lists the buffers the device is about to access. A platform
    /// without ranged maintenance may flush everything.
    fn flush(&self, regions: &[MemRegion]);
}

/// Barrier for cache-coherent interconnects: a full fence is sufficient.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceFlush;

impl CacheFlush for FenceFlush {
    fn flush(&self, _regions: &[MemRegion]) {
        fence(Ordering::SeqCst);
    }
}

/// Byte-addressed view of device-visible memory.
pub trait MatrixMemory {
    fn read(&self, addr: u64, buf: &mut [u8]);

    fn write(&mut self, addr: u64, buf: &[u8]);
}
