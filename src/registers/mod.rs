//! MMIOX1 wrapper in front of the conv2d core. Instruction words go through a
//! FIFO port and are released by the commit register; the status word
//! reports whether the core is busy and whether the FIFO can take more.

use core::{
    ops::Deref,
    ptr::NonNull,
    sync::atomic::{Ordering, fence},
};

use spin::Mutex;
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_structs,
    registers::*,
};

use crate::{ConvError, INST_WORDS, InstQueue, InstructionRecord, MmioxParams};

pub mod consts;

use consts::INST_FULL_POLLS;

register_structs! {
    pub Mmiox1Regs {
        (0x0000 => pub version: ReadOnly<u32>),
        (0x0004 => pub status: ReadOnly<u32, STATUS::Register>),
        (0x0008 => pub config: ReadWrite<u32>),
        (0x000C => pub inst_fifo: WriteOnly<u32>),
        (0x0010 => pub inst_commit: WriteOnly<u32, COMMIT::Register>),
        (0x0014 => pub log_fifo: ReadOnly<u32>),
        (0x0018 => @END),
    }
}

tock_registers::register_bitfields! {u32,
    pub STATUS [
        BUSY OFFSET(0) NUMBITS(1) [],
        INST_FULL OFFSET(1) NUMBITS(1) [],
        INST_EMPTY OFFSET(2) NUMBITS(1) [],
        LOG_VALID OFFSET(3) NUMBITS(1) []
    ],

    pub COMMIT [
        COUNT OFFSET(0) NUMBITS(16) [],
        FLAGS OFFSET(16) NUMBITS(16) []
    ]
}

/// Instruction queue of one MMIOX1 instance.
///
/// Pushes are serialized internally, so the words of two records never
/// interleave in the FIFO even when a shared reference is used from several
/// threads.
pub struct Mmiox1 {
    base: NonNull<Mmiox1Regs>,
    inst_words: usize,
    fifo_lock: Mutex<()>,
}

unsafe impl Send for Mmiox1 {}
// Register reads are side-effect free; FIFO writes happen under `fifo_lock`.
unsafe impl Sync for Mmiox1 {}

impl Mmiox1 {
    /// Creates a queue over a mapped MMIOX1 register window.
    ///
    /// # Safety
    ///
    /// `base` must be the mapped, aligned address of the MMIOX1 register file
    /// and stay valid for the lifetime of the returned value.
    pub unsafe fn new(base: NonNull<u8>, params: &MmioxParams) -> Result<Self, ConvError> {
        if params.inst_words() < INST_WORDS {
            return Err(ConvError::InvalidHardwareParameters("bw_inst"));
        }
        if params.inst_fifo_depth == 0 {
            return Err(ConvError::InvalidHardwareParameters("inst_fifo_depth"));
        }

        Ok(Self {
            base: base.cast(),
            inst_words: params.inst_words(),
            fifo_lock: Mutex::new(()),
        })
    }

    pub fn version(&self) -> u32 {
        self.version.get()
    }

    /// Pops one entry of the log FIFO, if the core produced any.
    pub fn read_log(&self) -> Option<u32> {
        self.status
            .is_set(STATUS::LOG_VALID)
            .then(|| self.log_fifo.get())
    }

    fn wait_not_full(&self) -> Result<(), ConvError> {
        for _ in 0..INST_FULL_POLLS {
            if !self.status.is_set(STATUS::INST_FULL) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        warn!("instruction fifo stayed full, status={:#x}", self.status.get());
        Err(ConvError::QueueFull)
    }
}

impl Deref for Mmiox1 {
    type Target = Mmiox1Regs;

    fn deref(&self) -> &Self::Target {
        unsafe { self.base.as_ref() }
    }
}

impl InstQueue for Mmiox1 {
    fn push(&self, insts: &[InstructionRecord], flags: u32) -> Result<(), ConvError> {
        let _fifo = self.fifo_lock.lock();
        for inst in insts {
            self.wait_not_full()?;
            let words = inst.to_words();
            for &word in &words {
                self.inst_fifo.set(word);
            }
            // the FIFO port is bw_inst wide; pad the record to a full entry
            for _ in words.len()..self.inst_words {
                self.inst_fifo.set(0);
            }
        }

        fence(Ordering::Release);
        self.inst_commit
            .write(COMMIT::COUNT.val(insts.len() as u32) + COMMIT::FLAGS.val(flags));
        Ok(())
    }

    fn status(&self) -> u32 {
        self.status.get()
    }

    fn is_busy(&self) -> bool {
        self.status.is_set(STATUS::BUSY)
    }
}
