//! Reference convolution running on the CPU.
//!
//! Used when no accelerator is present and as the golden model when
//! validating the hardware path. Unlike the hardware driver it honours the
//! padding field of the option word.

use spin::Mutex;

use crate::{
    ConvError, ConvOptions, MatrixConv, MatrixDataType, MatrixInfo, MatrixMemory, Operand,
    TranslateError,
};

pub struct SoftwareConv2d<M> {
    mem: Mutex<M>,
}

impl<M: MatrixMemory> SoftwareConv2d<M> {
    pub fn new(mem: M) -> Self {
        Self {
            mem: Mutex::new(mem),
        }
    }

    /// Runs `f` with the backing memory, e.g. to stage operands or read back
    /// results.
    pub fn with_memory<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.mem.lock())
    }

    pub fn into_inner(self) -> M {
        self.mem.into_inner()
    }
}

/// Output extent along one axis, `None` if the kernel does not fit.
fn out_extent(input: u32, kernel: u32, stride: u32, pad: u32) -> Option<u32> {
    input
        .checked_add(pad.checked_mul(2)?)?
        .checked_sub(kernel)
        .map(|span| span / stride + 1)
}

fn check_addressable(operand: Operand, info: &MatrixInfo) -> Result<(), ConvError> {
    match info.span() {
        Some(_) => Ok(()),
        None => Err(ConvError::Translation {
            operand,
            source: TranslateError::AddressOutOfRange {
                addr: info.addr,
                bits: u64::BITS,
            },
        }),
    }
}

fn load_int<M: MatrixMemory>(mem: &M, info: &MatrixInfo, row: u32, col: u32) -> i64 {
    let addr = info.elem_addr(row, col);
    match info.datatype {
        MatrixDataType::Fixed8 => {
            let mut b = [0u8; 1];
            mem.read(addr, &mut b);
            i8::from_le_bytes(b) as i64
        }
        MatrixDataType::Fixed16 => {
            let mut b = [0u8; 2];
            mem.read(addr, &mut b);
            i16::from_le_bytes(b) as i64
        }
        MatrixDataType::Fixed32 => {
            let mut b = [0u8; 4];
            mem.read(addr, &mut b);
            i32::from_le_bytes(b) as i64
        }
        MatrixDataType::Float32 => load_float(mem, info, row, col) as i64,
    }
}

fn load_float<M: MatrixMemory>(mem: &M, info: &MatrixInfo, row: u32, col: u32) -> f32 {
    match info.datatype {
        MatrixDataType::Float32 => {
            let mut b = [0u8; 4];
            mem.read(info.elem_addr(row, col), &mut b);
            f32::from_le_bytes(b)
        }
        _ => load_int(mem, info, row, col) as f32,
    }
}

fn store<M: MatrixMemory>(mem: &mut M, info: &MatrixInfo, row: u32, col: u32, acc: Acc) {
    let addr = info.elem_addr(row, col);
    match (info.datatype, acc) {
        (MatrixDataType::Float32, Acc::Int(v)) => mem.write(addr, &(v as f32).to_le_bytes()),
        (MatrixDataType::Float32, Acc::Float(v)) => mem.write(addr, &v.to_le_bytes()),
        (ty, acc) => {
            let v = match acc {
                Acc::Int(v) => v,
                Acc::Float(v) => v as i64,
            };
            match ty {
                MatrixDataType::Fixed8 => mem.write(addr, &(v as i8).to_le_bytes()),
                MatrixDataType::Fixed16 => mem.write(addr, &(v as i16).to_le_bytes()),
                _ => mem.write(addr, &(v as i32).to_le_bytes()),
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Acc {
    Int(i64),
    Float(f32),
}

impl<M: MatrixMemory> MatrixConv for SoftwareConv2d<M> {
    fn name(&self) -> &'static str {
        "SW"
    }

    fn conv2d(
        &self,
        input: &MatrixInfo,
        kernel: &MatrixInfo,
        output: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError> {
        let opts = ConvOptions::try_from_bits(options)?;
        let (stride, pad) = (opts.stride(), opts.pad());

        check_addressable(Operand::Input, input)?;
        check_addressable(Operand::Kernel, kernel)?;
        check_addressable(Operand::Output, output)?;

        let expected = out_extent(input.num_row, kernel.num_row, stride, pad)
            .zip(out_extent(input.num_col, kernel.num_col, stride, pad));
        match expected {
            Some((rows, cols)) if rows == output.num_row && cols == output.num_col => {}
            _ => {
                let (expected_rows, expected_cols) = expected.unwrap_or((0, 0));
                return Err(ConvError::ShapeMismatch {
                    rows: output.num_row,
                    cols: output.num_col,
                    expected_rows,
                    expected_cols,
                });
            }
        }

        let float = [input.datatype, kernel.datatype, output.datatype]
            .contains(&MatrixDataType::Float32);
        let mut mem = self.mem.lock();

        for orow in 0..output.num_row {
            for ocol in 0..output.num_col {
                let mut acc = if float { Acc::Float(0.0) } else { Acc::Int(0) };
                for krow in 0..kernel.num_row {
                    let Some(irow) = (orow * stride + krow).checked_sub(pad) else {
                        continue;
                    };
                    if irow >= input.num_row {
                        continue;
                    }
                    for kcol in 0..kernel.num_col {
                        let Some(icol) = (ocol * stride + kcol).checked_sub(pad) else {
                            continue;
                        };
                        if icol >= input.num_col {
                            continue;
                        }
                        acc = match acc {
                            Acc::Int(sum) => Acc::Int(
                                sum.wrapping_add(
                                    load_int(&*mem, input, irow, icol)
                                        .wrapping_mul(load_int(&*mem, kernel, krow, kcol)),
                                ),
                            ),
                            Acc::Float(sum) => Acc::Float(
                                sum + load_float(&*mem, input, irow, icol)
                                    * load_float(&*mem, kernel, krow, kcol),
                            ),
                        };
                    }
                }
                store(&mut *mem, output, orow, ocol, acc);
            }
        }

        Ok(())
    }
}
