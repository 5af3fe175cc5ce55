//! Matrix operation mapping: the table through which applications reach
//! whichever backend the platform bound at startup.

use alloc::boxed::Box;

use crate::{ConvError, MatrixInfo};

/// Matrix operations that can be mapped to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MatrixOp {
    Conv2d,
}

/// A backend able to run a 2-D convolution.
pub trait MatrixConv {
    /// Short backend name, e.g. `"HW"`.
    fn name(&self) -> &'static str;

    /// Convolves `input` with `kernel` into the buffer described by
    /// `output`. `options` is the raw option word (see [`ConvOptions`]).
    ///
    /// [`ConvOptions`]: crate::ConvOptions
    fn conv2d(
        &self,
        input: &MatrixInfo,
        kernel: &MatrixInfo,
        output: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError>;
}

impl<C: MatrixConv + ?Sized> MatrixConv for &C {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn conv2d(
        &self,
        input: &MatrixInfo,
        kernel: &MatrixInfo,
        output: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError> {
        (**self).conv2d(input, kernel, output, options)
    }
}

pub type BoxedConv = Box<dyn MatrixConv + Send + Sync>;

/// Operation mapping table, populated once by platform integration.
#[derive(Default)]
pub struct MopMapping {
    matrix_conv: Option<BoxedConv>,
}

impl MopMapping {
    pub const fn new() -> Self {
        Self { matrix_conv: None }
    }

    /// Binds `backend` to `op`, returning the previously bound backend.
    pub fn bind(&mut self, op: MatrixOp, backend: BoxedConv) -> Option<BoxedConv> {
        info!("mapping {:?} to {}", op, backend.name());
        match op {
            MatrixOp::Conv2d => self.matrix_conv.replace(backend),
        }
    }

    pub fn unbind(&mut self, op: MatrixOp) -> Option<BoxedConv> {
        match op {
            MatrixOp::Conv2d => self.matrix_conv.take(),
        }
    }

    /// Name of the backend bound to `op`.
    pub fn backend_name(&self, op: MatrixOp) -> Option<&'static str> {
        match op {
            MatrixOp::Conv2d => self.matrix_conv.as_ref().map(|c| c.name()),
        }
    }

    pub fn invoke(
        &self,
        op: MatrixOp,
        input: &MatrixInfo,
        kernel: &MatrixInfo,
        output: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError> {
        match op {
            MatrixOp::Conv2d => self
                .matrix_conv
                .as_ref()
                .ok_or(ConvError::Unbound(op))?
                .conv2d(input, kernel, output, options),
        }
    }

    pub fn matrix_conv(
        &self,
        input: &MatrixInfo,
        kernel: &MatrixInfo,
        output: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError> {
        self.invoke(MatrixOp::Conv2d, input, kernel, output, options)
    }
}

impl core::fmt::Debug for MopMapping {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MopMapping")
            .field("matrix_conv", &self.backend_name(MatrixOp::Conv2d))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatrixDataType;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(&'static AtomicUsize);

    impl MatrixConv for Counting {
        fn name(&self) -> &'static str {
            "COUNT"
        }

        fn conv2d(
            &self,
            _input: &MatrixInfo,
            _kernel: &MatrixInfo,
            _output: &mut MatrixInfo,
            _options: u32,
        ) -> Result<(), ConvError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn operands() -> (MatrixInfo, MatrixInfo, MatrixInfo) {
        (
            MatrixInfo::new(0x1000, 4, 4, MatrixDataType::Fixed32),
            MatrixInfo::new(0x2000, 3, 3, MatrixDataType::Fixed32),
            MatrixInfo::new(0x3000, 2, 2, MatrixDataType::Fixed32),
        )
    }

    #[test]
    fn invoke_without_binding_is_unbound() {
        let mop = MopMapping::new();
        let (mi, mk, mut mo) = operands();

        assert_eq!(
            mop.matrix_conv(&mi, &mk, &mut mo, 0),
            Err(ConvError::Unbound(MatrixOp::Conv2d))
        );
    }

    #[test]
    fn rebinding_switches_backend() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);
        let mut mop = MopMapping::new();
        let (mi, mk, mut mo) = operands();

        assert!(mop.bind(MatrixOp::Conv2d, Box::new(Counting(&FIRST))).is_none());
        mop.matrix_conv(&mi, &mk, &mut mo, 0).unwrap();
        let old = mop.bind(MatrixOp::Conv2d, Box::new(Counting(&SECOND)));
        assert_eq!(old.map(|c| c.name()), Some("COUNT"));
        mop.matrix_conv(&mi, &mk, &mut mo, 0).unwrap();

        assert_eq!(FIRST.load(Ordering::Relaxed), 1);
        assert_eq!(SECOND.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unbind_restores_unbound_state() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut mop = MopMapping::new();
        mop.bind(MatrixOp::Conv2d, Box::new(Counting(&CALLS)));
        assert_eq!(mop.backend_name(MatrixOp::Conv2d), Some("COUNT"));

        assert!(mop.unbind(MatrixOp::Conv2d).is_some());
        assert_eq!(mop.backend_name(MatrixOp::Conv2d), None);
    }
}
