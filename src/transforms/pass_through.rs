use crate::{MathTransform, Matrix, Result, Transformation};

/// Apply `inner` to the ordinates `[first, first + inner.source_ndim())`
/// and copy the `first` leading and `trailing` trailing ordinates unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassThrough {
    first: usize,
    inner: MathTransform,
    trailing: usize,
}

impl PassThrough {
    pub(crate) fn new(first: usize, inner: MathTransform, trailing: usize) -> Self {
        Self {
            first,
            inner,
            trailing,
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn inner(&self) -> &MathTransform {
        &self.inner
    }

    pub fn trailing(&self) -> usize {
        self.trailing
    }
}

impl Transformation for PassThrough {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        let src_end = self.first + self.inner.source_ndim();
        let tgt_end = self.first + self.inner.target_ndim();
        buf[..self.first].copy_from_slice(&pt[..self.first]);
        buf[tgt_end..].copy_from_slice(&pt[src_end..]);
        self.inner
            .eval(&pt[self.first..src_end], &mut buf[self.first..tgt_end])
    }

    /// Block diagonal, with identity blocks around the inner derivative.
    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        let inner_src = self.inner.source_ndim();
        let inner_tgt = self.inner.target_ndim();
        let inner_pt = pt.map(|p| &p[self.first..self.first + inner_src]);
        let d = self.inner.derivative(inner_pt)?;

        let mut out = Matrix::zeros(self.target_ndim(), self.source_ndim());
        for i in 0..self.first {
            out[(i, i)] = 1.0;
        }
        out.copy_block(&d, 0, 0, self.first, self.first, inner_tgt, inner_src);
        for i in 0..self.trailing {
            out[(self.first + inner_tgt + i, self.first + inner_src + i)] = 1.0;
        }
        Ok(out)
    }

    fn source_ndim(&self) -> usize {
        self.first + self.inner.source_ndim() + self.trailing
    }

    fn target_ndim(&self) -> usize {
        self.first + self.inner.target_ndim() + self.trailing
    }
}
