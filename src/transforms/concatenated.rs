use smallvec::smallvec;

use crate::{MathTransform, Matrix, Result, ShortVec, Transformation};

/// How a concatenation passes the intermediate point between its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcatShape {
    /// Both steps are one-dimensional; the intermediate is a scalar.
    Direct1D,
    /// Both steps are two-dimensional; the intermediate is a coordinate pair.
    Direct2D,
    /// The intermediate point goes through a stack buffer.
    ///
    /// This also covers steps which keep the same dimension. `buf` cannot hold the
    /// intermediate, since no step reads and writes one slice. Up to [`crate::COORD_SIZE`]
    /// ordinates the buffer stays inline.
    Generic,
}

impl ConcatShape {
    fn choose(first: &MathTransform, second: &MathTransform) -> Self {
        let dims = [
            first.source_ndim(),
            first.target_ndim(),
            second.source_ndim(),
            second.target_ndim(),
        ];
        if dims.iter().all(|d| *d == 1) {
            ConcatShape::Direct1D
        } else if dims.iter().all(|d| *d == 2) {
            ConcatShape::Direct2D
        } else {
            ConcatShape::Generic
        }
    }
}

/// Apply `first`, then `second`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Concatenated {
    first: MathTransform,
    second: MathTransform,
    shape: ConcatShape,
}

impl Concatenated {
    /// Dimensions must already be checked.
    pub(crate) fn new(first: MathTransform, second: MathTransform) -> Self {
        let shape = ConcatShape::choose(&first, &second);
        Self {
            first,
            second,
            shape,
        }
    }

    pub fn first(&self) -> &MathTransform {
        &self.first
    }

    pub fn second(&self) -> &MathTransform {
        &self.second
    }

    pub fn shape(&self) -> ConcatShape {
        self.shape
    }

    /// All steps in application order, with nested concatenations flattened.
    pub fn steps(&self) -> Vec<MathTransform> {
        let mut out = Vec::with_capacity(2);
        for t in [&self.first, &self.second] {
            match t.kind() {
                crate::TransformKind::Concatenated(c) => out.extend(c.steps()),
                _ => out.push(t.clone()),
            }
        }
        out
    }
}

impl Transformation for Concatenated {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        match self.shape {
            ConcatShape::Direct1D => {
                buf[0] = self.second.eval_1d(self.first.eval_1d(pt[0])?)?;
            }
            ConcatShape::Direct2D => {
                let (x, y) = self.first.eval_2d(pt[0], pt[1])?;
                (buf[0], buf[1]) = self.second.eval_2d(x, y)?;
            }
            ConcatShape::Generic => {
                let mut mid: ShortVec<f64> = smallvec![f64::NAN; self.first.target_ndim()];
                self.first.eval(pt, &mut mid)?;
                self.second.eval(&mid, buf)?;
            }
        }
        Ok(())
    }

    /// Chain rule: the derivative of `second` at the intermediate point times that of `first`.
    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        let mid = match pt {
            Some(p) => {
                let mut mid: ShortVec<f64> = smallvec![f64::NAN; self.first.target_ndim()];
                self.first.eval(p, &mut mid)?;
                Some(mid)
            }
            None => None,
        };
        let d1 = self.first.derivative(pt)?;
        let d2 = self.second.derivative(mid.as_deref())?;
        d2.multiply(&d1)
    }

    fn source_ndim(&self) -> usize {
        self.first.source_ndim()
    }

    fn target_ndim(&self) -> usize {
        self.second.target_ndim()
    }
}
