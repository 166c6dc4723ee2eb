use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::{Index, IndexMut},
};

use ordered_float::OrderedFloat;

use crate::{Result, TransformError};

/// Dense row-major matrix.
///
/// An affine transform from N to M dimensions is represented by an
/// `(M+1)×(N+1)` matrix whose last row is `[0, …, 0, 1]`.
/// Other last rows are permitted and describe a projective transform,
/// applied with a homogeneous division.
#[derive(Debug, Clone)]
pub struct Matrix {
    /// Row-major / C-ordered matrix data.
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl AsRef<Matrix> for Matrix {
    fn as_ref(&self) -> &Matrix {
        self
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        self.get(index.0, index.1)
            .expect("index should be in bounds")
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        assert!(index.0 < self.nrows && index.1 < self.ncols, "index should be in bounds");
        &mut self.data[index.0 * self.ncols + index.1]
    }
}

/// Element-wise equality where `NaN == NaN` and `-0.0 == 0.0`,
/// consistent with [Hash].
impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| OrderedFloat(*a) == OrderedFloat(*b))
    }
}

impl Eq for Matrix {}

impl Hash for Matrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nrows.hash(state);
        self.ncols.hash(state);
        for v in self.data.iter() {
            OrderedFloat(*v).hash(state);
        }
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.nrows {
            write!(f, "[")?;
            for c in 0..self.ncols {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self[(r, c)])?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

impl Matrix {
    pub fn builder(row_vecs: bool) -> MatrixBuilder {
        MatrixBuilder::new(row_vecs)
    }

    /// Row-major/ C order data
    pub fn try_new(data: Vec<f64>, ncols: usize) -> Result<Self> {
        if ncols == 0 || data.len() % ncols != 0 {
            return Err(TransformError::InvalidParameter(format!(
                "Matrix data length {} is not divisible by ncols {}",
                data.len(),
                ncols
            )));
        }
        let nrows = data.len() / ncols;
        Ok(Self { data, nrows, ncols })
    }

    pub fn try_new_colmaj(data: Vec<f64>, nrows: usize) -> Result<Self> {
        if nrows == 0 || data.len() % nrows != 0 {
            return Err(TransformError::InvalidParameter(format!(
                "Matrix data length {} is not divisible by nrows {}",
                data.len(),
                nrows
            )));
        }
        let ncols = data.len() / nrows;
        Ok(Matrix {
            data,
            nrows: ncols,
            ncols: nrows,
        }
        .transpose())
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Ones on the main diagonal, zeros elsewhere; need not be square.
    pub fn identity(nrows: usize, ncols: usize) -> Self {
        let mut m = Self::zeros(nrows, ncols);
        for i in 0..nrows.min(ncols) {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Augmented matrix of an affine transform in `ndim` dimensions
    /// with the given diagonal scale and translation.
    pub fn scale_translate(scale: &[f64], translate: &[f64]) -> Result<Self> {
        TransformError::check_dim(scale.len(), translate.len())?;
        let n = scale.len();
        let mut m = Self::identity(n + 1, n + 1);
        for (i, (s, t)) in scale.iter().zip(translate.iter()).enumerate() {
            m[(i, i)] = *s;
            m[(i, n)] = *t;
        }
        Ok(m)
    }

    pub fn transpose(&self) -> Matrix {
        let mut data = vec![0.0; self.data.len()];
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                data[c * self.nrows + r] = self[(r, c)];
            }
        }
        Matrix {
            data,
            nrows: self.ncols,
            ncols: self.nrows,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&f64> {
        if col >= self.ncols {
            return None;
        }
        self.data.get(row * self.ncols + col)
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.ncols;
        &self.data[start..start + self.ncols]
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Whether the last row is `[0, …, 0, 1]`.
    pub fn is_affine(&self) -> bool {
        if self.nrows == 0 {
            return false;
        }
        let last = self.row(self.nrows - 1);
        let (one, zeros) = last.split_last().expect("matrix has at least one column");
        *one == 1.0 && zeros.iter().all(|v| *v == 0.0)
    }

    /// Exact test; the matrix must be square.
    pub fn is_identity(&self) -> bool {
        self.is_identity_within(0.0)
    }

    pub fn is_identity_within(&self, tolerance: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        self.data.iter().enumerate().all(|(idx, v)| {
            let expected = if idx / self.ncols == idx % self.ncols { 1.0 } else { 0.0 };
            (v - expected).abs() <= tolerance
        })
    }

    /// Matrix product `self × other`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        TransformError::check_dim(self.ncols, other.nrows)?;
        let mut out = Matrix::zeros(self.nrows, other.ncols);
        for r in 0..self.nrows {
            let row = self.row(r);
            for c in 0..other.ncols {
                let mut acc = 0.0;
                for (k, v) in row.iter().enumerate() {
                    acc += v * other[(k, c)];
                }
                out[(r, c)] = acc;
            }
        }
        Ok(out)
    }

    /// Gauss-Jordan elimination with partial pivoting.
    pub fn inverse(&self) -> Result<Matrix> {
        if !self.is_square() {
            return Err(TransformError::NonInvertible(format!(
                "{}×{} matrix is not square",
                self.nrows, self.ncols
            )));
        }
        let n = self.nrows;
        let scale = self.data.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let threshold = scale * f64::EPSILON * n as f64;
        let mut work = self.clone();
        let mut inv = Matrix::identity(n, n);

        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|a, b| work[(*a, col)].abs().total_cmp(&work[(*b, col)].abs()))
                .expect("non-empty pivot range");
            let pivot = work[(pivot_row, col)];
            if !(pivot.abs() > threshold) {
                return Err(TransformError::NonInvertible("matrix is singular".into()));
            }
            if pivot_row != col {
                work.swap_rows(pivot_row, col);
                inv.swap_rows(pivot_row, col);
            }
            for c in 0..n {
                work[(col, c)] /= pivot;
                inv[(col, c)] /= pivot;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work[(r, col)];
                if factor == 0.0 {
                    continue;
                }
                for c in 0..n {
                    work[(r, c)] -= factor * work[(col, c)];
                    inv[(r, c)] -= factor * inv[(col, c)];
                }
            }
        }
        Ok(inv)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.ncols {
            self.data.swap(a * self.ncols + c, b * self.ncols + c);
        }
    }

    /// New matrix made of the given rows, in order.
    pub fn select_rows(&self, rows: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(rows.len() * self.ncols);
        for &r in rows.iter() {
            data.extend_from_slice(self.row(r));
        }
        Matrix {
            data,
            nrows: rows.len(),
            ncols: self.ncols,
        }
    }

    /// New matrix made of the given columns, in order.
    pub fn select_cols(&self, cols: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(self.nrows * cols.len());
        for r in 0..self.nrows {
            for &c in cols.iter() {
                data.push(self[(r, c)]);
            }
        }
        Matrix {
            data,
            nrows: self.nrows,
            ncols: cols.len(),
        }
    }

    /// Copy a `nrows×ncols` block of `src` starting at `(src_row, src_col)`
    /// into this matrix at `(dst_row, dst_col)`.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_block(
        &mut self,
        src: &Matrix,
        src_row: usize,
        src_col: usize,
        dst_row: usize,
        dst_col: usize,
        nrows: usize,
        ncols: usize,
    ) {
        for r in 0..nrows {
            for c in 0..ncols {
                self[(dst_row + r, dst_col + c)] = src[(src_row + r, src_col + c)];
            }
        }
    }
}

/// Dot product of a matrix row with a point augmented by a trailing `1`.
///
/// The products are accumulated left to right starting from the first one,
/// so that specialised low-dimensional paths written as
/// `m0 * x + m1 * y + m2` produce bit-identical results.
#[inline]
pub(crate) fn augmented_dot(row: &[f64], pt: &[f64]) -> f64 {
    let (translation, coeffs) = row.split_last().expect("row has a translation term");
    let mut terms = coeffs.iter().zip(pt.iter());
    let Some((m0, p0)) = terms.next() else {
        return *translation;
    };
    let mut acc = m0 * p0;
    for (m, p) in terms {
        acc += m * p;
    }
    acc + translation
}

#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    row_vecs: bool,
    dim_len: Option<usize>,
    data: Vec<f64>,
}

impl MatrixBuilder {
    fn new(row_vecs: bool) -> Self {
        Self {
            row_vecs,
            dim_len: None,
            data: Default::default(),
        }
    }

    pub fn add_vec(&mut self, vec: &[f64]) -> Result<&mut Self> {
        if let Some(len) = self.dim_len {
            if len != vec.len() {
                return Err(TransformError::InvalidParameter(format!(
                    "MatrixBuilder: inconsistent vector length {}, expected {}",
                    vec.len(),
                    len
                )));
            }
        } else {
            self.dim_len = Some(vec.len());
        }
        self.data.extend_from_slice(vec);
        Ok(self)
    }

    pub fn build(self) -> Result<Matrix> {
        let dim_len = self.dim_len.unwrap_or(0);
        if self.row_vecs {
            Matrix::try_new(self.data, dim_len)
        } else {
            Matrix::try_new_colmaj(self.data, dim_len)
        }
    }
}
