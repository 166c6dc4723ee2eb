//! Canonical textual description of transforms, in the style of the OGC well-known text for math transforms.
//!
//! Nested concatenations are flattened into one `CONCAT_MT`,
//! and affine parameters only list the matrix elements which differ from the identity.

use std::fmt::{self, Display, Formatter, Write};

use crate::{MathTransform, Matrix, TransformKind, projection::Direction};

fn param_mt<K: AsRef<str>>(f: &mut Formatter<'_>, name: &str, params: &[(K, f64)]) -> fmt::Result {
    write!(f, "PARAM_MT[\"{name}\"")?;
    for (key, value) in params {
        write!(f, ", PARAMETER[\"{}\", {value}]", key.as_ref())?;
    }
    f.write_char(']')
}

fn affine_parameters(m: &Matrix) -> Vec<(String, f64)> {
    let mut out = vec![
        ("num_row".to_string(), m.nrows() as f64),
        ("num_col".to_string(), m.ncols() as f64),
    ];
    for r in 0..m.nrows() {
        for (c, value) in m.row(r).iter().enumerate() {
            let default = if r == c { 1.0 } else { 0.0 };
            if *value != default {
                out.push((format!("elt_{r}_{c}"), *value));
            }
        }
    }
    out
}

impl Display for MathTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let matrix = match self.kind() {
            TransformKind::Identity(t) => t.matrix(),
            TransformKind::Constant(t) => t.matrix(),
            TransformKind::Linear1D(t) => t.matrix(),
            TransformKind::Affine2D(t) => t.matrix(),
            TransformKind::Linear(t) => t.matrix().clone(),
            TransformKind::Exponential1D(t) => {
                return param_mt(f, "Exponential", &[("base", t.base()), ("factor", t.factor())]);
            }
            TransformKind::Logarithmic1D(t) => {
                return param_mt(f, "Logarithmic", &[("base", t.base()), ("offset", t.offset())]);
            }
            TransformKind::Concatenated(c) => {
                f.write_str("CONCAT_MT[")?;
                for (idx, step) in c.steps().iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{step}")?;
                }
                return f.write_char(']');
            }
            TransformKind::PassThrough(p) => {
                write!(f, "PASSTHROUGH_MT[{}, {}", p.first(), p.inner())?;
                if p.trailing() != 0 {
                    write!(f, ", PARAMETER[\"num_trailing\", {}]", p.trailing())?;
                }
                return f.write_char(']');
            }
            TransformKind::Projection(p) => {
                let params = p.projection().params();
                return match p.direction() {
                    Direction::Forward => param_mt(f, params.name(), &params.parameters()),
                    Direction::Inverse => {
                        f.write_str("INVERSE_MT[")?;
                        param_mt(f, params.name(), &params.parameters())?;
                        f.write_char(']')
                    }
                };
            }
            TransformKind::Geocentric(g) => {
                let name = match g.direction() {
                    Direction::Forward => "Ellipsoid_To_Geocentric",
                    Direction::Inverse => "Geocentric_To_Ellipsoid",
                };
                let e = g.ellipsoid();
                let dim = if g.has_height() { 3.0 } else { 2.0 };
                return param_mt(
                    f,
                    name,
                    &[
                        ("dim", dim),
                        ("semi_major", e.semi_major()),
                        ("semi_minor", e.semi_minor()),
                    ],
                );
            }
            TransformKind::Molodensky(m) => {
                return param_mt(f, m.params().name(), &m.params().parameters());
            }
        };
        param_mt(f, "Affine", &affine_parameters(&matrix))
    }
}
