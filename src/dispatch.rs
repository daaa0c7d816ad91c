//! Maps each function kind to its primal and derivative kernels.
//!
//! A term's outer function is always unary (§3's `function[i]` wraps a
//! single monomial), so every kernel here operates elementwise on one
//! input column. The outer sum across terms, and the coefficient scaling,
//! live in the interpreter rather than in this table (§4.E step 3).

use crate::function::FunctionKind;

/// Elementwise primal kernel: `f(x)`.
pub type PrimalKernel = fn(&[f64]) -> f64;
/// Elementwise derivative kernel: `f'(x)` given the same input `x`.
pub type DerivativeKernel = fn(&[f64]) -> f64;

/// Constructed once at startup; lookup is a linear scan over a short fixed
/// table, effectively constant time for the function-kind cardinality here.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTable;

impl DispatchTable {
    pub fn new() -> Self {
        DispatchTable
    }

    pub fn try_get_function(&self, kind: FunctionKind) -> Option<PrimalKernel> {
        self.primal(kind)
    }

    pub fn try_get_derivative(&self, kind: FunctionKind) -> Option<DerivativeKernel> {
        self.derivative(kind)
    }

    pub fn primal(&self, kind: FunctionKind) -> Option<PrimalKernel> {
        let f: PrimalKernel = match kind {
            FunctionKind::Identity => |x| x[0],
            FunctionKind::Abs => |x| x[0].abs(),
            FunctionKind::Acos => |x| x[0].acos(),
            FunctionKind::Asin => |x| x[0].asin(),
            FunctionKind::Atan => |x| x[0].atan(),
            FunctionKind::Cbrt => |x| x[0].cbrt(),
            FunctionKind::Ceil => |x| x[0].ceil(),
            FunctionKind::Cos => |x| x[0].cos(),
            FunctionKind::Cosh => |x| x[0].cosh(),
            FunctionKind::Exp => |x| x[0].exp(),
            FunctionKind::Floor => |x| x[0].floor(),
            FunctionKind::Log => |x| x[0].ln(),
            FunctionKind::Logabs => |x| x[0].abs().ln(),
            FunctionKind::Log1p => |x| x[0].ln_1p(),
            FunctionKind::Sin => |x| x[0].sin(),
            FunctionKind::Sinh => |x| x[0].sinh(),
            FunctionKind::Sqrt => |x| x[0].sqrt(),
            FunctionKind::Sqrtabs => |x| x[0].abs().sqrt(),
            FunctionKind::Tan => |x| x[0].tan(),
            FunctionKind::Tanh => |x| x[0].tanh(),
            FunctionKind::Square => |x| x[0] * x[0],
            // n-ary/binary/nullary kinds are not valid as a term's outer
            // wrapper (§3); they have no elementwise primal kernel here.
            _ => return None,
        };
        Some(f)
    }

    pub fn derivative(&self, kind: FunctionKind) -> Option<DerivativeKernel> {
        let f: DerivativeKernel = match kind {
            FunctionKind::Identity => |_x| 1.0,
            FunctionKind::Abs => |x| x[0].signum(),
            FunctionKind::Acos => |x| -1.0 / (1.0 - x[0] * x[0]).sqrt(),
            FunctionKind::Asin => |x| 1.0 / (1.0 - x[0] * x[0]).sqrt(),
            FunctionKind::Atan => |x| 1.0 / (1.0 + x[0] * x[0]),
            FunctionKind::Cbrt => |x| 1.0 / (3.0 * x[0].cbrt() * x[0].cbrt()),
            // piecewise-constant almost everywhere: derivative is zero.
            FunctionKind::Ceil => |_x| 0.0,
            FunctionKind::Cos => |x| -x[0].sin(),
            FunctionKind::Cosh => |x| x[0].sinh(),
            FunctionKind::Exp => |x| x[0].exp(),
            FunctionKind::Floor => |_x| 0.0,
            FunctionKind::Log => |x| 1.0 / x[0],
            FunctionKind::Logabs => |x| 1.0 / x[0],
            FunctionKind::Log1p => |x| 1.0 / (1.0 + x[0]),
            FunctionKind::Sin => |x| x[0].cos(),
            FunctionKind::Sinh => |x| x[0].cosh(),
            FunctionKind::Sqrt => |x| 0.5 / x[0].sqrt(),
            FunctionKind::Sqrtabs => |x| 0.5 * x[0].signum() / x[0].abs().sqrt(),
            FunctionKind::Tan => |x| 1.0 / (x[0].cos() * x[0].cos()),
            FunctionKind::Tanh => |x| 1.0 - x[0].tanh() * x[0].tanh(),
            FunctionKind::Square => |x| 2.0 * x[0],
            _ => return None,
        };
        Some(f)
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
