//! Function kinds and the catalog that samples among them.
//!
//! Mirrors the original primitive set: every kind carries a stable tag, a
//! name, and an arity class. The catalog is the only mutable piece — kinds
//! themselves are immutable for the lifetime of the process.

use rand::Rng;
use thiserror::Error;

/// A function-kind tag. `Add`/`Mul`/... are n-ary, `Aq`/`Pow` are binary,
/// the rest are unary outer wrappers, and `Constant`/`Variable`/`Dynamic`
/// are nullary placeholders reserved for user-provided kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionKind {
    Add,
    Mul,
    Sub,
    Div,
    Fmin,
    Fmax,
    Aq,
    Pow,
    Abs,
    Acos,
    Asin,
    Atan,
    Cbrt,
    Ceil,
    Cos,
    Cosh,
    Exp,
    Floor,
    Identity,
    Log,
    Logabs,
    Log1p,
    Sin,
    Sinh,
    Sqrt,
    Sqrtabs,
    Tan,
    Tanh,
    Square,
    Constant,
    Variable,
    Dynamic,
}

/// All built-in kinds, in tag order. Used to build a default catalog and to
/// iterate when sampling or validating a bitmask.
pub const ALL_KINDS: &[FunctionKind] = &[
    FunctionKind::Add,
    FunctionKind::Mul,
    FunctionKind::Sub,
    FunctionKind::Div,
    FunctionKind::Fmin,
    FunctionKind::Fmax,
    FunctionKind::Aq,
    FunctionKind::Pow,
    FunctionKind::Abs,
    FunctionKind::Acos,
    FunctionKind::Asin,
    FunctionKind::Atan,
    FunctionKind::Cbrt,
    FunctionKind::Ceil,
    FunctionKind::Cos,
    FunctionKind::Cosh,
    FunctionKind::Exp,
    FunctionKind::Floor,
    FunctionKind::Identity,
    FunctionKind::Log,
    FunctionKind::Logabs,
    FunctionKind::Log1p,
    FunctionKind::Sin,
    FunctionKind::Sinh,
    FunctionKind::Sqrt,
    FunctionKind::Sqrtabs,
    FunctionKind::Tan,
    FunctionKind::Tanh,
    FunctionKind::Square,
    FunctionKind::Constant,
    FunctionKind::Variable,
    FunctionKind::Dynamic,
];

impl FunctionKind {
    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Add => "add",
            FunctionKind::Mul => "mul",
            FunctionKind::Sub => "sub",
            FunctionKind::Div => "div",
            FunctionKind::Fmin => "min",
            FunctionKind::Fmax => "max",
            FunctionKind::Aq => "aq",
            FunctionKind::Pow => "pow",
            FunctionKind::Abs => "abs",
            FunctionKind::Acos => "acos",
            FunctionKind::Asin => "asin",
            FunctionKind::Atan => "atan",
            FunctionKind::Cbrt => "cbrt",
            FunctionKind::Ceil => "ceil",
            FunctionKind::Cos => "cos",
            FunctionKind::Cosh => "cosh",
            FunctionKind::Exp => "exp",
            FunctionKind::Floor => "floor",
            FunctionKind::Identity => "identity",
            FunctionKind::Log => "ln",
            FunctionKind::Logabs => "logabs",
            FunctionKind::Log1p => "log1p",
            FunctionKind::Sin => "sin",
            FunctionKind::Sinh => "sinh",
            FunctionKind::Sqrt => "sqrt",
            FunctionKind::Sqrtabs => "sqrtabs",
            FunctionKind::Tan => "tan",
            FunctionKind::Tanh => "tanh",
            FunctionKind::Square => "square",
            FunctionKind::Constant => "constant",
            FunctionKind::Variable => "variable",
            FunctionKind::Dynamic => "dynamic",
        }
    }

    pub fn parse(name: &str) -> Option<FunctionKind> {
        ALL_KINDS.iter().copied().find(|k| k.name() == name)
    }

    /// Fixed `(min_arity, max_arity)` bound for this kind, before any
    /// catalog-level override.
    pub fn default_arity(self) -> (usize, usize) {
        match self {
            FunctionKind::Add
            | FunctionKind::Mul
            | FunctionKind::Sub
            | FunctionKind::Div
            | FunctionKind::Fmin
            | FunctionKind::Fmax => (1, usize::MAX),
            FunctionKind::Aq | FunctionKind::Pow => (2, 2),
            FunctionKind::Constant | FunctionKind::Variable | FunctionKind::Dynamic => (0, 0),
            _ => (1, 1),
        }
    }

    pub fn is_unary(self) -> bool {
        self.default_arity() == (1, 1)
    }

    /// Whether the dispatch table is expected to carry a derivative kernel
    /// for this kind. `Ceil`/`Floor` are piecewise-constant almost
    /// everywhere, so their derivative is defined as zero rather than
    /// missing (see `dispatch.rs`).
    pub fn is_differentiable(self) -> bool {
        !matches!(
            self,
            FunctionKind::Constant | FunctionKind::Variable | FunctionKind::Dynamic
        )
    }
}

/// Per-kind configuration entry held by the catalog.
#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    enabled: bool,
    frequency: f64,
    min_arity: usize,
    max_arity: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no enabled function kind admits arity window [{min_arity}, {max_arity}]")]
    NoAdmissibleKind { min_arity: usize, max_arity: usize },
    #[error("unknown or unconfigured function kind {0:?}")]
    UnknownKind(FunctionKind),
}

/// Mapping `kind -> {enabled, frequency, min/max arity}`, the only mutable
/// piece of the function-kind system. Constructed from a bitmask over
/// `ALL_KINDS`; sampling draws a kind with probability proportional to its
/// frequency, restricted to kinds admissible in the requested arity window.
#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    entries: Vec<(FunctionKind, CatalogEntry)>,
}

impl FunctionCatalog {
    /// Build a catalog where every kind in `mask` is enabled with frequency 1.
    pub fn configure(mask: &[FunctionKind]) -> Self {
        let entries = ALL_KINDS
            .iter()
            .map(|&k| {
                let (min_arity, max_arity) = k.default_arity();
                let enabled = mask.contains(&k);
                (
                    k,
                    CatalogEntry {
                        enabled,
                        frequency: 1.0,
                        min_arity,
                        max_arity,
                    },
                )
            })
            .collect();
        FunctionCatalog { entries }
    }

    /// `{Constant, Variable, Add, Sub, Mul, Div}` — mirrors
    /// `PrimitiveSet::Arithmetic`.
    pub fn arithmetic() -> Self {
        Self::configure(&[
            FunctionKind::Constant,
            FunctionKind::Variable,
            FunctionKind::Add,
            FunctionKind::Sub,
            FunctionKind::Mul,
            FunctionKind::Div,
            FunctionKind::Identity,
        ])
    }

    /// Arithmetic plus `Pow, Exp, Log, Sin, Cos, Square` — mirrors
    /// `PrimitiveSet::TypeCoherent`.
    pub fn type_coherent() -> Self {
        Self::configure(&[
            FunctionKind::Constant,
            FunctionKind::Variable,
            FunctionKind::Add,
            FunctionKind::Sub,
            FunctionKind::Mul,
            FunctionKind::Div,
            FunctionKind::Identity,
            FunctionKind::Pow,
            FunctionKind::Exp,
            FunctionKind::Log,
            FunctionKind::Sin,
            FunctionKind::Cos,
            FunctionKind::Square,
        ])
    }

    /// Every unary and n-ary kind enabled (everything but `Dynamic`) —
    /// mirrors `PrimitiveSet::Full`.
    pub fn full() -> Self {
        let mask: Vec<FunctionKind> = ALL_KINDS
            .iter()
            .copied()
            .filter(|&k| k != FunctionKind::Dynamic)
            .collect();
        Self::configure(&mask)
    }

    fn entry(&self, kind: FunctionKind) -> Option<&CatalogEntry> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, e)| e)
    }

    fn entry_mut(&mut self, kind: FunctionKind) -> Option<&mut CatalogEntry> {
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, e)| e)
    }

    pub fn is_enabled(&self, kind: FunctionKind) -> bool {
        self.entry(kind).is_some_and(|e| e.enabled)
    }

    pub fn enable(&mut self, kind: FunctionKind) {
        if let Some(e) = self.entry_mut(kind) {
            e.enabled = true;
        }
    }

    pub fn disable(&mut self, kind: FunctionKind) {
        if let Some(e) = self.entry_mut(kind) {
            e.enabled = false;
        }
    }

    pub fn frequency(&self, kind: FunctionKind) -> Result<f64, CatalogError> {
        self.entry(kind)
            .map(|e| e.frequency)
            .ok_or(CatalogError::UnknownKind(kind))
    }

    pub fn set_frequency(&mut self, kind: FunctionKind, f: f64) -> Result<(), CatalogError> {
        self.entry_mut(kind)
            .map(|e| e.frequency = f)
            .ok_or(CatalogError::UnknownKind(kind))
    }

    pub fn set_min_max_arity(
        &mut self,
        kind: FunctionKind,
        min_arity: usize,
        max_arity: usize,
    ) -> Result<(), CatalogError> {
        let e = self
            .entry_mut(kind)
            .ok_or(CatalogError::UnknownKind(kind))?;
        e.min_arity = min_arity;
        e.max_arity = max_arity;
        Ok(())
    }

    pub fn min_max_arity(&self, kind: FunctionKind) -> Result<(usize, usize), CatalogError> {
        self.entry(kind)
            .map(|e| (e.min_arity, e.max_arity))
            .ok_or(CatalogError::UnknownKind(kind))
    }

    fn admissible(&self, min_arity: usize, max_arity: usize) -> Vec<(FunctionKind, f64)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.enabled && e.frequency > 0.0)
            .filter(|(_, e)| e.min_arity >= min_arity && e.max_arity <= max_arity)
            .map(|(k, e)| (*k, e.frequency))
            .collect()
    }

    /// Draw an enabled kind whose `[min_arity, max_arity]` window is fully
    /// contained in the requested interval, with probability proportional
    /// to frequency. A subset check, not mere overlap: a caller asking for
    /// arity exactly 1 wants a kind usable as a standalone unary wrapper,
    /// not an n-ary kind that merely tolerates being called with one
    /// argument (e.g. `Add` admits `[1, MAX]` but has no elementwise
    /// primal kernel in the dispatch table, since this crate's terms only
    /// ever wrap a monomial in a genuinely unary function).
    pub fn sample(
        &self,
        rng: &mut impl Rng,
        min_arity: usize,
        max_arity: usize,
    ) -> Result<FunctionKind, CatalogError> {
        let admissible = self.admissible(min_arity, max_arity);
        if admissible.is_empty() {
            return Err(CatalogError::NoAdmissibleKind {
                min_arity,
                max_arity,
            });
        }
        let total: f64 = admissible.iter().map(|(_, f)| f).sum();
        let mut r = rng.random_range(0.0..total);
        for (kind, freq) in &admissible {
            if r < *freq {
                return Ok(*kind);
            }
            r -= freq;
        }
        Ok(admissible.last().unwrap().0)
    }
}
