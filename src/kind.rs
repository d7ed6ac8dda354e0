//! Element kind registry (C1): the closed set of element kinds the engine
//! stores, plus uniform zero-test, copy, and bulk-copy operations over them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, Result};

/// A single complex lane pair, stored as two `f64` lanes per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex128 {
    pub re: f64,
    pub im: f64,
}

impl Complex128 {
    pub const ZERO: Complex128 = Complex128 { re: 0.0, im: 0.0 };

    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

/// An interned string handle. Modeled as a reference-counted `str` rather
/// than an index into an external intern table: the interning table itself
/// is a host-binding concern, out of scope per spec.md §1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringHandle(pub Arc<str>);

impl StringHandle {
    pub fn zero() -> Self {
        StringHandle(Arc::from(""))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

/// An opaque handle to an arbitrary foreign value. `None` is the zero value:
/// the absence of a boxed value. The boxed value itself is never inspected
/// by the engine, only copied by reference.
#[derive(Debug, Clone)]
pub struct AnyHandle(pub Option<Arc<dyn Any + Send + Sync>>);

impl AnyHandle {
    pub fn zero() -> Self {
        AnyHandle(None)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }
}

impl PartialEq for AnyHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The closed set of element kinds an SVT can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Bool,
    Int32,
    Float64,
    Complex128,
    Byte,
    String,
    Any,
}

impl ElementKind {
    /// Parses the short string token used at the external interface (§6).
    pub fn from_token(token: &str) -> Result<Self> {
        Ok(match token {
            "logical" => ElementKind::Bool,
            "integer" => ElementKind::Int32,
            "double" => ElementKind::Float64,
            "complex" => ElementKind::Complex128,
            "character" => ElementKind::String,
            "raw" => ElementKind::Byte,
            "list" => ElementKind::Any,
            other => {
                return Err(EngineError::UnsupportedKind {
                    token: other.to_string(),
                });
            }
        })
    }

    /// Byte size for fixed-width kinds; for `String`/`Any` this is the size
    /// of the handle itself, not of the pointed-to data.
    pub fn size_of(self) -> usize {
        match self {
            ElementKind::Bool => 1,
            ElementKind::Int32 => 4,
            ElementKind::Float64 => 8,
            ElementKind::Complex128 => 16,
            ElementKind::Byte => 1,
            ElementKind::String => std::mem::size_of::<StringHandle>(),
            ElementKind::Any => std::mem::size_of::<AnyHandle>(),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single element value, tagged by kind. Used where a single `(position,
/// value)` pair needs to move independently of its backing buffer (e.g. when
/// resolving an incoming write before it lands in a leaf).
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Bool(bool),
    Int32(i32),
    Float64(f64),
    Complex128(Complex128),
    Byte(u8),
    String(StringHandle),
    Any(AnyHandle),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Bool(_) => ElementKind::Bool,
            Element::Int32(_) => ElementKind::Int32,
            Element::Float64(_) => ElementKind::Float64,
            Element::Complex128(_) => ElementKind::Complex128,
            Element::Byte(_) => ElementKind::Byte,
            Element::String(_) => ElementKind::String,
            Element::Any(_) => ElementKind::Any,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Element::Bool(v) => !*v,
            Element::Int32(v) => *v == 0,
            Element::Float64(v) => *v == 0.0,
            Element::Complex128(v) => v.is_zero(),
            Element::Byte(v) => *v == 0,
            Element::String(v) => v.is_zero(),
            Element::Any(v) => v.is_zero(),
        }
    }

    pub fn zero(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Bool => Element::Bool(false),
            ElementKind::Int32 => Element::Int32(0),
            ElementKind::Float64 => Element::Float64(0.0),
            ElementKind::Complex128 => Element::Complex128(Complex128::ZERO),
            ElementKind::Byte => Element::Byte(0),
            ElementKind::String => Element::String(StringHandle::zero()),
            ElementKind::Any => Element::Any(AnyHandle::zero()),
        }
    }
}

/// A contiguous, kind-homogeneous vector of element values: the bulk storage
/// form used by leaves, COO value vectors, CSC `x`, and dense buffers.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBuffer {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Float64(Vec<f64>),
    Complex128(Vec<Complex128>),
    Byte(Vec<u8>),
    String(Vec<StringHandle>),
    Any(Vec<AnyHandle>),
}

impl ElementBuffer {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementBuffer::Bool(_) => ElementKind::Bool,
            ElementBuffer::Int32(_) => ElementKind::Int32,
            ElementBuffer::Float64(_) => ElementKind::Float64,
            ElementBuffer::Complex128(_) => ElementKind::Complex128,
            ElementBuffer::Byte(_) => ElementKind::Byte,
            ElementBuffer::String(_) => ElementKind::String,
            ElementBuffer::Any(_) => ElementKind::Any,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ElementBuffer::Bool(v) => v.len(),
            ElementBuffer::Int32(v) => v.len(),
            ElementBuffer::Float64(v) => v.len(),
            ElementBuffer::Complex128(v) => v.len(),
            ElementBuffer::Byte(v) => v.len(),
            ElementBuffer::String(v) => v.len(),
            ElementBuffer::Any(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with_capacity(kind: ElementKind, cap: usize) -> Self {
        match kind {
            ElementKind::Bool => ElementBuffer::Bool(Vec::with_capacity(cap)),
            ElementKind::Int32 => ElementBuffer::Int32(Vec::with_capacity(cap)),
            ElementKind::Float64 => ElementBuffer::Float64(Vec::with_capacity(cap)),
            ElementKind::Complex128 => ElementBuffer::Complex128(Vec::with_capacity(cap)),
            ElementKind::Byte => ElementBuffer::Byte(Vec::with_capacity(cap)),
            ElementKind::String => ElementBuffer::String(Vec::with_capacity(cap)),
            ElementKind::Any => ElementBuffer::Any(Vec::with_capacity(cap)),
        }
    }

    /// Number of zero-valued entries removed in a zero-strip, without
    /// materializing the filtered buffer — used by callers that only need
    /// the resulting length up front.
    pub fn count_zero(&self) -> usize {
        (0..self.len()).filter(|&i| self.get(i).is_zero()).count()
    }

    pub fn get(&self, i: usize) -> Element {
        match self {
            ElementBuffer::Bool(v) => Element::Bool(v[i]),
            ElementBuffer::Int32(v) => Element::Int32(v[i]),
            ElementBuffer::Float64(v) => Element::Float64(v[i]),
            ElementBuffer::Complex128(v) => Element::Complex128(v[i]),
            ElementBuffer::Byte(v) => Element::Byte(v[i]),
            ElementBuffer::String(v) => Element::String(v[i].clone()),
            ElementBuffer::Any(v) => Element::Any(v[i].clone()),
        }
    }

    pub fn push(&mut self, value: Element) {
        match (self, value) {
            (ElementBuffer::Bool(v), Element::Bool(x)) => v.push(x),
            (ElementBuffer::Int32(v), Element::Int32(x)) => v.push(x),
            (ElementBuffer::Float64(v), Element::Float64(x)) => v.push(x),
            (ElementBuffer::Complex128(v), Element::Complex128(x)) => v.push(x),
            (ElementBuffer::Byte(v), Element::Byte(x)) => v.push(x),
            (ElementBuffer::String(v), Element::String(x)) => v.push(x),
            (ElementBuffer::Any(v), Element::Any(x)) => v.push(x),
            _ => unreachable!("push kind mismatch is a caller bug, not a runtime error"),
        }
    }

    /// `copy_one`: element-wise copy of a single slot from `src` into `self`.
    pub fn copy_one(&mut self, dst_off: usize, src: &ElementBuffer, src_off: usize) {
        match (self, src) {
            (ElementBuffer::Bool(d), ElementBuffer::Bool(s)) => d[dst_off] = s[src_off],
            (ElementBuffer::Int32(d), ElementBuffer::Int32(s)) => d[dst_off] = s[src_off],
            (ElementBuffer::Float64(d), ElementBuffer::Float64(s)) => d[dst_off] = s[src_off],
            (ElementBuffer::Complex128(d), ElementBuffer::Complex128(s)) => d[dst_off] = s[src_off],
            (ElementBuffer::Byte(d), ElementBuffer::Byte(s)) => d[dst_off] = s[src_off],
            (ElementBuffer::String(d), ElementBuffer::String(s)) => {
                d[dst_off] = s[src_off].clone()
            }
            (ElementBuffer::Any(d), ElementBuffer::Any(s)) => d[dst_off] = s[src_off].clone(),
            _ => unreachable!("copy_one kind mismatch is a caller bug, not a runtime error"),
        }
    }

    /// `copy_run`: equivalent to `n` calls of `copy_one`, using a bulk slice
    /// copy for fixed-width kinds.
    pub fn copy_run(&mut self, dst_off: usize, src: &ElementBuffer, src_off: usize, n: usize) {
        match (self, src) {
            (ElementBuffer::Bool(d), ElementBuffer::Bool(s)) => {
                d[dst_off..dst_off + n].copy_from_slice(&s[src_off..src_off + n])
            }
            (ElementBuffer::Int32(d), ElementBuffer::Int32(s)) => {
                d[dst_off..dst_off + n].copy_from_slice(&s[src_off..src_off + n])
            }
            (ElementBuffer::Float64(d), ElementBuffer::Float64(s)) => {
                d[dst_off..dst_off + n].copy_from_slice(&s[src_off..src_off + n])
            }
            (ElementBuffer::Complex128(d), ElementBuffer::Complex128(s)) => {
                d[dst_off..dst_off + n].copy_from_slice(&s[src_off..src_off + n])
            }
            (ElementBuffer::Byte(d), ElementBuffer::Byte(s)) => {
                d[dst_off..dst_off + n].copy_from_slice(&s[src_off..src_off + n])
            }
            (ElementBuffer::String(d), ElementBuffer::String(s)) => {
                d[dst_off..dst_off + n].clone_from_slice(&s[src_off..src_off + n])
            }
            (ElementBuffer::Any(d), ElementBuffer::Any(s)) => {
                d[dst_off..dst_off + n].clone_from_slice(&s[src_off..src_off + n])
            }
            _ => unreachable!("copy_run kind mismatch is a caller bug, not a runtime error"),
        }
    }
}
