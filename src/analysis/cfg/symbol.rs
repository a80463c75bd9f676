//! Program symbols referenced by operations.

use std::fmt;

use bitflags::bitflags;

use crate::analysis::cfg::TypeId;

/// Identifies a symbol within its graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Creates an identifier from its raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        SymbolId(index)
    }

    /// Returns the raw index into the symbol table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// What a symbol declares.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[allow(missing_docs)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
    Property,
    Event,
    Method,
}

bitflags! {
    /// Modifiers of a symbol.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct SymbolFlags: u8 {
        /// Declared `static`
        const STATIC = 0x01;
        /// Declared `readonly` (or `const`)
        const READ_ONLY = 0x02;
    }
}

/// A declared program entity.
#[derive(Clone, PartialEq, Debug)]
pub struct Symbol {
    /// Simple name, for example `Exit` or `count`
    pub name: String,
    /// What the symbol declares
    pub kind: SymbolKind,
    /// Declared type (the return type for methods)
    pub ty: Option<TypeId>,
    /// Declaring type for members, `None` for locals and parameters
    pub containing_type: Option<TypeId>,
    /// Modifiers
    pub flags: SymbolFlags,
}

impl Symbol {
    fn with_kind(name: &str, kind: SymbolKind, ty: Option<TypeId>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty,
            containing_type: None,
            flags: SymbolFlags::empty(),
        }
    }

    /// A local variable.
    #[must_use]
    pub fn local(name: &str, ty: Option<TypeId>) -> Self {
        Self::with_kind(name, SymbolKind::Local, ty)
    }

    /// A parameter of the analyzed procedure.
    #[must_use]
    pub fn parameter(name: &str, ty: Option<TypeId>) -> Self {
        Self::with_kind(name, SymbolKind::Parameter, ty)
    }

    /// A field declared in `containing_type`.
    #[must_use]
    pub fn field(name: &str, ty: Option<TypeId>, containing_type: TypeId) -> Self {
        Self {
            containing_type: Some(containing_type),
            ..Self::with_kind(name, SymbolKind::Field, ty)
        }
    }

    /// A property declared in `containing_type`.
    #[must_use]
    pub fn property(name: &str, ty: Option<TypeId>, containing_type: TypeId) -> Self {
        Self {
            containing_type: Some(containing_type),
            ..Self::with_kind(name, SymbolKind::Property, ty)
        }
    }

    /// A method declared in `containing_type`, returning `ty`.
    #[must_use]
    pub fn method(name: &str, ty: Option<TypeId>, containing_type: TypeId) -> Self {
        Self {
            containing_type: Some(containing_type),
            ..Self::with_kind(name, SymbolKind::Method, ty)
        }
    }

    /// An event declared in `containing_type`.
    #[must_use]
    pub fn event(name: &str, containing_type: TypeId) -> Self {
        Self {
            containing_type: Some(containing_type),
            ..Self::with_kind(name, SymbolKind::Event, None)
        }
    }

    /// Adds modifiers.
    #[must_use]
    pub fn with_flags(mut self, flags: SymbolFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Returns `true` if the symbol is declared `static`.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(SymbolFlags::STATIC)
    }

    /// Returns `true` for fields.
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.kind == SymbolKind::Field
    }
}
