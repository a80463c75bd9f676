//! The semantic oracle.
//!
//! The engine never resolves types itself. Whenever it needs to know whether a conversion can
//! fail, which catch clause handles an exception or whether a call targets a well-known
//! synchronization primitive, it asks a [`SemanticModel`]. Lookups are expected to be cheap and
//! side-effect free; hosts that resolve types lazily should cache on their side.
//!
//! [`TypeTable`] is a small in-memory implementation for hosts that already know their type
//! hierarchy, and for tests. [`TypeTable::with_core_types`] pre-registers the framework types
//! listed in [`known`].

use std::{collections::HashMap, fmt};

/// Identifies a type within a [`SemanticModel`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Creates an identifier from its raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        TypeId(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Fully qualified names of the framework types the engine has built-in knowledge about.
pub mod known {
    #![allow(missing_docs)]

    pub const OBJECT: &str = "System.Object";
    pub const VALUE_TYPE: &str = "System.ValueType";
    pub const BOOLEAN: &str = "System.Boolean";
    pub const INT32: &str = "System.Int32";
    pub const INT64: &str = "System.Int64";
    pub const STRING: &str = "System.String";
    pub const RANGE: &str = "System.Range";
    pub const INDEX: &str = "System.Index";
    pub const NULLABLE: &str = "System.Nullable`1";

    pub const EXCEPTION: &str = "System.Exception";
    pub const SYSTEM_EXCEPTION: &str = "System.SystemException";
    pub const NULL_REFERENCE_EXCEPTION: &str = "System.NullReferenceException";
    pub const INDEX_OUT_OF_RANGE_EXCEPTION: &str = "System.IndexOutOfRangeException";
    pub const ARGUMENT_EXCEPTION: &str = "System.ArgumentException";
    pub const ARGUMENT_OUT_OF_RANGE_EXCEPTION: &str = "System.ArgumentOutOfRangeException";
    pub const INVALID_CAST_EXCEPTION: &str = "System.InvalidCastException";
    pub const ARITHMETIC_EXCEPTION: &str = "System.ArithmeticException";
    pub const DIVIDE_BY_ZERO_EXCEPTION: &str = "System.DivideByZeroException";
    pub const INVALID_OPERATION_EXCEPTION: &str = "System.InvalidOperationException";

    pub const MONITOR: &str = "System.Threading.Monitor";
    pub const MUTEX: &str = "System.Threading.Mutex";
    pub const SPIN_LOCK: &str = "System.Threading.SpinLock";
    pub const READER_WRITER_LOCK: &str = "System.Threading.ReaderWriterLock";
    pub const READER_WRITER_LOCK_SLIM: &str = "System.Threading.ReaderWriterLockSlim";
    pub const DEBUG: &str = "System.Diagnostics.Debug";
}

/// Type queries the engine needs from the host.
pub trait SemanticModel: Send + Sync {
    /// Returns the fully qualified name of `ty`.
    fn type_name(&self, ty: TypeId) -> Option<&str>;

    /// Resolves a fully qualified type name.
    fn type_by_name(&self, name: &str) -> Option<TypeId>;

    /// Returns `true` if `ty` is `base`, derives from it or implements it.
    fn derives_or_implements(&self, ty: TypeId, base: TypeId) -> bool;

    /// Returns `true` if values of `ty` can be `null` without being a `Nullable<T>`.
    fn is_reference_type(&self, ty: TypeId) -> bool;

    /// Returns `true` for `Nullable<T>` instantiations.
    fn is_nullable_value_type(&self, ty: TypeId) -> bool;

    /// Returns `true` for integral numeric types.
    fn is_integral(&self, ty: TypeId) -> bool;

    /// Returns `true` if `ty` has the fully qualified name `name`.
    fn is_type(&self, ty: TypeId, name: &str) -> bool {
        self.type_name(ty) == Some(name)
    }

    /// Returns `true` if `ty` derives from or implements the type named `name`.
    fn derives_from_named(&self, ty: TypeId, name: &str) -> bool {
        self.type_by_name(name)
            .is_some_and(|base| self.derives_or_implements(ty, base))
    }
}

/// The shape of a type registered in a [`TypeTable`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeShape {
    /// A class (reference type)
    Class,
    /// An interface (reference type)
    Interface,
    /// A struct (value type)
    Struct,
    /// An integral struct
    Integral,
    /// A `Nullable<T>` instantiation
    Nullable,
}

#[derive(Clone, Debug)]
struct TypeEntry {
    name: String,
    shape: TypeShape,
    base: Option<TypeId>,
    interfaces: Vec<TypeId>,
}

/// An in-memory [`SemanticModel`].
///
/// # Examples
///
/// ```rust
/// use symflow::analysis::cfg::{known, SemanticModel, TypeShape, TypeTable};
///
/// let mut types = TypeTable::with_core_types();
/// let exception = types.type_by_name(known::EXCEPTION).unwrap();
/// let custom = types.define("App.CustomException", TypeShape::Class, Some(exception));
///
/// assert!(types.derives_or_implements(custom, exception));
/// assert!(types.is_reference_type(custom));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    types: Vec<TypeEntry>,
    by_name: HashMap<String, TypeId>,
}

impl TypeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the framework types from [`known`] registered.
    #[must_use]
    pub fn with_core_types() -> Self {
        let mut table = Self::new();
        let object = table.define(known::OBJECT, TypeShape::Class, None);
        let value_type = table.define(known::VALUE_TYPE, TypeShape::Class, Some(object));
        table.define(known::BOOLEAN, TypeShape::Struct, Some(value_type));
        table.define(known::INT32, TypeShape::Integral, Some(value_type));
        table.define(known::INT64, TypeShape::Integral, Some(value_type));
        table.define(known::STRING, TypeShape::Class, Some(object));
        table.define(known::RANGE, TypeShape::Struct, Some(value_type));
        table.define(known::INDEX, TypeShape::Struct, Some(value_type));
        table.define(known::NULLABLE, TypeShape::Nullable, Some(value_type));

        let exception = table.define(known::EXCEPTION, TypeShape::Class, Some(object));
        let system = table.define(known::SYSTEM_EXCEPTION, TypeShape::Class, Some(exception));
        table.define(known::NULL_REFERENCE_EXCEPTION, TypeShape::Class, Some(system));
        table.define(known::INDEX_OUT_OF_RANGE_EXCEPTION, TypeShape::Class, Some(system));
        let argument = table.define(known::ARGUMENT_EXCEPTION, TypeShape::Class, Some(system));
        table.define(known::ARGUMENT_OUT_OF_RANGE_EXCEPTION, TypeShape::Class, Some(argument));
        table.define(known::INVALID_CAST_EXCEPTION, TypeShape::Class, Some(system));
        let arithmetic = table.define(known::ARITHMETIC_EXCEPTION, TypeShape::Class, Some(system));
        table.define(known::DIVIDE_BY_ZERO_EXCEPTION, TypeShape::Class, Some(arithmetic));
        table.define(known::INVALID_OPERATION_EXCEPTION, TypeShape::Class, Some(system));

        table.define(known::MONITOR, TypeShape::Class, Some(object));
        table.define(known::MUTEX, TypeShape::Class, Some(object));
        table.define(known::SPIN_LOCK, TypeShape::Struct, Some(value_type));
        table.define(known::READER_WRITER_LOCK, TypeShape::Class, Some(object));
        table.define(known::READER_WRITER_LOCK_SLIM, TypeShape::Class, Some(object));
        table.define(known::DEBUG, TypeShape::Class, Some(object));
        table
    }

    /// Registers a type, or returns the existing identifier if `name` is already known.
    pub fn define(&mut self, name: &str, shape: TypeShape, base: Option<TypeId>) -> TypeId {
        if let Some(&existing) = self.by_name.get(name) {
            return existing;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeEntry {
            name: name.to_string(),
            shape,
            base,
            interfaces: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Records that `ty` implements `interface`.
    pub fn add_interface(&mut self, ty: TypeId, interface: TypeId) {
        if let Some(entry) = self.types.get_mut(ty.index()) {
            entry.interfaces.push(interface);
        }
    }

    /// Returns the identifier of a registered type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    fn entry(&self, ty: TypeId) -> Option<&TypeEntry> {
        self.types.get(ty.index())
    }
}

impl SemanticModel for TypeTable {
    fn type_name(&self, ty: TypeId) -> Option<&str> {
        self.entry(ty).map(|entry| entry.name.as_str())
    }

    fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.get(name)
    }

    fn derives_or_implements(&self, ty: TypeId, base: TypeId) -> bool {
        let mut pending = vec![ty];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if current == base {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(entry) = self.entry(current) {
                pending.extend(entry.base);
                pending.extend(entry.interfaces.iter().copied());
            }
        }
        false
    }

    fn is_reference_type(&self, ty: TypeId) -> bool {
        self.entry(ty)
            .is_some_and(|entry| matches!(entry.shape, TypeShape::Class | TypeShape::Interface))
    }

    fn is_nullable_value_type(&self, ty: TypeId) -> bool {
        self.entry(ty)
            .is_some_and(|entry| entry.shape == TypeShape::Nullable)
    }

    fn is_integral(&self, ty: TypeId) -> bool {
        self.entry(ty)
            .is_some_and(|entry| entry.shape == TypeShape::Integral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_exception_hierarchy() {
        let types = TypeTable::with_core_types();
        let range = types.get(known::ARGUMENT_OUT_OF_RANGE_EXCEPTION).unwrap();
        let argument = types.get(known::ARGUMENT_EXCEPTION).unwrap();
        let exception = types.get(known::EXCEPTION).unwrap();
        let cast = types.get(known::INVALID_CAST_EXCEPTION).unwrap();

        assert!(types.derives_or_implements(range, argument));
        assert!(types.derives_or_implements(range, exception));
        assert!(!types.derives_or_implements(range, cast));
        assert!(types.derives_from_named(cast, known::SYSTEM_EXCEPTION));
    }

    #[test]
    fn test_define_is_idempotent() {
        let mut types = TypeTable::with_core_types();
        let first = types.define("App.Widget", TypeShape::Class, None);
        let second = types.define("App.Widget", TypeShape::Struct, None);
        assert_eq!(first, second);
        assert!(types.is_type(first, "App.Widget"));
    }

    #[test]
    fn test_interfaces_and_shapes() {
        let mut types = TypeTable::with_core_types();
        let disposable = types.define("System.IDisposable", TypeShape::Interface, None);
        let stream = types.define("System.IO.Stream", TypeShape::Class, None);
        types.add_interface(stream, disposable);

        assert!(types.derives_or_implements(stream, disposable));
        assert!(!types.derives_or_implements(disposable, stream));

        let int32 = types.get(known::INT32).unwrap();
        let nullable = types.get(known::NULLABLE).unwrap();
        assert!(types.is_integral(int32));
        assert!(!types.is_reference_type(int32));
        assert!(types.is_nullable_value_type(nullable));
        assert!(types.is_reference_type(disposable));
    }
}
