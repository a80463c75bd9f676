//! Operation trees.
//!
//! Every block holds a list of root operations plus an optional branch value. Each root is
//! the top of a small tree: an assignment owns its target and value, an invocation owns its
//! instance and arguments, and so on. Operations live in one arena per graph and reference
//! each other by [`OperationId`], which makes them cheap keys for the program state.
//!
//! Flow captures model compiler-introduced temporaries: a [`OperationKind::FlowCapture`]
//! stores the result of its value under a [`CaptureId`], later
//! [`OperationKind::FlowCaptureReference`]s (possibly in other blocks) read it back.

use std::fmt;

use crate::analysis::cfg::{ControlFlowGraph, SymbolFlags, SymbolId, TypeId};

/// Identifies an operation within its graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub(crate) u32);

impl OperationId {
    /// Creates an identifier from its raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        OperationId(index)
    }

    /// Returns the raw index into the operation arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Identifies a flow capture (a compiler-introduced temporary).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CaptureId(pub u32);

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture#{}", self.0)
    }
}

/// Source span of an operation, used as the de-duplication key for diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct SyntaxLocation {
    /// Start offset in the source text
    pub start: u32,
    /// End offset in the source text (exclusive)
    pub end: u32,
}

impl SyntaxLocation {
    /// Creates a location spanning `start..end`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for SyntaxLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// Compile-time constant carried by a literal.
#[derive(Clone, PartialEq, Debug)]
pub enum ConstantValue {
    /// The `null` literal
    Null,
    /// A boolean literal
    Bool(bool),
    /// An integral literal
    Int(i64),
    /// A string literal
    String(String),
    /// Any other constant (floating point, characters, enum members, ...)
    Other,
}

/// Binary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[allow(missing_docs)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LeftShift,
    RightShift,
    And,
    Or,
    ExclusiveOr,
    ConditionalAnd,
    ConditionalOr,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl BinaryOperator {
    /// Returns `true` for `/` and `%`, the operators that can divide by zero.
    #[must_use]
    pub const fn is_division(self) -> bool {
        matches!(self, BinaryOperator::Divide | BinaryOperator::Remainder)
    }

    /// Returns `true` for `==` and `!=`.
    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Equals | BinaryOperator::NotEquals)
    }
}

/// Unary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[allow(missing_docs)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitwiseNegation,
}

/// Patterns tested by [`OperationKind::IsPattern`].
#[derive(Clone, PartialEq, Debug)]
pub enum Pattern {
    /// `x is <constant>`; the operation produces the constant
    Constant(OperationId),
    /// `x is T`
    Type(TypeId),
    /// `x is T t` or `x is var t`; `ty` is `None` for `var`, `symbol` is `None` for a discard
    Declaration {
        /// The tested type, `None` for `var`
        ty: Option<TypeId>,
        /// The declared local, `None` for a discard designation
        symbol: Option<SymbolId>,
    },
    /// `x is not <pattern>`
    Not(Box<Pattern>),
    /// `x is _`
    Discard,
}

/// The kind of an operation, together with its children.
#[derive(Clone, PartialEq, Debug)]
pub enum OperationKind {
    /// A literal constant
    Literal(ConstantValue),
    /// `default` or `default(T)`
    DefaultValue,
    /// `typeof(T)`
    TypeOf,
    /// `nameof(x)`
    NameOf,
    /// `sizeof(T)`
    SizeOf,
    /// A read or write of a local variable
    LocalReference(SymbolId),
    /// A read or write of a parameter
    ParameterReference(SymbolId),
    /// `this`
    InstanceReference,
    /// A field access; `instance` is `None` for static fields
    FieldReference {
        /// The referenced field
        field: SymbolId,
        /// The receiver, `None` for static fields
        instance: Option<OperationId>,
    },
    /// A property or indexer access
    PropertyReference {
        /// The referenced property
        property: SymbolId,
        /// The receiver, `None` for static properties
        instance: Option<OperationId>,
        /// Indexer arguments
        arguments: Vec<OperationId>,
    },
    /// An event access
    EventReference {
        /// The referenced event
        event: SymbolId,
        /// The receiver, `None` for static events
        instance: Option<OperationId>,
    },
    /// A method group (for example a delegate target)
    MethodReference {
        /// The referenced method
        method: SymbolId,
        /// The receiver, `None` for static methods
        instance: Option<OperationId>,
    },
    /// `array[indices]`
    ArrayElementReference {
        /// The array
        array: OperationId,
        /// One index per dimension
        indices: Vec<OperationId>,
    },
    /// `target = value`
    SimpleAssignment {
        /// The assigned reference
        target: OperationId,
        /// The assigned value
        value: OperationId,
    },
    /// `target op= value`, including `??=`
    CompoundAssignment {
        /// The assigned reference
        target: OperationId,
        /// The right-hand side
        value: OperationId,
        /// The combining operator
        operator: BinaryOperator,
    },
    /// `target++` or `++target`
    Increment {
        /// The incremented reference
        target: OperationId,
    },
    /// `target--` or `--target`
    Decrement {
        /// The decremented reference
        target: OperationId,
    },
    /// A type conversion; implicit conversions are marked through [`Operation::is_implicit`]
    Conversion {
        /// The converted operand
        operand: OperationId,
        /// `true` for `operand as T`
        is_try_cast: bool,
    },
    /// `left op right`
    Binary {
        /// The operator
        operator: BinaryOperator,
        /// Left operand
        left: OperationId,
        /// Right operand
        right: OperationId,
    },
    /// `op operand`
    Unary {
        /// The operator
        operator: UnaryOperator,
        /// The operand
        operand: OperationId,
    },
    /// Compiler-generated null test (for `?.` and `??`)
    IsNull {
        /// The tested operand
        operand: OperationId,
    },
    /// `operand is T`
    IsType {
        /// The tested operand
        operand: OperationId,
        /// The tested type
        target_type: TypeId,
    },
    /// `value is pattern`
    IsPattern {
        /// The tested value
        value: OperationId,
        /// The pattern
        pattern: Pattern,
    },
    /// A method call
    Invocation {
        /// The called method
        method: SymbolId,
        /// The receiver, `None` for static methods
        instance: Option<OperationId>,
        /// The arguments, in declaration order
        arguments: Vec<OperationId>,
    },
    /// `new T(arguments)`
    ObjectCreation {
        /// The constructor, if known
        constructor: Option<SymbolId>,
        /// The constructor arguments
        arguments: Vec<OperationId>,
    },
    /// `new T[dimensions]`
    ArrayCreation {
        /// Dimension sizes
        dimensions: Vec<OperationId>,
    },
    /// `new { ... }`
    AnonymousObjectCreation {
        /// Member initializers
        initializers: Vec<OperationId>,
    },
    /// Lambda or method-group conversion to a delegate
    DelegateCreation {
        /// The delegate target, if any
        target: Option<OperationId>,
    },
    /// Stores `value` in a compiler temporary
    FlowCapture {
        /// The capture slot
        id: CaptureId,
        /// The captured value
        value: OperationId,
    },
    /// Reads a compiler temporary
    FlowCaptureReference {
        /// The capture slot
        id: CaptureId,
    },
    /// The exception object at the start of a catch handler
    CaughtException,
    /// `await operation`
    Await {
        /// The awaited operation
        operation: OperationId,
    },
    /// A late-bound invocation
    DynamicInvocation {
        /// The invoked expression
        operation: OperationId,
        /// The arguments
        arguments: Vec<OperationId>,
    },
    /// A late-bound member access
    DynamicMemberReference {
        /// The receiver
        instance: Option<OperationId>,
    },
    /// A late-bound indexer access
    DynamicIndexerAccess {
        /// The indexed expression
        operation: OperationId,
        /// The arguments
        arguments: Vec<OperationId>,
    },
    /// A late-bound object creation
    DynamicObjectCreation {
        /// The arguments
        arguments: Vec<OperationId>,
    },
    /// Any operation without symbolic semantics; only its children are evaluated
    Other {
        /// Child operations, in evaluation order
        children: Vec<OperationId>,
    },
}

impl OperationKind {
    /// Returns the direct children of this operation in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<OperationId> {
        match self {
            OperationKind::Literal(_)
            | OperationKind::DefaultValue
            | OperationKind::TypeOf
            | OperationKind::NameOf
            | OperationKind::SizeOf
            | OperationKind::LocalReference(_)
            | OperationKind::ParameterReference(_)
            | OperationKind::InstanceReference
            | OperationKind::FlowCaptureReference { .. }
            | OperationKind::CaughtException => Vec::new(),
            OperationKind::FieldReference { instance, .. }
            | OperationKind::EventReference { instance, .. }
            | OperationKind::MethodReference { instance, .. }
            | OperationKind::DynamicMemberReference { instance } => instance.iter().copied().collect(),
            OperationKind::PropertyReference {
                instance,
                arguments,
                ..
            }
            | OperationKind::Invocation {
                instance,
                arguments,
                ..
            } => instance.iter().chain(arguments.iter()).copied().collect(),
            OperationKind::ArrayElementReference { array, indices } => {
                std::iter::once(*array).chain(indices.iter().copied()).collect()
            }
            OperationKind::SimpleAssignment { target, value }
            | OperationKind::CompoundAssignment { target, value, .. } => vec![*target, *value],
            OperationKind::Increment { target } | OperationKind::Decrement { target } => {
                vec![*target]
            }
            OperationKind::Conversion { operand, .. }
            | OperationKind::Unary { operand, .. }
            | OperationKind::IsNull { operand }
            | OperationKind::IsType { operand, .. } => vec![*operand],
            OperationKind::Binary { left, right, .. } => vec![*left, *right],
            OperationKind::IsPattern { value, pattern } => {
                let mut children = vec![*value];
                pattern.collect_constants(&mut children);
                children
            }
            OperationKind::ObjectCreation { arguments, .. }
            | OperationKind::DynamicObjectCreation { arguments } => arguments.clone(),
            OperationKind::ArrayCreation { dimensions } => dimensions.clone(),
            OperationKind::AnonymousObjectCreation { initializers } => initializers.clone(),
            OperationKind::DelegateCreation { target } => target.iter().copied().collect(),
            OperationKind::FlowCapture { value, .. } => vec![*value],
            OperationKind::Await { operation } => vec![*operation],
            OperationKind::DynamicInvocation {
                operation,
                arguments,
            }
            | OperationKind::DynamicIndexerAccess {
                operation,
                arguments,
            } => std::iter::once(*operation)
                .chain(arguments.iter().copied())
                .collect(),
            OperationKind::Other { children } => children.clone(),
        }
    }

    /// Returns every symbol referenced directly by this operation.
    pub(crate) fn referenced_symbols(&self) -> Vec<SymbolId> {
        match self {
            OperationKind::LocalReference(symbol) | OperationKind::ParameterReference(symbol) => {
                vec![*symbol]
            }
            OperationKind::FieldReference { field: symbol, .. }
            | OperationKind::PropertyReference {
                property: symbol, ..
            }
            | OperationKind::EventReference { event: symbol, .. }
            | OperationKind::MethodReference { method: symbol, .. }
            | OperationKind::Invocation { method: symbol, .. } => vec![*symbol],
            OperationKind::ObjectCreation {
                constructor: Some(symbol),
                ..
            } => vec![*symbol],
            OperationKind::IsPattern { pattern, .. } => pattern.declared_symbol().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl Pattern {
    fn collect_constants(&self, into: &mut Vec<OperationId>) {
        match self {
            Pattern::Constant(op) => into.push(*op),
            Pattern::Not(inner) => inner.collect_constants(into),
            Pattern::Type(_) | Pattern::Declaration { .. } | Pattern::Discard => {}
        }
    }

    /// Returns the local introduced by a declaration pattern, looking through `not`.
    #[must_use]
    pub fn declared_symbol(&self) -> Option<SymbolId> {
        match self {
            Pattern::Declaration { symbol, .. } => *symbol,
            Pattern::Not(inner) => inner.declared_symbol(),
            Pattern::Constant(_) | Pattern::Type(_) | Pattern::Discard => None,
        }
    }
}

/// One node of an operation tree.
#[derive(Clone, PartialEq, Debug)]
pub struct Operation {
    /// What the operation does
    pub kind: OperationKind,
    /// The static type of the operation's result, if it has one
    pub ty: Option<TypeId>,
    /// `true` if the operation was introduced by the compiler (implicit conversions, ...)
    pub is_implicit: bool,
    /// Source span
    pub location: SyntaxLocation,
}

impl Operation {
    /// Creates an explicit, untyped operation without a source span.
    #[must_use]
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            ty: None,
            is_implicit: false,
            location: SyntaxLocation::default(),
        }
    }

    /// Sets the static result type.
    #[must_use]
    pub fn with_type(mut self, ty: TypeId) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Marks the operation as compiler-generated.
    #[must_use]
    pub fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }

    /// Sets the source span.
    #[must_use]
    pub fn at(mut self, start: u32, end: u32) -> Self {
        self.location = SyntaxLocation::new(start, end);
        self
    }
}

/// A borrowed view of one operation together with the graph it belongs to.
///
/// Child identifiers can be turned into views again with [`OperationRef::child`], which is how
/// processors walk from an operation to its operands.
#[derive(Clone, Copy)]
pub struct OperationRef<'g> {
    graph: &'g ControlFlowGraph,
    id: OperationId,
}

impl<'g> OperationRef<'g> {
    pub(crate) fn new(graph: &'g ControlFlowGraph, id: OperationId) -> Self {
        Self { graph, id }
    }

    /// Returns the operation identifier.
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Returns the graph this operation belongs to.
    #[must_use]
    pub fn graph(&self) -> &'g ControlFlowGraph {
        self.graph
    }

    /// Returns the underlying operation.
    #[must_use]
    pub fn operation(&self) -> &'g Operation {
        self.graph.operation_data(self.id)
    }

    /// Returns the operation kind.
    #[must_use]
    pub fn kind(&self) -> &'g OperationKind {
        &self.operation().kind
    }

    /// Returns the static result type.
    #[must_use]
    pub fn ty(&self) -> Option<TypeId> {
        self.operation().ty
    }

    /// Returns `true` if the operation was introduced by the compiler.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.operation().is_implicit
    }

    /// Returns the source span.
    #[must_use]
    pub fn location(&self) -> SyntaxLocation {
        self.operation().location
    }

    /// Returns a view of another operation of the same graph.
    #[must_use]
    pub fn child(&self, id: OperationId) -> OperationRef<'g> {
        OperationRef::new(self.graph, id)
    }

    /// Returns `true` for `this`.
    #[must_use]
    pub fn is_instance_reference(&self) -> bool {
        matches!(self.kind(), OperationKind::InstanceReference)
    }

    /// Returns the program symbol whose value this operation denotes, if the engine tracks it.
    ///
    /// Locals and parameters are always tracked. Fields are tracked when they are static or
    /// accessed through `this`; a field of any other receiver has no stable identity.
    #[must_use]
    pub fn tracked_symbol(&self) -> Option<SymbolId> {
        match self.kind() {
            OperationKind::LocalReference(symbol) | OperationKind::ParameterReference(symbol) => {
                Some(*symbol)
            }
            OperationKind::FieldReference { field, instance } => {
                let is_static = self.graph.symbol(*field).flags.contains(SymbolFlags::STATIC);
                match instance {
                    None => Some(*field),
                    Some(_) if is_static => Some(*field),
                    Some(instance) if self.child(*instance).is_instance_reference() => Some(*field),
                    Some(_) => None,
                }
            }
            _ => None,
        }
    }
}

impl PartialEq for OperationRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.graph, other.graph)
    }
}

impl Eq for OperationRef<'_> {}

impl fmt::Debug for OperationRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.id, self.kind())
    }
}
