//! Static description of node kinds and the child slots ("roles") each kind owns.
//!
//! Every structural parent/child relationship in a [`SyntaxTree`](crate::SyntaxTree)
//! goes through a [`RoleDef`] from [`ROLES`], looked up by (parent kind, role name).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Structural kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// A source file.
    CompilationUnit,
    /// `class C { ... }`
    TypeDeclaration,
    /// A method with its signature and body.
    MethodDeclaration,
    /// `T a = ...;` at type level.
    FieldDeclaration,
    /// One formal parameter.
    Parameter,
    /// `a = ...` inside a field or local declaration.
    VariableDeclarator,
    /// `{ ... }`
    Block,
    /// An expression used as a statement.
    ExpressionStatement,
    /// `return ...;`
    ReturnStatement,
    /// `if (...) ... else ...`
    IfStatement,
    /// `while (...) ...`
    WhileStatement,
    /// `T a = ...;` inside a body.
    LocalVariableDeclaration,
    /// `throw ...;`
    ThrowStatement,
    /// `target.name(args)`
    MethodCall,
    /// `target.name`
    FieldAccess,
    /// `lhs = rhs`
    Assignment,
    /// `lhs op rhs`
    InfixExpression,
    /// `new T(args)`
    ObjectCreation,
    /// A single identifier.
    SimpleName,
    /// `a.b.c`
    QualifiedName,
    /// A string literal.
    StringLiteral,
    /// A numeric literal.
    NumberLiteral,
    /// `true` or `false`.
    BooleanLiteral,
    /// `null`
    NullLiteral,
    /// A named type.
    SimpleType,
    /// `int`, `void` and the other built-in types.
    PrimitiveType,
}

impl NodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [NodeKind; 26] = [
        NodeKind::CompilationUnit,
        NodeKind::TypeDeclaration,
        NodeKind::MethodDeclaration,
        NodeKind::FieldDeclaration,
        NodeKind::Parameter,
        NodeKind::VariableDeclarator,
        NodeKind::Block,
        NodeKind::ExpressionStatement,
        NodeKind::ReturnStatement,
        NodeKind::IfStatement,
        NodeKind::WhileStatement,
        NodeKind::LocalVariableDeclaration,
        NodeKind::ThrowStatement,
        NodeKind::MethodCall,
        NodeKind::FieldAccess,
        NodeKind::Assignment,
        NodeKind::InfixExpression,
        NodeKind::ObjectCreation,
        NodeKind::SimpleName,
        NodeKind::QualifiedName,
        NodeKind::StringLiteral,
        NodeKind::NumberLiteral,
        NodeKind::BooleanLiteral,
        NodeKind::NullLiteral,
        NodeKind::SimpleType,
        NodeKind::PrimitiveType,
    ];

    /// Statement kinds, including blocks.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Block
                | NodeKind::ExpressionStatement
                | NodeKind::ReturnStatement
                | NodeKind::IfStatement
                | NodeKind::WhileStatement
                | NodeKind::LocalVariableDeclaration
                | NodeKind::ThrowStatement
        )
    }

    /// Expression kinds, including names and literals.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::MethodCall
                | NodeKind::FieldAccess
                | NodeKind::Assignment
                | NodeKind::InfixExpression
                | NodeKind::ObjectCreation
        ) || self.is_name()
            || self.is_literal()
    }

    /// Simple and qualified names.
    pub fn is_name(self) -> bool {
        matches!(self, NodeKind::SimpleName | NodeKind::QualifiedName)
    }

    /// Literal kinds.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            NodeKind::StringLiteral
                | NodeKind::NumberLiteral
                | NodeKind::BooleanLiteral
                | NodeKind::NullLiteral
        )
    }

    /// Type references.
    pub fn is_type(self) -> bool {
        matches!(self, NodeKind::SimpleType | NodeKind::PrimitiveType)
    }

    /// Members of a type body.
    pub fn is_body_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::TypeDeclaration | NodeKind::MethodDeclaration | NodeKind::FieldDeclaration
        )
    }

    /// Keyword token a node of this kind contributes before its children.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            NodeKind::ReturnStatement => Some("return"),
            NodeKind::IfStatement => Some("if"),
            NodeKind::WhileStatement => Some("while"),
            NodeKind::ThrowStatement => Some("throw"),
            NodeKind::ObjectCreation => Some("new"),
            NodeKind::NullLiteral => Some("null"),
            NodeKind::TypeDeclaration => Some("class"),
            _ => None,
        }
    }

    /// Name used in logs and persisted patterns.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::CompilationUnit => "CompilationUnit",
            NodeKind::TypeDeclaration => "TypeDeclaration",
            NodeKind::MethodDeclaration => "MethodDeclaration",
            NodeKind::FieldDeclaration => "FieldDeclaration",
            NodeKind::Parameter => "Parameter",
            NodeKind::VariableDeclarator => "VariableDeclarator",
            NodeKind::Block => "Block",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::ReturnStatement => "ReturnStatement",
            NodeKind::IfStatement => "IfStatement",
            NodeKind::WhileStatement => "WhileStatement",
            NodeKind::LocalVariableDeclaration => "LocalVariableDeclaration",
            NodeKind::ThrowStatement => "ThrowStatement",
            NodeKind::MethodCall => "MethodCall",
            NodeKind::FieldAccess => "FieldAccess",
            NodeKind::Assignment => "Assignment",
            NodeKind::InfixExpression => "InfixExpression",
            NodeKind::ObjectCreation => "ObjectCreation",
            NodeKind::SimpleName => "SimpleName",
            NodeKind::QualifiedName => "QualifiedName",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::NumberLiteral => "NumberLiteral",
            NodeKind::BooleanLiteral => "BooleanLiteral",
            NodeKind::NullLiteral => "NullLiteral",
            NodeKind::SimpleType => "SimpleType",
            NodeKind::PrimitiveType => "PrimitiveType",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared type a child slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildType {
    /// Anything.
    Any,
    /// Any statement (blocks included).
    Statement,
    /// Any expression (names and literals included).
    Expression,
    /// Simple or qualified name.
    Name,
    /// Type reference.
    Type,
    /// Member of a type body.
    BodyDeclaration,
    /// Exactly one kind.
    Exactly(NodeKind),
}

impl ChildType {
    /// Whether a node of `kind` is assignable to this slot type.
    pub fn admits(self, kind: NodeKind) -> bool {
        match self {
            ChildType::Any => true,
            ChildType::Statement => kind.is_statement(),
            ChildType::Expression => kind.is_expression(),
            ChildType::Name => kind.is_name(),
            ChildType::Type => kind.is_type(),
            ChildType::BodyDeclaration => kind.is_body_declaration(),
            ChildType::Exactly(expected) => kind == expected,
        }
    }
}

/// How a role holds its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    /// At most one child node.
    Single,
    /// An ordered list of child nodes.
    List,
    /// A string value stored on the node itself.
    Scalar,
}

/// One named slot of a node kind.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RoleDef {
    /// Kind owning the slot.
    pub parent: NodeKind,
    /// Role name, unique per parent kind.
    pub name: &'static str,
    /// Single child, child list, or scalar.
    pub slot: SlotKind,
    /// Declared type of children; `Any` for scalars.
    pub accepts: ChildType,
}

impl RoleDef {
    /// Whether children of this role live in an ordered list.
    pub fn is_list(&self) -> bool {
        self.slot == SlotKind::List
    }
}

impl fmt::Display for RoleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.parent, self.name)
    }
}

const fn role(parent: NodeKind, name: &'static str, slot: SlotKind, accepts: ChildType) -> RoleDef {
    RoleDef {
        parent,
        name,
        slot,
        accepts,
    }
}

use ChildType::{Any, BodyDeclaration, Exactly, Expression, Name, Statement, Type};
use NodeKind as K;
use SlotKind::{List, Scalar, Single};

/// All roles. Per parent kind, roles appear in source order; token
/// flattening follows this order.
pub static ROLES: &[RoleDef] = &[
    role(K::CompilationUnit, "types", List, Exactly(K::TypeDeclaration)),
    role(K::TypeDeclaration, "name", Single, Exactly(K::SimpleName)),
    role(K::TypeDeclaration, "body", List, BodyDeclaration),
    role(K::MethodDeclaration, "return_type", Single, Type),
    role(K::MethodDeclaration, "name", Single, Exactly(K::SimpleName)),
    role(K::MethodDeclaration, "parameters", List, Exactly(K::Parameter)),
    role(K::MethodDeclaration, "body", Single, Exactly(K::Block)),
    role(K::FieldDeclaration, "type", Single, Type),
    role(K::FieldDeclaration, "fragments", List, Exactly(K::VariableDeclarator)),
    role(K::Parameter, "type", Single, Type),
    role(K::Parameter, "name", Single, Exactly(K::SimpleName)),
    role(K::VariableDeclarator, "name", Single, Exactly(K::SimpleName)),
    role(K::VariableDeclarator, "initializer", Single, Expression),
    role(K::Block, "statements", List, Statement),
    role(K::ExpressionStatement, "expression", Single, Expression),
    role(K::ReturnStatement, "expression", Single, Expression),
    role(K::IfStatement, "condition", Single, Expression),
    role(K::IfStatement, "then", Single, Statement),
    role(K::IfStatement, "else", Single, Statement),
    role(K::WhileStatement, "condition", Single, Expression),
    role(K::WhileStatement, "body", Single, Statement),
    role(K::LocalVariableDeclaration, "type", Single, Type),
    role(K::LocalVariableDeclaration, "fragments", List, Exactly(K::VariableDeclarator)),
    role(K::ThrowStatement, "expression", Single, Expression),
    role(K::MethodCall, "target", Single, Expression),
    role(K::MethodCall, "name", Scalar, Any),
    role(K::MethodCall, "arguments", List, Expression),
    role(K::FieldAccess, "target", Single, Expression),
    role(K::FieldAccess, "name", Scalar, Any),
    role(K::Assignment, "left", Single, Expression),
    role(K::Assignment, "operator", Scalar, Any),
    role(K::Assignment, "right", Single, Expression),
    role(K::InfixExpression, "left", Single, Expression),
    role(K::InfixExpression, "operator", Scalar, Any),
    role(K::InfixExpression, "right", Single, Expression),
    role(K::ObjectCreation, "type", Single, Type),
    role(K::ObjectCreation, "arguments", List, Expression),
    role(K::SimpleName, "identifier", Scalar, Any),
    role(K::QualifiedName, "qualifier", Single, Name),
    role(K::QualifiedName, "name", Single, Exactly(K::SimpleName)),
    role(K::StringLiteral, "value", Scalar, Any),
    role(K::NumberLiteral, "value", Scalar, Any),
    role(K::BooleanLiteral, "value", Scalar, Any),
    role(K::SimpleType, "name", Single, Name),
    role(K::PrimitiveType, "keyword", Scalar, Any),
];

/// Look up a role by parent kind and name.
pub fn role_of(parent: NodeKind, name: &str) -> Option<&'static RoleDef> {
    ROLES.iter().find(|r| r.parent == parent && r.name == name)
}

/// The roles of a kind, in source order.
pub fn roles_of(parent: NodeKind) -> impl Iterator<Item = &'static RoleDef> {
    ROLES.iter().filter(move |r| r.parent == parent)
}
