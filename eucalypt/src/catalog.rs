//! Node-type catalogs.
//!
//! [`SimpleTypes`] is a category-free catalog for arbitrary trees. [`JavaTypes`]
//! classifies the node types and structural properties produced by the Eclipse
//! JDT parser, which is what the move-suppression and token-recovery heuristics
//! were tuned on.

use core::fmt::Debug;
use core::hash::Hash;
use core::marker::PhantomData;

use crate::tree::{KindClass, RoleClass, TreeTypes};

/// A catalog with no node categories: every kind and role is unclassified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SimpleTypes<K, L, R = &'static str>(PhantomData<(K, L, R)>);

impl<K, L, R> TreeTypes for SimpleTypes<K, L, R>
where
    K: Clone + Eq + Hash + Debug + Send + Sync,
    L: Clone + Eq + Hash + Debug + Send + Sync,
    R: Clone + Eq + Hash + Debug + Send + Sync,
{
    type Kind = K;
    type Label = L;
    type Role = R;
}

/// Catalog for Java syntax trees using JDT type names and property ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JavaTypes;

/// JDT node types that are expressions.
pub const JAVA_EXPRESSIONS: &[&str] = &[
    "Annotation",
    "ArrayAccess",
    "ArrayCreation",
    "ArrayInitializer",
    "Assignment",
    "BooleanLiteral",
    "CaseDefaultExpression",
    "CastExpression",
    "CharacterLiteral",
    "ClassInstanceCreation",
    "ConditionalExpression",
    "FieldAccess",
    "InfixExpression",
    "InstanceofExpression",
    "LambdaExpression",
    "MethodInvocation",
    "MethodReference",
    "ModuleQualifiedName",
    "QualifiedName",
    "SimpleName",
    "NullLiteral",
    "NumberLiteral",
    "ParenthesizedExpression",
    "EitherOrMultiPattern",
    "GuardedPattern",
    "NullPattern",
    "RecordPattern",
    "TypePattern",
    "PatternInstanceofExpression",
    "PostfixExpression",
    "PrefixExpression",
    "StringLiteral",
    "SuperFieldAccess",
    "SuperMethodInvocation",
    "SwitchExpression",
    "TextBlock",
    "ThisExpression",
    "TypeLiteral",
    "VariableDeclarationExpression",
];

/// JDT node types that are declarations, statements or blocks.
pub const JAVA_CONTAINERS: &[&str] = &[
    "CompilationUnit",
    "ImportDeclaration",
    "AnnotationTypeDeclaration",
    "EnumDeclaration",
    "RecordDeclaration",
    "TypeDeclaration",
    "AnnotationTypeMemberDeclaration",
    "EnumConstantDeclaration",
    "FieldDeclaration",
    "Initializer",
    "MethodDeclaration",
    "ModuleDeclaration",
    "PackageDeclaration",
    "ModulePackageAccess",
    "ProvidesDirective",
    "RequiresDirective",
    "UsesDirective",
    "ExportsDirective",
    "OpensDirective",
    "Block",
    "AssertStatement",
    "BreakStatement",
    "ConstructorInvocation",
    "ContinueStatement",
    "DoStatement",
    "EmptyStatement",
    "EnhancedForStatement",
    "ExpressionStatement",
    "ForStatement",
    "IfStatement",
    "LabeledStatement",
    "ReturnStatement",
    "SuperConstructorInvocation",
    "SwitchCase",
    "SwitchStatement",
    "SynchronizedStatement",
    "ThrowStatement",
    "TryStatement",
    "TypeDeclarationStatement",
    "VariableDeclarationStatement",
    "WhileStatement",
    "YieldStatement",
];

/// Small JDT node types recovered as units even though they are not expressions.
pub const JAVA_SMALL_NODES: &[&str] = &[
    "SimpleType",
    "QualifiedType",
    "ParameterizedType",
    "ArrayType",
    "PrimitiveType",
    "VariableDeclarationFragment",
];

const EXPRESSION_ROLES: &[&str] = &[
    "expression",
    "leftOperand",
    "rightOperand",
    "extendedOperands",
    "arguments",
    "initializer",
    "initializers",
    "updaters",
    "leftHandSide",
    "rightHandSide",
    "operand",
    "array",
    "index",
    "dimensions",
    "thenExpression",
    "elseExpression",
    "optionalElseExpression",
];

const TYPE_ROLES: &[&str] = &[
    "type",
    "returnType2",
    "typeArguments",
    "superclassType",
    "superInterfaceTypes",
    "elementType",
    "thrownExceptionTypes",
];

const PATTERN_ROLES: &[&str] = &["pattern", "patterns"];

const NAME_ROLES: &[&str] = &["name", "qualifier", "label"];

const STATEMENT_ROLES: &[&str] = &[
    "statements",
    "body",
    "thenStatement",
    "elseStatement",
    "finally",
];

impl TreeTypes for JavaTypes {
    type Kind = &'static str;
    type Label = String;
    type Role = &'static str;

    fn kind_class(kind: &Self::Kind) -> KindClass {
        let mut class = KindClass::empty();
        if JAVA_EXPRESSIONS.contains(kind) {
            class |= KindClass::EXPRESSION;
        }
        if JAVA_SMALL_NODES.contains(kind) {
            class |= KindClass::SMALL;
        }
        if JAVA_CONTAINERS.contains(kind) {
            class |= KindClass::CONTAINER;
        }
        match *kind {
            "IfStatement" => class |= KindClass::CONDITIONAL,
            "InfixExpression" => class |= KindClass::COMMUTATIVE,
            _ => {}
        }
        class
    }

    fn role_class(role: &Self::Role) -> RoleClass {
        let slot = if EXPRESSION_ROLES.contains(role) {
            RoleClass::EXPRESSION_SLOT
        } else if TYPE_ROLES.contains(role) {
            RoleClass::TYPE_SLOT
        } else if PATTERN_ROLES.contains(role) {
            RoleClass::PATTERN_SLOT
        } else if NAME_ROLES.contains(role) {
            RoleClass::NAME_SLOT
        } else if STATEMENT_ROLES.contains(role) {
            RoleClass::STATEMENT_SLOT
        } else {
            RoleClass::empty()
        };
        match *role {
            "thenStatement" => slot | RoleClass::BRANCH,
            "elseStatement" => slot | RoleClass::BRANCH | RoleClass::ALTERNATIVE,
            _ => slot,
        }
    }
}
