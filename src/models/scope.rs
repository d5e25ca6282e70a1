use std::borrow::Cow;
use std::fmt;

use uuid::Uuid;

/// Normalized, comparable identity of a scope. `None` means "no scope".
pub type ScopeKey = Option<String>;

/// The entity a feature's state is evaluated against.
///
/// Scopes are a closed set of variants rather than arbitrary values, so the
/// key derivation is a plain match. Build one with the constructors below or
/// through the `From` impls; the variant picked at construction time decides
/// how the scope is keyed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// No scope: the feature has one global state.
    #[default]
    Global,
    /// A scope that supplies its own identifier, used verbatim as the key.
    Identified(String),
    /// A typed entity, keyed as `"<kind>:<id>"` with `%` and `:` in the
    /// kind percent-encoded.
    Entity { kind: String, id: String },
    /// Anything else, keyed by its string form.
    Opaque(String),
}

/// Capability for types that know their own scope identifier.
///
/// The identifier is stored verbatim, so implementors are responsible for
/// keeping it unique across everything they use as a scope.
pub trait ScopeIdentifier {
    fn scope_identifier(&self) -> String;
}

/// Capability for domain entities that have a kind and an id.
pub trait Entity {
    /// Namespace of the id, e.g. `"user"` or `"tenant"`.
    fn entity_kind(&self) -> &str;

    fn entity_id(&self) -> String;

    /// An explicit scope identifier, if the entity has one.
    ///
    /// Takes precedence over the `kind:id` form in [`Scope::from_entity`].
    fn scope_identifier(&self) -> Option<String> {
        None
    }
}

impl Scope {
    /// Scope for a value that provides its own identifier.
    pub fn identified<S: ScopeIdentifier + ?Sized>(source: &S) -> Self {
        Self::Identified(source.scope_identifier())
    }

    /// Scope for an entity.
    ///
    /// An entity that also exposes [`Entity::scope_identifier`] becomes
    /// [`Scope::Identified`]; otherwise it is keyed by kind and id.
    pub fn from_entity<E: Entity + ?Sized>(entity: &E) -> Self {
        match entity.scope_identifier() {
            Some(id) => Self::Identified(id),
            None => Self::Entity {
                kind: entity.entity_kind().to_string(),
                id: entity.entity_id(),
            },
        }
    }

    /// Shorthand for an entity scope from its parts.
    pub fn entity(kind: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::Entity {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Scope keyed by the value's `Display` form.
    ///
    /// Opaque and identified keys are not namespaced: `Scope::from("user:4")`
    /// and `Scope::Identified("user:4".into())` share a key with
    /// `Scope::entity("user", 4)` and therefore address the same record.
    pub fn opaque(value: impl fmt::Display) -> Self {
        Self::Opaque(value.to_string())
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Id of an entity scope, if this is one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::Entity { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The storage key for this scope.
    pub fn key(&self) -> ScopeKey {
        match self {
            Self::Global => None,
            Self::Identified(id) => Some(id.clone()),
            Self::Entity { kind, id } => Some(format!("{}:{id}", escape_kind(kind))),
            Self::Opaque(value) => Some(value.clone()),
        }
    }
}

/// Percent-encode `%` and `:` so the first `:` of an entity key always ends the kind.
fn escape_kind(kind: &str) -> Cow<'_, str> {
    if !kind.contains(['%', ':']) {
        return Cow::Borrowed(kind);
    }
    let mut escaped = String::with_capacity(kind.len() + 4);
    for c in kind.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Normalize a scope into its storage key.
pub fn resolve_key(scope: &Scope) -> ScopeKey {
    scope.key()
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => f.write_str(&key),
            None => f.write_str("<global>"),
        }
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Self::Opaque(value.to_string())
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        Self::Opaque(value)
    }
}

impl From<Uuid> for Scope {
    fn from(value: Uuid) -> Self {
        Self::Opaque(value.hyphenated().to_string())
    }
}

impl<T: Into<Scope>> From<Option<T>> for Scope {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Global, Into::into)
    }
}

macro_rules! opaque_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scope {
                fn from(value: $ty) -> Self {
                    Self::Opaque(value.to_string())
                }
            }
        )*
    };
}

opaque_from_integer!(i32, i64, u32, u64, usize);
