//! Type descriptors used to namespace cache keys.
//!
//! A descriptor is an explicit, recursive description of a value's shape:
//! its base name plus ordered type arguments. Generic shapes are captured
//! at definition time through [`TypeDescribe`] instead of being recovered
//! from the runtime.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Base name plus ordered generic arguments of a cached value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: String,
    args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// Descriptor for a non-generic type.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a type argument.
    #[must_use]
    pub fn with_arg(mut self, arg: Self) -> Self {
        self.args.push(arg);
        self
    }

    /// Replace all type arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = Self>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Base type name without arguments.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type arguments in declaration order.
    pub fn args(&self) -> &[Self] {
        &self.args
    }

    /// True when the type has arguments.
    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some((first, rest)) = self.args.split_first() {
            write!(f, "<{first}")?;
            for arg in rest {
                write!(f, ", {arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Compile-time capability to describe a type for cache namespacing.
///
/// Implement this for every value type stored through a typed retriever.
///
/// ```
/// use kvstash::domain::models::{TypeDescribe, TypeDescriptor};
///
/// struct MemberConfig;
///
/// impl TypeDescribe for MemberConfig {
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::named("MemberConfig")
///     }
/// }
///
/// assert_eq!(Vec::<MemberConfig>::descriptor().to_string(), "Vec<MemberConfig>");
/// ```
pub trait TypeDescribe {
    /// Descriptor of the implementing type.
    fn descriptor() -> TypeDescriptor;
}

macro_rules! describe_plain {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl TypeDescribe for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::named($name)
                }
            }
        )*
    };
}

describe_plain! {
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    String => "String",
    () => "Unit",
}

impl<T: TypeDescribe> TypeDescribe for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::named("Vec").with_arg(T::descriptor())
    }
}

impl<T: TypeDescribe> TypeDescribe for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::named("Option").with_arg(T::descriptor())
    }
}

impl<T: TypeDescribe> TypeDescribe for HashSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::named("HashSet").with_arg(T::descriptor())
    }
}

impl<T: TypeDescribe> TypeDescribe for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::named("BTreeSet").with_arg(T::descriptor())
    }
}

impl<K: TypeDescribe, V: TypeDescribe> TypeDescribe for HashMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::named("HashMap").with_args([K::descriptor(), V::descriptor()])
    }
}

impl<K: TypeDescribe, V: TypeDescribe> TypeDescribe for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::named("BTreeMap").with_args([K::descriptor(), V::descriptor()])
    }
}
