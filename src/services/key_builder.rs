//! Namespaced key construction.
//!
//! Keys are laid out as
//!
//! ```text
//! {prefix}::{type_tag}::{raw}            no bucket
//! {prefix}::{type_tag}:{bucket}:{raw}    with bucket
//! ```
//!
//! where `type_tag` is the type name followed by `<arg,arg,...>` for generic
//! types, recursively. Type names and buckets are percent-escaped so they can
//! never contain a delimiter or a SCAN glob metacharacter; the raw key is
//! always the last segment and is written verbatim. Every part before the raw
//! key is therefore self-delimiting, which keeps distinct
//! (type, bucket, raw key) tuples from producing the same key. The prefix is
//! not escaped; it is rejected up front if it could forge a delimiter, so
//! builders with different prefixes never share a key either.

use std::fmt::{self, Write};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::TypeDescriptor;

/// Characters escaped inside type names and bucket names.
const RESERVED: &[char] = &['%', ':', '<', '>', ',', '*', '?', '[', ']', '\\'];

/// Characters a prefix may not contain: the key delimiter and the glob
/// metacharacters of SCAN patterns.
pub const RESERVED_PREFIX_CHARS: &[char] = &[':', '*', '?', '[', ']', '\\'];

/// Builds namespaced keys under one process-wide prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Builder for `prefix`, rejected when empty or holding a reserved
    /// character.
    pub fn new(prefix: impl Into<String>) -> CacheResult<Self> {
        let prefix = prefix.into();
        Self::validate_prefix(&prefix)?;
        Ok(Self { prefix })
    }

    /// Check that `prefix` keeps keys self-delimiting.
    pub fn validate_prefix(prefix: &str) -> CacheResult<()> {
        let reason = if prefix.is_empty() {
            "prefix is empty"
        } else if prefix.contains(RESERVED_PREFIX_CHARS) {
            "prefix contains ':' or a glob character"
        } else {
            return Ok(());
        };
        Err(CacheError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason,
        })
    }

    /// Process-wide prefix every key starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Namespaced key for `raw` under the full generic shape of `ty`.
    pub fn build_key(
        &self,
        raw: &(impl fmt::Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> String {
        let mut key = self.namespace(ty, bucket);
        // Writing into a String cannot fail.
        let _ = write!(key, "{raw}");
        key
    }

    /// Namespaced key from a bare type name, without generic arguments.
    ///
    /// Produces the same key as [`build_key`](Self::build_key) for a
    /// non-generic descriptor of the same name.
    pub fn build_plain_key(
        &self,
        raw: &(impl fmt::Display + ?Sized),
        type_name: &str,
        bucket: Option<&str>,
    ) -> String {
        let mut key = String::with_capacity(self.prefix.len() + type_name.len() + 8);
        key.push_str(&self.prefix);
        key.push_str("::");
        escape_into(&mut key, type_name);
        push_bucket(&mut key, bucket);
        let _ = write!(key, "{raw}");
        key
    }

    /// SCAN match expression for a raw-key glob within a type/bucket scope.
    pub fn scan_pattern(&self, pattern: &str, ty: &TypeDescriptor, bucket: Option<&str>) -> String {
        let mut key = self.namespace(ty, bucket);
        key.push_str(pattern);
        key
    }

    fn namespace(&self, ty: &TypeDescriptor, bucket: Option<&str>) -> String {
        let mut key = String::with_capacity(self.prefix.len() + 32);
        key.push_str(&self.prefix);
        key.push_str("::");
        push_type_tag(&mut key, ty);
        push_bucket(&mut key, bucket);
        key
    }
}

fn push_type_tag(out: &mut String, ty: &TypeDescriptor) {
    escape_into(out, ty.name());
    if let Some((first, rest)) = ty.args().split_first() {
        out.push('<');
        push_type_tag(out, first);
        for arg in rest {
            out.push(',');
            push_type_tag(out, arg);
        }
        out.push('>');
    }
}

fn push_bucket(out: &mut String, bucket: Option<&str>) {
    match bucket {
        None => out.push_str("::"),
        Some(name) => {
            out.push(':');
            if name.is_empty() {
                // a lone '%' is never produced by escaping a non-empty name
                out.push('%');
            } else {
                escape_into(out, name);
            }
            out.push(':');
        }
    }
}

fn escape_into(out: &mut String, segment: &str) {
    for c in segment.chars() {
        if RESERVED.contains(&c) {
            let _ = write!(out, "%{:02X}", u32::from(c));
        } else {
            out.push(c);
        }
    }
}
