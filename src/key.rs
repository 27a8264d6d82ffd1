//! Cache key derivation
//!
//! A [`CacheKey`] is canonical JSON text, so any serializable value can act
//! as a key and equal values always produce equal keys (object keys are
//! ordered deterministically). [`resolve_key`] turns a call's identity into
//! a key under one of three policies: automatic composition of the call's
//! parts, a caller-supplied key function, or a constant outer key.

use crate::error::{RememoError, RememoResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// A derived cache key addressing one stored value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from any serializable value
    ///
    /// Fails with [`RememoError::UnhashableArgument`] if the value cannot be
    /// canonicalized (e.g. a map with non-string keys).
    pub fn of<T: Serialize + ?Sized>(value: &T) -> RememoResult<Self> {
        Ok(CacheKey(canonical_value(value, "cache key value")?.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey(s)
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(key: &CacheKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Explicit cache identity of a receiver whose method is being memoized
///
/// The key for a memoized method must reflect the receiver's relevant state,
/// not just the arguments. Implement this by snapshotting the fields that
/// distinguish one receiver from another:
///
/// ```
/// use rememo::{CacheIdentity, RememoResult};
/// use serde_json::Value;
///
/// struct Model {
///     weights: Vec<f64>,
///     label: String,
/// }
///
/// impl CacheIdentity for Model {
///     fn cache_identity(&self) -> RememoResult<Value> {
///         rememo::key::identity_of(&(&self.weights, &self.label))
///     }
/// }
/// ```
pub trait CacheIdentity {
    /// A serializable snapshot of the state that distinguishes this receiver
    fn cache_identity(&self) -> RememoResult<Value>;
}

/// Snapshot helper for [`CacheIdentity`] implementations
pub fn identity_of<T: Serialize + ?Sized>(value: &T) -> RememoResult<Value> {
    canonical_value(value, "receiver cache identity")
}

fn canonical_value<T: Serialize + ?Sized>(value: &T, context: &str) -> RememoResult<Value> {
    // serde_json canonicalizes NaN and infinity to null, so a NaN argument
    // would silently share a key with a stored None. Refuse non-finite
    // floats before conversion, while they are still detectable.
    value
        .serialize(FiniteCheck)
        .and_then(|()| serde_json::to_value(value))
        .map_err(|e| RememoError::unhashable(context, e))
}

/// Serializer that walks a value and rejects non-finite floats
///
/// Produces nothing; it exists only to fail on components that have no
/// canonical JSON form.
struct FiniteCheck;

fn non_finite_error() -> serde_json::Error {
    serde::ser::Error::custom("non-finite float (NaN or infinity) has no canonical form")
}

impl serde::Serializer for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_f32(self, v: f32) -> Result<(), Self::Error> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<(), Self::Error> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(non_finite_error())
        }
    }

    fn serialize_bool(self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_char(self, _: char) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Self::Error> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self, Self::Error> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, Self::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Self::Error> {
        Ok(self)
    }
}

impl serde::ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl serde::ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl serde::ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl serde::ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl serde::ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        key.serialize(FiniteCheck)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl serde::ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl serde::ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Identity of one call to a memoized function
///
/// Bundles the callable's name, its positional arguments, its keyword
/// arguments (ordered by name) and, for methods, the receiver's cache
/// identity. Components are canonicalized when added, so a non-serializable
/// argument fails at the call site before any cache file is touched.
#[derive(Debug, Clone)]
pub struct CallContext {
    name: String,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
    receiver: Option<Value>,
}

impl CallContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            receiver: None,
        }
    }

    /// Append a positional argument
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> RememoResult<Self> {
        let context = format!("positional argument {}", self.args.len());
        self.args.push(canonical_value(value, &context)?);
        Ok(self)
    }

    /// Bind a keyword argument; binding order does not affect the key
    pub fn kwarg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> RememoResult<Self> {
        let context = format!("keyword argument \"{name}\"");
        self.kwargs
            .insert(name.to_string(), canonical_value(value, &context)?);
        Ok(self)
    }

    /// Attach the receiver of a memoized method call
    pub fn receiver<R: CacheIdentity + ?Sized>(mut self, receiver: &R) -> RememoResult<Self> {
        self.receiver = Some(receiver.cache_identity()?);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments, in call order
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Keyword arguments, ordered by name
    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    pub fn receiver_identity(&self) -> Option<&Value> {
        self.receiver.as_ref()
    }
}

/// Key function used by [`KeyPolicy::Inner`]
pub type KeyFn = Box<dyn Fn(&CallContext) -> RememoResult<CacheKey> + Send + Sync>;

/// Strategy for producing a key from a call
pub enum KeyPolicy {
    /// Compose receiver identity, callable name, positional and keyword
    /// arguments into one key
    Automatic,
    /// Derive the key with a caller-supplied function over the call context.
    /// This is the mechanism of choice when arguments are unsuitable as keys
    /// directly (e.g. large arrays) or when only `args`/`kwargs` are known.
    Inner(KeyFn),
    /// A precomputed constant key; addresses a fixed slot in a multi-entry
    /// cache rather than deriving anything per call
    Outer(CacheKey),
}

impl KeyPolicy {
    pub fn inner<F>(f: F) -> Self
    where
        F: Fn(&CallContext) -> RememoResult<CacheKey> + Send + Sync + 'static,
    {
        KeyPolicy::Inner(Box::new(f))
    }

    pub fn outer(key: impl Into<CacheKey>) -> Self {
        KeyPolicy::Outer(key.into())
    }
}

impl fmt::Debug for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPolicy::Automatic => write!(f, "Automatic"),
            KeyPolicy::Inner(_) => write!(f, "Inner(<key fn>)"),
            KeyPolicy::Outer(key) => write!(f, "Outer({key})"),
        }
    }
}

/// Resolve the cache key for one call under the given policy
pub fn resolve_key(ctx: &CallContext, policy: &KeyPolicy) -> RememoResult<CacheKey> {
    match policy {
        KeyPolicy::Outer(key) => Ok(key.clone()),
        KeyPolicy::Inner(key_fn) => key_fn(ctx),
        KeyPolicy::Automatic => {
            let mut parts = Vec::with_capacity(4);
            if let Some(receiver) = &ctx.receiver {
                parts.push(receiver.clone());
            }
            parts.push(Value::String(ctx.name.clone()));
            parts.push(Value::Array(ctx.args.clone()));
            parts.push(Value::Object(ctx.kwargs.clone()));
            Ok(CacheKey(Value::Array(parts).to_string()))
        }
    }
}
