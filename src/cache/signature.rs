//! Cache Key and Argument Signature Module
//!
//! The two halves of a cached call's identity: the key naming the function
//! and the canonical signature of its arguments.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Key ==
/// Identity of one cached function: the namespace of its backing-store list.
///
/// Derive it from a fully qualified name, for example via
/// [`cache_key!`](crate::cache_key); bare short names collide across
/// modules. Stable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from a fully qualified function name.
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self(qualified_name.into())
    }

    /// The key as the backing store sees it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Argument Signature ==
/// Canonical serialization of one call's arguments.
///
/// The lookup discriminator inside a key's entry list. Equality is byte
/// equality of the rendered form, so equal calls must render identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgSignature(String);

impl ArgSignature {
    /// The rendered signature.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArgSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Encode Signature ==
/// Renders positional and named values into the canonical signature.
///
/// Positional values keep call order; named values are sorted by name, which
/// the BTreeMap makes structural. Calls passing the same named values in a
/// different order therefore land on the same signature.
pub fn encode_signature(args: &[Value], kwargs: &BTreeMap<String, Value>) -> Result<ArgSignature> {
    #[derive(Serialize)]
    struct CallShape<'a> {
        args: &'a [Value],
        kwargs: &'a BTreeMap<String, Value>,
    }

    let rendered =
        serde_json::to_string(&CallShape { args, kwargs }).map_err(CacheError::Encode)?;
    Ok(ArgSignature(rendered))
}

// == Signature Encoder ==
/// Incremental builder for a call's signature.
#[derive(Debug, Default)]
pub struct SignatureEncoder {
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl SignatureEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the next positional value.
    pub fn positional<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.args
            .push(serde_json::to_value(value).map_err(CacheError::Encode)?);
        Ok(())
    }

    /// Adds a named value; insertion order does not matter.
    pub fn named<T: Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        self.kwargs.insert(
            name.to_string(),
            serde_json::to_value(value).map_err(CacheError::Encode)?,
        );
        Ok(())
    }

    /// Renders the canonical signature.
    pub fn finish(self) -> Result<ArgSignature> {
        encode_signature(&self.args, &self.kwargs)
    }
}

// == Argument Traits ==
/// Types that can describe themselves as a call's arguments.
///
/// Implemented for `()` and for tuples of serializable values, which encode
/// as positional arguments. Call sites with named arguments implement this
/// directly over [`SignatureEncoder::named`].
pub trait ArgSpec {
    /// Feeds the arguments into the encoder.
    fn encode(&self, enc: &mut SignatureEncoder) -> Result<()>;

    /// Renders the full signature for this argument set.
    fn signature(&self) -> Result<ArgSignature> {
        let mut enc = SignatureEncoder::new();
        self.encode(&mut enc)?;
        enc.finish()
    }
}

impl ArgSpec for () {
    fn encode(&self, _enc: &mut SignatureEncoder) -> Result<()> {
        Ok(())
    }
}

impl<A: Serialize> ArgSpec for (A,) {
    fn encode(&self, enc: &mut SignatureEncoder) -> Result<()> {
        enc.positional(&self.0)
    }
}

impl<A: Serialize, B: Serialize> ArgSpec for (A, B) {
    fn encode(&self, enc: &mut SignatureEncoder) -> Result<()> {
        enc.positional(&self.0)?;
        enc.positional(&self.1)
    }
}

impl<A: Serialize, B: Serialize, C: Serialize> ArgSpec for (A, B, C) {
    fn encode(&self, enc: &mut SignatureEncoder) -> Result<()> {
        enc.positional(&self.0)?;
        enc.positional(&self.1)?;
        enc.positional(&self.2)
    }
}

impl<A: Serialize, B: Serialize, C: Serialize, D: Serialize> ArgSpec for (A, B, C, D) {
    fn encode(&self, enc: &mut SignatureEncoder) -> Result<()> {
        enc.positional(&self.0)?;
        enc.positional(&self.1)?;
        enc.positional(&self.2)?;
        enc.positional(&self.3)
    }
}
