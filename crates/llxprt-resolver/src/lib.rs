//! The auth-source resolver: the single stage that picks the active
//! session API key from a ranked list of sources at startup.
//!
//! Named-key resolution happens exclusively here (never in profile
//! bootstrap) so precedence logic lives in one place; see
//! [`resolve_auth_source`] for the precedence walk and the no-fall-through
//! rule on a named-key miss.

pub mod resolver;

pub use resolver::{
    resolve_auth_source, AuthSourceInputs, AuthSourceKind, ResolvedAuthSource, ResolverError,
};
