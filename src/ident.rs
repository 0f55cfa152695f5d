//! Collision-resistant identifier generation for nodes and edges.

/// Returns a fresh 128-bit random identifier as a lowercase hex string.
///
/// Identifiers carry no embedded structure and are safe to generate from
/// any thread. Transaction ids are not produced here; the commit
/// coordinator issues those as a monotonic sequence so the WAL stays
/// ordered.
///
/// # Example
/// ```rust
/// let id = grafito::ident::fresh_id();
/// assert_eq!(id.len(), 32);
/// ```
pub fn fresh_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
