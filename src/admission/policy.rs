//! Admission decision seam shared by the limiter algorithms.

/// A rate limiting algorithm that admits or rejects a single request.
///
/// `allow` never fails and never suspends; apart from the brief store lock
/// it performs no blocking work, so it is safe to call from any serving
/// context.
pub trait AdmissionPolicy: Send + Sync {
    /// Returns `true` if the request for `client_key` may proceed, counting
    /// it against the client's budget when it does.
    fn allow(&self, client_key: &str) -> bool;
}
