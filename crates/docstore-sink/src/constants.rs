//! Tunables for the ingestion queue and flush scheduler.
//!
//! These values mirror the contract of the sink: the queue has a soft
//! capacity hint but no enforced upper bound, and the flush timer defaults
//! to a 12 second period measured from drain-cycle completion.

/// Initial capacity hint for the ingestion queue.
///
/// The queue pre-allocates room for this many pending items. It is a hint
/// only: the queue keeps accepting items past this size, and unbounded
/// growth under sustained overload is the documented behavior. A real
/// deployment that needs backpressure should bound ingestion upstream.
pub const QUEUE_CAPACITY_HINT: usize = 50_000;

/// Default period between drain cycles, in seconds.
///
/// The timer is re-armed after each cycle completes, so the effective gap
/// between two store bursts is the drain duration plus this interval.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 12;

/// Default per-call timeout for remote store operations, in seconds.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;

/// Prefix for keys synthesized when the key template renders empty.
///
/// The rest of the key is a freshly generated v4 UUID, which keeps
/// synthesized keys collision-free with overwhelming probability even at
/// high volume.
pub const GENERATED_KEY_PREFIX: &str = "log_";
