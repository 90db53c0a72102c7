/// # Constants with reserved meanings in Hibachi

/// In a given tensor shape, Hibachi reserves the `0th` dimension for batching
pub const BATCH_DIM: usize = 0;

/// Batch size used when neither the caller nor the server configuration provides one
pub const BATCH_SIZE_FALLBACK: usize = 10;

/// Connection concurrency applied to `http` transports unless overridden
pub const HTTP_CLIENT_CONCURRENCY: usize = 12;
