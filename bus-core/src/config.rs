//! Stable configuration constants shared by both external surfaces.

/// Maximum printable length of a node name, not counting a terminator.
///
/// The original C header bounds names to 64 bytes *including* a NUL
/// terminator; callers working with fixed-size buffers (the procedural
/// surface) should size those buffers to [`MAX_NODE_NAME_BUF`].
pub const MAX_NODE_NAME_LEN: usize = 63;

/// Terminator-inclusive buffer size, kept for parity with the procedural
/// surface's fixed-size name buffers.
pub const MAX_NODE_NAME_BUF: usize = 64;

/// Name of the bus instance returned by [`crate::directory::default_instance`].
pub const DEFAULT_INSTANCE_NAME: &str = "default";

/// Reserved node present on every bus instance, used as the sender identity
/// for anonymous Pull operations.
pub const DUMMY_NODE_NAME: &str = "__DummyNode__";
