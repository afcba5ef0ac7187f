//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, album ids, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Primary test user handle
pub const TEST_USER: &str = "testuser";

/// Primary test user password
pub const TEST_PASS: &str = "testpass123";

/// Second test user handle (for owner-scoping tests)
pub const SECOND_USER: &str = "otheruser";

/// Second test user password
pub const SECOND_PASS: &str = "otherpass123";

// ============================================================================
// Test Albums
// ============================================================================

pub const ALBUM_1_ID: &str = "a1";
pub const ALBUM_1_TITLE: &str = "OK Computer";
pub const ALBUM_1_ARTIST: &str = "Radiohead";

pub const ALBUM_2_ID: &str = "a2";
pub const ALBUM_2_TITLE: &str = "Kid A";
pub const ALBUM_2_ARTIST: &str = "Radiohead";

/// A manually entered album, the id shape the web client generates
pub const MANUAL_ALBUM_ID: &str = "manual_1704067200_x7f3";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
