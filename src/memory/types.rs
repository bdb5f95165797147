/*
 * Memory Types
 *
 * This module defines core memory types used throughout the memory subsystem.
 * We re-export x86_64 crate types where appropriate and provide our own wrappers
 * for cleaner abstractions.
 */

// Re-export x86_64 types for convenience
pub use x86_64::{PhysAddr, VirtAddr};
pub use x86_64::structures::paging::PageTableFlags;

// The canonical frame type lives on `memory` itself (used by the physical
// frame allocator); re-export it here so paging code can pull it from
// `memory::types` alongside the other address/flag types.
pub use super::PhysFrame;

/// Page flags wrapper for cleaner API
#[derive(Copy, Clone, Debug)]
pub struct PageFlags(PageTableFlags);

impl PageFlags {
    /// Page is present in memory
    pub const PRESENT: Self = Self(PageTableFlags::PRESENT);
    /// Page is writable
    pub const WRITABLE: Self = Self(PageTableFlags::WRITABLE);
    /// Page is accessible from user mode
    pub const USER_ACCESSIBLE: Self = Self(PageTableFlags::USER_ACCESSIBLE);
    /// Disable execution on this page (requires NXE)
    pub const NO_EXECUTE: Self = Self(PageTableFlags::NO_EXECUTE);

    /// Create empty flags
    pub fn empty() -> Self {
        Self(PageTableFlags::empty())
    }

    /// Get the underlying PageTableFlags
    pub fn into_inner(self) -> PageTableFlags {
        self.0
    }

    /// Combine with another set of flags
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for PageFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<PageTableFlags> for PageFlags {
    fn from(flags: PageTableFlags) -> Self {
        Self(flags)
    }
}

impl From<PageFlags> for PageTableFlags {
    fn from(flags: PageFlags) -> Self {
        flags.0
    }
}
