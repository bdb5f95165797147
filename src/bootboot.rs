/*
 * BOOTBOOT Protocol Structures
 *
 * Minimal Rust transcription of `bootboot.h`, the fixed-layout boot
 * information block the BOOTBOOT loader places at a well-known virtual
 * address before transferring control to `_start`. Everything here is
 * laid out exactly as the loader writes it; none of it is ours to
 * redesign. The linker script maps `bootboot`, `environment`, and `fb`
 * at their fixed addresses -- declared here as `extern "C"` statics
 * rather than given storage.
 */

#![allow(non_upper_case_globals)]

/// One memory map entry. `size` packs the region's type into its low 4
/// bits and the actual byte length into the rest, exactly as the loader
/// writes it -- never splitting them into separate fields would lose the
/// loader's packing, so callers mask rather than expect clean accessors.
#[repr(C)]
pub struct MMapEnt {
    pub ptr: u64,
    pub size: u64,
}

/// Memory region types, packed into the low 4 bits of `MMapEnt::size`.
pub const MMAP_USED: u32 = 0;
pub const MMAP_FREE: u32 = 1;
pub const MMAP_ACPI: u32 = 2;
pub const MMAP_MMIO: u32 = 3;

/// Virtual address the kernel core is linked and mapped at by the
/// loader's linker script.
pub const BOOTBOOT_CORE: usize = 0xffff_ffff_ffe0_0000;

/// The fixed-layout boot information block. 128 bytes of header followed
/// by a variable-length memory map (`size` tells the reader how many
/// `MMapEnt`s follow `mmap`, the first entry).
#[repr(C)]
pub struct BOOTBOOT {
    pub magic: [u8; 4],
    pub size: u32,
    pub protocol: u8,
    pub fb_type: u8,
    pub numcores: u16,
    pub bspid: u16,
    pub timezone: i16,
    pub datetime: [u8; 8],
    pub initrd_ptr: u64,
    pub initrd_size: u64,
    pub fb_ptr: u64,
    pub fb_size: u32,
    pub fb_width: u32,
    pub fb_height: u32,
    pub fb_scanline: u32,
    // Architecture-specific union; x86_64 fields only.
    pub acpi_ptr: u64,
    pub smbi_ptr: u64,
    pub efi_ptr: u64,
    pub mp_ptr: u64,
    /// Padding out to the fixed 128-byte header size; downstream code
    /// derives the memory map entry count from `(size - 128) / 16`.
    pub unused: [u64; 4],
    pub mmap: MMapEnt,
}

unsafe extern "C" {
    /// The boot information block itself, mapped by the loader at a fixed
    /// virtual address before `_start` runs.
    pub static bootboot: BOOTBOOT;

    /// NUL-terminated `key=value\n` environment the loader passes through,
    /// one fixed 4 KiB page.
    pub static environment: [u8; 4096];

    /// The linear framebuffer, `fb_size` bytes starting here.
    pub static fb: u8;
}
