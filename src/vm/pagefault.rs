/*
 * Page Fault Dispatch
 *
 * Grounded on `kernel/vm/pagefault.c`'s `has_valid_permissions` /
 * `handle_pagefault` split, and on this tree's own prior
 * `arch::x86_64::idt::handle_heap_fault` (the lazy zeroed-frame mapping
 * this delegates to `memory::phys`/`memory::paging` for).
 *
 * A fault that is not a lazy-heap miss, or that cannot be satisfied (out
 * of memory, mapping failure), is fatal to the faulting process and never
 * to the kernel: the offending process is torn down with `EFAULT` via
 * `process::do_exit`, which the architecture trap handler then simply
 * returns from having resumed nothing.
 */

use crate::io::device::Errno;
use crate::memory::{paging, phys};
use x86_64::structures::paging::{Page, PageTableFlags, Size4KiB};
use x86_64::{PhysAddr, VirtAddr};

/// A not-present fault from user mode, landing inside the current
/// process's valid (not necessarily yet backed) heap range, is the only
/// fault this core knows how to resolve.
fn has_valid_permissions(fault_addr: VirtAddr, is_present: bool, is_user: bool) -> bool {
    if is_present || !is_user {
        return false;
    }
    crate::process::with_process(crate::process::current(), |p| {
        p.address_space.is_valid_heap_address(fault_addr)
    })
    .unwrap_or(false)
}

/// Map a fresh, zeroed frame at the faulting page. `false` on allocation
/// or mapping failure.
fn handle_pagefault(fault_addr: VirtAddr) -> bool {
    let frame = match phys::alloc_frame() {
        Some(f) => f,
        None => {
            log::error!("vm: out of memory servicing page fault at {:?}", fault_addr);
            return false;
        }
    };

    let page: Page<Size4KiB> = Page::containing_address(fault_addr);
    let phys_addr = PhysAddr::new(frame.start_address());
    let flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER_ACCESSIBLE;

    if let Err(e) = paging::map_user_page(page.start_address(), phys_addr, flags) {
        log::error!("vm: failed to map page at {:?}: {:?}", fault_addr, e);
        phys::free_frame(frame);
        return false;
    }

    unsafe {
        let page_start = page.start_address().as_u64() as *mut u8;
        core::ptr::write_bytes(page_start, 0, 4096);
    }

    true
}

/// Entry point called from `arch::x86_64::idt::page_fault_handler`.
/// Returns `true` when execution may resume at the faulting instruction.
pub fn pagefault(fault_addr: VirtAddr, is_present: bool, is_user: bool) -> bool {
    if !has_valid_permissions(fault_addr, is_present, is_user) {
        kill_current_with_efault(fault_addr);
    }
    if handle_pagefault(fault_addr) {
        true
    } else {
        kill_current_with_efault(fault_addr);
    }
}

fn kill_current_with_efault(fault_addr: VirtAddr) -> ! {
    log::warn!(
        "vm: unrecoverable page fault at {:?}, killing process {}",
        fault_addr,
        crate::process::current()
    );
    crate::process::do_exit(Errno::EFAULT as i32)
}
