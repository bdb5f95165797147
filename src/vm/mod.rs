/*
 * Virtual Memory Boundary
 *
 * Thin dispatch layer between the architecture's fault trap
 * (`arch::x86_64::idt::page_fault_handler`) and the frame/mapping
 * primitives in `memory`. `pagefault` is the only submodule: permission
 * checking and process teardown live here, page-table manipulation stays
 * in `memory::paging`/`memory::phys`.
 */

pub mod pagefault;
