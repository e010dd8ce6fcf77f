//! # Physical Memory Layout

/// Bytes per page frame.
pub const PAGE_SIZE: u64 = 4096;

/// log2([`PAGE_SIZE`]), i.e. the number of in-page offset bits.
pub const PAGE_SHIFT: u32 = 12;

/// Physical address where RAM begins and the kernel image is loaded.
pub const KERNBASE: u64 = 0x8000_0000;

/// First physical address past the end of usable RAM.
pub const PHYSTOP: u64 = KERNBASE + 128 * 1024 * 1024;

/// Rounds `addr` up to the next page boundary.
#[inline]
#[must_use]
pub const fn page_round_up(addr: u64) -> u64 {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Rounds `addr` down to the start of its page.
#[inline]
#[must_use]
pub const fn page_round_down(addr: u64) -> u64 {
    addr & !(PAGE_SIZE - 1)
}

/// Whether `addr` lies on a page boundary.
#[inline]
#[must_use]
pub const fn is_page_aligned(addr: u64) -> bool {
    addr & (PAGE_SIZE - 1) == 0
}

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(is_page_aligned(KERNBASE));
    assert!(is_page_aligned(PHYSTOP));
    assert!(PHYSTOP > KERNBASE);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_moves_to_next_boundary() {
        assert_eq!(page_round_up(KERNBASE), KERNBASE);
        assert_eq!(page_round_up(KERNBASE + 1), KERNBASE + PAGE_SIZE);
        assert_eq!(page_round_up(KERNBASE + PAGE_SIZE - 1), KERNBASE + PAGE_SIZE);
    }

    #[test]
    fn round_down_keeps_page_base() {
        assert_eq!(page_round_down(0x8000_1234), 0x8000_1000);
        assert_eq!(page_round_down(0x8000_1000), 0x8000_1000);
    }

    #[test]
    fn alignment_check() {
        assert!(is_page_aligned(0));
        assert!(is_page_aligned(PHYSTOP));
        assert!(!is_page_aligned(PHYSTOP - 8));
    }
}
