/// Pads buffer's size, so that it satisfies both the storage-binding's
/// alignment and the copy alignment.
pub fn pad_size(size: usize) -> usize {
    (size.max(16) + 15) & !15
}

#[cfg(test)]
mod tests {
    #[test]
    fn pad_size() {
        assert_eq!(16, super::pad_size(0));
        assert_eq!(16, super::pad_size(4));
        assert_eq!(32, super::pad_size(20));
        assert_eq!(176, super::pad_size(176));
    }
}
