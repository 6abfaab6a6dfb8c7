//! Generators for note texts

/// Letters cycled by [`generate_test_string`]: lowercase first, then uppercase.
pub const ASCII_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `length` copies of `ch`.
///
/// ```
/// use notes_harness_testing::generate_long_string;
///
/// assert_eq!(generate_long_string(3, 'a'), "aaa");
/// ```
#[must_use]
pub fn generate_long_string(length: usize, ch: char) -> String {
    std::iter::repeat_n(ch, length).collect()
}

/// `length` characters cycling through [`ASCII_LETTERS`].
///
/// ```
/// use notes_harness_testing::generate_test_string;
///
/// assert_eq!(generate_test_string(3), "abc");
/// assert_eq!(&generate_test_string(54)[50..], "YZab");
/// ```
#[must_use]
pub fn generate_test_string(length: usize) -> String {
    ASCII_LETTERS.chars().cycle().take(length).collect()
}
