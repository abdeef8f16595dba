//! Line-numbered program listings.

/// Prefix every line with its 1-based number, right-aligned to `width`.
///
/// ```
/// use tracez_ir::listing::add_line_numbers;
/// assert_eq!(add_line_numbers("a\nb", 3), "  1: a\n  2: b");
/// ```
pub fn add_line_numbers(source: &str, width: usize) -> String {
    source
        .lines()
        .enumerate()
        .map(|(idx, line)| format!("{:>width$}: {line}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
