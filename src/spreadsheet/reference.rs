//! Conversions between zero-based (row, column) indexes and `A1` style references.

/// Converts column letters (`A`, `AB`) to a zero-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for letter in letters.chars() {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        let digit = (letter.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Converts a one-based row number string to a zero-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Parses a cell reference such as `C12` into `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}

/// Formats `(row, col)` as a cell reference such as `C12`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut column = col + 1;
    while column > 0 {
        column -= 1;
        letters.push((b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters.reverse();
    format!("{}{}", letters.into_iter().collect::<String>(), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A1", (0, 0))]
    #[case("B3", (2, 1))]
    #[case("Z10", (9, 25))]
    #[case("AA1", (0, 26))]
    #[case("XFD1048576", (1_048_575, 16_383))]
    fn test_reference_round_trip(#[case] reference: &str, #[case] index: (usize, usize)) {
        assert_eq!(reference_to_index(reference), Some(index));
        assert_eq!(index_to_reference(index.0, index.1), reference);
    }

    #[rstest]
    #[case("")]
    #[case("A")]
    #[case("12")]
    #[case("A0")]
    #[case("A-1")]
    fn test_invalid_reference(#[case] reference: &str) {
        assert_eq!(reference_to_index(reference), None);
    }
}
