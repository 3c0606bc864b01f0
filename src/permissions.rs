//! Conversions between `rwxr-xr-x` style permission strings and octal modes.

const TRIAD_BITS: [(char, u32); 3] = [('r', 4), ('w', 2), ('x', 1)];

/// Convert a symbolic permission string into an octal mode.
///
/// Every group of three characters becomes one octal digit where `r`, `w` and
/// `x` count 4, 2 and 1; any other character counts 0. `rw-r--r--` is `0o644`.
pub fn symbolic_to_octal(permissions: &str) -> u32 {
    let chars: Vec<char> = permissions.chars().collect();
    chars.chunks(3).fold(0, |mode, triad| {
        let digit: u32 = triad
            .iter()
            .map(|c| {
                TRIAD_BITS
                    .iter()
                    .find(|(bit, _)| bit == c)
                    .map_or(0, |(_, value)| *value)
            })
            .sum();
        mode * 8 + digit
    })
}

/// Render the owner/group/other bits of `mode` as a 9-character string.
pub fn octal_to_symbolic(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let digit = (mode >> shift) & 0o7;
        for (c, value) in TRIAD_BITS {
            out.push(if digit & value != 0 { c } else { '-' });
        }
    }
    out
}

/// Check that `permissions` is exactly nine characters of `[r-][w-][x-]` x3.
pub fn is_valid_symbolic(permissions: &str) -> bool {
    permissions.chars().count() == 9
        && permissions.chars().enumerate().all(|(i, c)| {
            let (expected, _) = TRIAD_BITS[i % 3];
            c == expected || c == '-'
        })
}
